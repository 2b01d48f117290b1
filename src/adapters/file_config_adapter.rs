//! INI file configuration adapter.

use crate::domain::error::TrendsimError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TrendsimError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| TrendsimError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, TrendsimError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TrendsimError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .filter(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[strategy]
fast_window = 20
slow_window = 100
stop_policy = intrabar

[backtest]
initial_cash = 100000.5
commission_rate = 0.001

[data]
path = /var/data/bars
symbol = SPY
blank =

[report]
output_dir = out
"#;

    #[test]
    fn get_string_reads_values() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("data", "symbol"), Some("SPY".to_string()));
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/var/data/bars".to_string())
        );
    }

    #[test]
    fn get_string_treats_blank_and_missing_as_none() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("data", "blank"), None);
        assert_eq!(adapter.get_string("data", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_string_returns_numbers_verbatim() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nfast_window = abc\nslow_window = 1e2\n")
                .unwrap();
        assert_eq!(adapter.get_string("strategy", "fast_window"), Some("abc".to_string()));
        assert_eq!(adapter.get_string("strategy", "slow_window"), Some("1e2".to_string()));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("strategy", "stop_policy"),
            Some("intrabar".to_string())
        );
        assert_eq!(adapter.get_string("report", "output_dir"), Some("out".to_string()));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(
            result,
            Err(TrendsimError::ConfigParse { file, .. }) if file == "/nonexistent/path/config.ini"
        ));
    }
}

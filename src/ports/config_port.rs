//! Configuration access port trait.

/// Raw string lookup; typed parsing and validation live with the caller.
pub trait ConfigPort {
    /// `None` when the section or key is missing, or the value is blank.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}

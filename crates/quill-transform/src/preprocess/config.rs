use quill_core::names::DEFAULT_TEMP_BASE;
use serde::{Deserialize, Serialize};

/// Names the pass introduces into user code.
///
/// Downstream stages look these identifiers up, so they only change together
/// with the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Call-scoped variable holding the dispatch index of the current call.
    pub selector_var: String,
    /// Base for the unique prefixes minted per lowered function.
    pub temp_prefix: String,
    /// Prefix of the local holding a variable-length argument's length.
    pub length_prefix: String,
    /// Log a warning when a later declaration replaces a table entry.
    pub warn_on_collisions: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            selector_var: "__funid".to_string(),
            temp_prefix: DEFAULT_TEMP_BASE.to_string(),
            length_prefix: "_len_".to_string(),
            warn_on_collisions: true,
        }
    }
}

impl PreprocessConfig {
    pub fn length_local(&self, name: &str) -> String {
        format!("{}{}", self.length_prefix, name)
    }
}

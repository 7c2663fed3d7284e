use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMP_BASE: &str = "_temp";

/// Mints identifier prefixes that are distinct within one compilation.
///
/// The counter is an ordinary value owned by whoever drives the lowering, so
/// two compilations never share state and tests can pin the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameGenerator {
    base: String,
    next: u64,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::with_base(DEFAULT_TEMP_BASE)
    }

    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            next: 0,
        }
    }

    pub fn starting_at(mut self, next: u64) -> Self {
        self.next = next;
        self
    }

    /// Returns `"{base}{n}_"` and advances the counter.
    pub fn fresh_prefix(&mut self) -> String {
        let prefix = format!("{}{}_", self.base, self.next);
        self.next += 1;
        prefix
    }

    pub fn issued(&self) -> u64 {
        self.next
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

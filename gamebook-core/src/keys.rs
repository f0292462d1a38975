//! Hidden-resource key prefix convention.
//!
//! Keys starting with `#` (or the legacy `@`) are hidden from the player.
//! The prefix is stripped into a flag on import and only `#` is written back.

use crate::constants::{HIDDEN_PREFIX, LEGACY_HIDDEN_PREFIX};

/// Split a wire key into its editor key and hidden flag.
#[must_use]
pub fn split_hidden_prefix(raw: &str) -> (&str, bool) {
    raw.strip_prefix(HIDDEN_PREFIX)
        .or_else(|| raw.strip_prefix(LEGACY_HIDDEN_PREFIX))
        .map_or((raw, false), |key| (key, true))
}

/// Build the wire key for an editor key.
#[must_use]
pub fn hidden_key(key: &str, is_hidden: bool) -> String {
    if is_hidden {
        format!("{HIDDEN_PREFIX}{key}")
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_prefixes_mark_hidden() {
        assert_eq!(split_hidden_prefix("#gold"), ("gold", true));
        assert_eq!(split_hidden_prefix("@gold"), ("gold", true));
        assert_eq!(split_hidden_prefix("gold"), ("gold", false));
    }

    #[test]
    fn only_one_prefix_is_stripped() {
        assert_eq!(split_hidden_prefix("##gold"), ("#gold", true));
        assert_eq!(split_hidden_prefix("@#gold"), ("#gold", true));
    }

    #[test]
    fn export_canonicalizes_to_hash() {
        let (key, hidden) = split_hidden_prefix("@key");
        assert_eq!(hidden_key(key, hidden), "#key");
        assert_eq!(hidden_key("plain", false), "plain");
    }
}

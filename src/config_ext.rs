//! App-specific configuration extensions.
//!
//! This module provides hotkey support on top of the core Config.

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use tracing::warn;

use crate::Config;

/// Default hotkey: Meta+Shift+K
pub fn default_hotkey() -> HotKey {
    HotKey::new(Some(Modifiers::META | Modifiers::SHIFT), Code::KeyK)
}

/// Extension trait for Config to handle hotkeys.
pub trait ConfigExt {
    /// The record-toggle hotkey, parsed from the config or the default.
    fn hotkey(&self) -> HotKey;
}

impl ConfigExt for Config {
    fn hotkey(&self) -> HotKey {
        match self.hotkey_spec() {
            Some(spec) => spec.parse().unwrap_or_else(|e| {
                warn!("Invalid hotkey {spec:?} in config ({e}); using the default");
                default_hotkey()
            }),
            None => default_hotkey(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hotkey_defaults_when_unset() {
        let config = Config::default();
        assert_eq!(config.hotkey(), default_hotkey());
    }

    #[test]
    fn test_hotkey_parsed_from_config() {
        let config = Config {
            hotkey: Some("shift+KeyR".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.hotkey(),
            HotKey::new(Some(Modifiers::SHIFT), Code::KeyR)
        );
    }

    #[test]
    fn test_invalid_hotkey_falls_back() {
        let config = Config {
            hotkey: Some("not a hotkey".to_string()),
            ..Default::default()
        };
        assert_eq!(config.hotkey(), default_hotkey());
    }
}

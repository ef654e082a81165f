//! Compilation context and settings.

use serde::{Deserialize, Serialize};

use crate::ir::types::TypeTable;

/// Immutable per-compilation context: the type table with its canonical
/// built-in handles.
#[derive(Debug, Default)]
pub struct Context {
    pub types: TypeTable,
}

impl Context {
    pub fn new() -> Self {
        Self {
            types: TypeTable::new(),
        }
    }
}

/// Capabilities of the target environment that affect IR rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Caps {
    /// Whether the target supports `do { .. } while (..)` loops. Without
    /// them, early returns cannot be emulated when inlining.
    pub can_use_do_loops: bool,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            can_use_do_loops: true,
        }
    }
}

/// Host-configurable knobs for a compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Functions at or above this node count are not auto-inlined unless
    /// their declaration carries the `inline` modifier. Functions with a
    /// single call site ignore the threshold entirely.
    pub inline_threshold: usize,
    pub caps: Caps,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inline_threshold: 50,
            caps: Caps::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_round_trips_through_json() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, back);
    }

    #[test]
    fn settings_accept_partial_json() {
        let settings: Settings =
            serde_json::from_str(r#"{ "caps": { "can_use_do_loops": false } }"#).unwrap();
        assert!(!settings.caps.can_use_do_loops);
        assert_eq!(settings.inline_threshold, Settings::default().inline_threshold);
    }
}

//! Construction-time lookup configuration for command trees.
//!
//! # Example YAML
//!
//! ```yaml
//! command_allow_longer: true
//! option_allow_longer: false
//! ```

use serde::{Deserialize, Serialize};

/// Lookup behavior applied to every trie of a [`CommandTree`](crate::CommandTree).
///
/// `allow_longer` lets a query that runs past a registered name still resolve
/// to it, so `"playing"` finds `"play"`. Subcommands allow it by default;
/// options do not, so `--helpme` is rejected rather than read as `--help`.
///
/// # Examples
///
/// ```
/// use crim_core::TreeConfig;
///
/// let config = TreeConfig::default();
/// assert!(config.command_allow_longer);
/// assert!(!config.option_allow_longer);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// `allow_longer` for subcommand tries.
    pub command_allow_longer: bool,
    /// `allow_longer` for option tries.
    pub option_allow_longer: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            command_allow_longer: true,
            option_allow_longer: false,
        }
    }
}

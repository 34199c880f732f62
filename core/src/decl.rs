//! Declarative application trees loaded from YAML or JSON.
//!
//! # Example YAML
//!
//! ```yaml
//! name: twandy
//! version: 0.3.0
//! about:
//!   - Tandy, have you had your cake today?
//! global_options:
//!   - name: --fhat
//!     alias: -f
//!     summary: [Run filtered chat.]
//! commands:
//!   - name: coords
//!     aliases: [x]
//!     run: coords
//!   - name: play <game>
//!     summary: [Play a game.]
//!     run: play
//!     options:
//!       - name: --speed=<n>
//! ```
//!
//! Actions are plain strings: the resulting [`App<String>`] dispatches
//! [`Runner::Action`] with the `run` value of the selected command or option.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::{App, Runner};
use crate::command::{CommandDef, OptionDef};
use crate::config::TreeConfig;
use crate::error::{LoadError, Result};

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    "0.0.0".to_string()
}

/// Declaration of one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDecl {
    /// Name with optional placeholder (e.g. `--out=<file>`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub multi_arg: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub summary: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
}

/// Declaration of one command and everything nested under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDecl {
    /// Name with optional placeholders (e.g. `play <game>`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub multi_arg: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub summary: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub about: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandDecl>,
}

/// Declaration of a whole application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDecl {
    /// Root declaration (e.g. `twandy`, or `convert <file>` for a root with
    /// positional args).
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub summary: Vec<String>,
    #[serde(default)]
    pub about: Vec<String>,
    #[serde(default)]
    pub config: TreeConfig,
    /// Install `--help`, `--version` and `help`.
    #[serde(default = "default_true")]
    pub defaults: bool,
    /// Root action; the root shows usage when unset.
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub multi_arg: bool,
    /// Options local to the root.
    #[serde(default)]
    pub options: Vec<OptionDecl>,
    #[serde(default)]
    pub global_options: Vec<OptionDecl>,
    #[serde(default)]
    pub commands: Vec<CommandDecl>,
}

impl AppDecl {
    /// Loads a declaration file; `.json` files are read as JSON, anything else
    /// as YAML.
    ///
    /// # Errors
    ///
    /// [`LoadError::IoError`] if the file cannot be read, or the format error
    /// of the parser in use.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        debug!(path = %path.display(), is_json, "loading declaration");
        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    pub fn from_yaml_str(raw: &str) -> std::result::Result<Self, LoadError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> std::result::Result<Self, LoadError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Builds the declared application.
    ///
    /// # Examples
    ///
    /// ```
    /// use crim_core::{AppDecl, Dispatch};
    ///
    /// let decl = AppDecl::from_yaml_str(
    ///     "name: twandy\ncommands:\n  - name: play <game>\n    run: play\n",
    /// )
    /// .unwrap();
    /// let app = decl.build().unwrap();
    ///
    /// let Dispatch::Run(invocation) = app.dispatch(&["play", "solarus"]).unwrap() else {
    ///     panic!("expected the play action");
    /// };
    /// assert_eq!(invocation.action, "play");
    /// ```
    pub fn build(&self) -> Result<App<String>> {
        let mut root = CommandDef::new(self.name.as_str());
        if let Some(run) = &self.run {
            root = root.with_runner(Runner::Action(run.clone()));
        }
        if self.multi_arg {
            root = root.multi_arg();
        }
        for line in &self.summary {
            root = root.with_summary(line.as_str());
        }
        for line in &self.about {
            root = root.with_about(line.as_str());
        }
        for option in &self.options {
            root = root.with_option(option.to_def());
        }
        for command in &self.commands {
            root = root.with_subcommand(command.to_def());
        }

        let mut app = App::from_root(root, &self.version, self.config)?;
        for option in &self.global_options {
            app.add_global_option(option.to_def())?;
        }
        if self.defaults {
            app.add_defaults()?;
        }

        debug!(
            app = %app.name(),
            commands = app.tree().command_count(),
            options = app.tree().option_count(),
            "built declared application"
        );
        Ok(app)
    }
}

impl OptionDecl {
    fn to_def(&self) -> OptionDef<Runner<String>> {
        let mut def = OptionDef::new(self.name.as_str());
        if let Some(alias) = &self.alias {
            def = def.with_alias(alias.as_str());
        }
        if self.multi_arg {
            def = def.multi_arg();
        }
        if let Some(run) = &self.run {
            def = def.with_runner(Runner::Action(run.clone()));
        }
        for line in &self.summary {
            def = def.with_summary(line.as_str());
        }
        def
    }
}

impl CommandDecl {
    fn to_def(&self) -> CommandDef<Runner<String>> {
        let mut def = CommandDef::new(self.name.as_str()).with_aliases(self.aliases.iter().cloned());
        if self.multi_arg {
            def = def.multi_arg();
        }
        if let Some(run) = &self.run {
            def = def.with_runner(Runner::Action(run.clone()));
        }
        for line in &self.summary {
            def = def.with_summary(line.as_str());
        }
        for line in &self.about {
            def = def.with_about(line.as_str());
        }
        for option in &self.options {
            def = def.with_option(option.to_def());
        }
        for command in &self.commands {
            def = def.with_subcommand(command.to_def());
        }
        def
    }
}

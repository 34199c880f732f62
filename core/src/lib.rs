//! Prefix-matching command trees and a two-pass argv parser.
//!
//! This crate provides the pieces of a CLI front-end:
//!
//! - [`Trie`]: char-keyed lookup with forward completion of unambiguous
//!   prefixes and optional "allow longer" fallback.
//! - [`CommandTree`]: an arena of [`Command`]s with per-scope options, a
//!   global-options container and abbreviation-aware lookup.
//! - [`CommandTree::parse`]: resolves an argument vector into the deepest
//!   command, the runner to invoke and the collected [`CommandData`].
//! - [`App`]: built-in `--help`, `--version` and `help` handling on top of a
//!   tree, with plain-text help from [`render_help`].
//! - [`AppDecl`]: whole applications declared in YAML or JSON.
//!
//! # Example
//!
//! ```
//! use crim_core::*;
//!
//! let mut app = App::new("twandy", "0.3.0").unwrap();
//! let root = app.root();
//! app.add_command(root, CommandDef::new("coords").with_alias("x").with_runner(Runner::Action("coords")))
//!     .unwrap();
//! app.add_command(
//!     root,
//!     CommandDef::new("play <game>")
//!         .with_option(OptionDef::new("--fhat").with_alias("-f"))
//!         .with_runner(Runner::Action("play")),
//! )
//! .unwrap();
//! app.add_defaults().unwrap();
//!
//! // "pl" completes to "play"; "-f" resolves to "--fhat".
//! let Dispatch::Run(invocation) = app.dispatch(&["pl", "solarus", "-f"]).unwrap() else {
//!     panic!("expected an action");
//! };
//! assert_eq!(*invocation.action, "play");
//! assert_eq!(invocation.data.arg("<game>"), Some("solarus"));
//! assert!(invocation.data.has_opt("--fhat"));
//!
//! assert!(matches!(app.dispatch(&["--help"]).unwrap(), Dispatch::Help { .. }));
//! ```

mod app;
mod command;
mod config;
mod decl;
mod error;
mod help;
mod parser;
mod trie;

pub use app::{App, Dispatch, Invocation, Runner};
pub use command::{
    Command, CommandDef, CommandId, CommandOption, CommandTree, GLOBAL_OPTIONS_NAME, OptionDef,
    split_option,
};
pub use config::TreeConfig;
pub use decl::{AppDecl, CommandDecl, OptionDecl};
pub use error::{CrimError, LoadError, Result};
pub use help::{render_help, render_usage};
pub use parser::{CommandData, ParseOutcome, RunnerSource};
pub use trie::{Trie, TrieNode};

//! Application front-end: built-in runners and dispatch.
//!
//! [`App`] wraps a [`CommandTree`] whose runners are [`Runner`] values: the
//! built-in help/version behaviors plus the application's own actions. After a
//! parse, [`App::dispatch`] turns the selected runner into a [`Dispatch`] the
//! caller can act on. Printing is left to the caller.

use std::fmt;

use tracing::debug;

use crate::command::{CommandDef, CommandId, CommandTree, OptionDef};
use crate::config::TreeConfig;
use crate::error::Result;
use crate::help::render_help;
use crate::parser::CommandData;

/// What a command or option runs once selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runner<A> {
    /// Root default: show the root help.
    Usage,
    /// Show help for the command the parse ended in.
    Help,
    /// Show the application version.
    Version,
    /// Show help for the command path given as multi-args.
    HelpCommand,
    /// Application-defined action.
    Action(A),
}

impl<A: fmt::Display> fmt::Display for Runner<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Runner::Usage => f.write_str("usage"),
            Runner::Help => f.write_str("help"),
            Runner::Version => f.write_str("version"),
            Runner::HelpCommand => f.write_str("help-command"),
            Runner::Action(action) => fmt::Display::fmt(action, f),
        }
    }
}

/// An application action selected by a parse, with its resolved data.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation<'a, A> {
    pub action: &'a A,
    /// Deepest command entered.
    pub command: CommandId,
    pub data: CommandData,
}

/// What the caller should do after a successful parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<'a, A> {
    /// Print the help page of `command`.
    Help { command: CommandId },
    /// Print [`App::version_text`].
    Version,
    Run(Invocation<'a, A>),
    /// No runner is set anywhere in play.
    Nothing,
}

/// A named, versioned command tree with built-in help and version handling.
///
/// # Examples
///
/// ```
/// use crim_core::{App, CommandDef, Dispatch, Runner};
///
/// let mut app = App::new("twandy", "0.3.0").unwrap();
/// app.add_command(
///     app.root(),
///     CommandDef::new("play <game>").with_runner(Runner::Action("play")),
/// )
/// .unwrap();
/// app.add_defaults().unwrap();
///
/// match app.dispatch(&["play", "solarus"]).unwrap() {
///     Dispatch::Run(invocation) => {
///         assert_eq!(*invocation.action, "play");
///         assert_eq!(invocation.data.arg("<game>"), Some("solarus"));
///     }
///     other => panic!("unexpected dispatch: {other:?}"),
/// }
///
/// let play = app.tree().find_subcommand(app.root(), "play").unwrap();
/// assert_eq!(app.dispatch(&["play", "-h"]).unwrap(), Dispatch::Help { command: play });
/// assert_eq!(app.dispatch(&["-v"]).unwrap(), Dispatch::Version);
/// ```
#[derive(Debug, Clone)]
pub struct App<A> {
    name: String,
    version: String,
    tree: CommandTree<Runner<A>>,
}

impl<A> App<A> {
    /// Creates an application whose root shows usage by default.
    pub fn new(name: &str, version: &str) -> Result<Self> {
        Self::with_config(name, version, TreeConfig::default())
    }

    pub fn with_config(name: &str, version: &str, config: TreeConfig) -> Result<Self> {
        Self::from_root(CommandDef::new(name), version, config)
    }

    /// Creates an application from a full root declaration. The root runner
    /// defaults to [`Runner::Usage`] when `root` sets none.
    pub fn from_root(
        root: CommandDef<Runner<A>>,
        version: &str,
        config: TreeConfig,
    ) -> Result<Self> {
        let mut tree = CommandTree::with_config(root, config)?;
        let root = tree.root();
        if tree.command(root).runner.is_none() {
            tree.set_runner(root, Runner::Usage);
        }
        Ok(Self {
            name: tree.command(root).name.clone(),
            version: version.to_string(),
            tree,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn root(&self) -> CommandId {
        self.tree.root()
    }

    pub fn tree(&self) -> &CommandTree<Runner<A>> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut CommandTree<Runner<A>> {
        &mut self.tree
    }

    pub fn add_command(
        &mut self,
        parent: CommandId,
        def: CommandDef<Runner<A>>,
    ) -> Result<CommandId> {
        self.tree.add_command(parent, def)
    }

    pub fn add_option(&mut self, owner: CommandId, def: OptionDef<Runner<A>>) -> Result<()> {
        self.tree.add_option(owner, def)
    }

    pub fn add_global_option(&mut self, def: OptionDef<Runner<A>>) -> Result<()> {
        self.tree.add_global_option(def)
    }

    /// Installs `--help`/`-h`, `--version`/`-v` and the `help` command.
    pub fn add_defaults(&mut self) -> Result<()> {
        self.add_help_global_option()?;
        self.add_version_option()?;
        self.add_help_command()?;
        Ok(())
    }

    pub fn add_help_global_option(&mut self) -> Result<()> {
        self.tree.add_global_option(
            OptionDef::new("--help")
                .with_alias("-h")
                .with_summary("Show this help.")
                .with_runner(Runner::Help),
        )
    }

    pub fn add_version_option(&mut self) -> Result<()> {
        let root = self.tree.root();
        self.tree.add_option(
            root,
            OptionDef::new("--version")
                .with_alias("-v")
                .with_summary("Show version.")
                .with_runner(Runner::Version),
        )
    }

    pub fn add_help_command(&mut self) -> Result<CommandId> {
        let root = self.tree.root();
        self.tree.add_command(
            root,
            CommandDef::new("help")
                .multi_arg()
                .with_summary("Help with a command.")
                .with_runner(Runner::HelpCommand),
        )
    }

    /// Parses `tokens` and maps the selected runner to a [`Dispatch`].
    pub fn dispatch<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Dispatch<'_, A>> {
        let outcome = self.tree.parse(tokens)?;
        debug!(app = %self.name, source = ?outcome.source, "dispatching");

        Ok(match outcome.runner {
            None => Dispatch::Nothing,
            Some(Runner::Usage) => Dispatch::Help {
                command: self.root(),
            },
            Some(Runner::Help) => Dispatch::Help {
                command: outcome.command,
            },
            Some(Runner::Version) => Dispatch::Version,
            Some(Runner::HelpCommand) => Dispatch::Help {
                command: self.help_target(&outcome.data.multi_args),
            },
            Some(Runner::Action(action)) => Dispatch::Run(Invocation {
                action,
                command: outcome.command,
                data: outcome.data,
            }),
        })
    }

    /// Follows `path` down from the root, skipping words that name no
    /// subcommand.
    pub fn help_target<S: AsRef<str>>(&self, path: &[S]) -> CommandId {
        path.iter().fold(self.root(), |current, word| {
            self.tree
                .find_subcommand(current, word.as_ref())
                .unwrap_or(current)
        })
    }

    /// Help page of `command`.
    pub fn help_text(&self, command: CommandId) -> String {
        render_help(&self.tree, command)
    }

    pub fn version_text(&self) -> String {
        format!("{} v{}", self.name, self.version)
    }
}

//! Two-pass resolution of an argument vector against a [`CommandTree`].
//!
//! The first pass only looks for an option carrying a runner (`--help`,
//! `--version`, ...). Its answer changes how the second pass reads plain
//! tokens: with a runner option anywhere in the vector, recognizable
//! subcommand names win over positional arguments, so `cmd1 cmd2 --help` still
//! ends up in `cmd2` even when `cmd1` declares a required argument. Without
//! one, pending positional slots are filled first.
//!
//! Per token, the second pass tries in order: the current command's options,
//! the global options, each ancestor's options (closest first), multi-arg
//! collection, the next pending positional slot, and finally the current
//! command's subcommands.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::{CommandId, CommandOption, CommandTree, split_option};
use crate::error::{CrimError, Result};

/// Accumulators filled by one parse.
///
/// Flag-only options map to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandData {
    /// Options resolved from the global-options container.
    pub global_opts: IndexMap<String, String>,
    /// Options local to the final command or one of its ancestors.
    pub opts: IndexMap<String, String>,
    /// Positional placeholder to value.
    pub args: IndexMap<String, String>,
    /// Tokens collected by a multi-arg command.
    pub multi_args: Vec<String>,
}

impl CommandData {
    /// Value of an option from either scope, local first.
    pub fn opt(&self, name: &str) -> Option<&str> {
        self.opts
            .get(name)
            .or_else(|| self.global_opts.get(name))
            .map(String::as_str)
    }

    /// Whether an option from either scope was given.
    pub fn has_opt(&self, name: &str) -> bool {
        self.opt(name).is_some()
    }

    /// Value bound to a positional placeholder.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }
}

/// Where the selected runner came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RunnerSource {
    /// An option with a runner; always wins over command runners.
    Option { name: String },
    /// The deepest command entered.
    Command,
    /// The root's default runner.
    Root,
}

/// Result of resolving an argument vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome<'t, R> {
    /// Deepest command entered.
    pub command: CommandId,
    /// Runner to invoke, if any command or option in play has one.
    pub runner: Option<&'t R>,
    /// Where `runner` came from; `None` exactly when `runner` is.
    pub source: Option<RunnerSource>,
    /// Options, args and multi-args collected along the way.
    pub data: CommandData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Looking only for a runner option.
    ForOptionRunner,
    /// Real pass, a runner option is known to be present.
    HasOptionRunner,
    /// Real pass, no runner option anywhere.
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Global,
    Local,
}

#[derive(Debug, Clone, Copy)]
struct PendingArgs {
    command: CommandId,
    next: usize,
}

struct Scanner<'t, 'a, R> {
    tree: &'t CommandTree<R>,
    tokens: &'a [&'a str],
    index: usize,
    command: CommandId,
    /// Most recently entered last.
    ancestors: Vec<CommandId>,
    pending: Option<PendingArgs>,
    eat_all: bool,
    option_to_run: Option<&'t CommandOption<R>>,
    data: CommandData,
}

impl<R> CommandTree<R> {
    /// Resolves `tokens` (argv without the program name) against this tree.
    ///
    /// # Errors
    ///
    /// Any of the parse-time [`CrimError`] variants, raised at the first
    /// offending token.
    ///
    /// # Examples
    ///
    /// ```
    /// use crim_core::{CommandDef, CommandTree, RunnerSource};
    ///
    /// let mut tree = CommandTree::new("twandy").unwrap();
    /// tree.add_command(tree.root(), CommandDef::new("play <game>").with_runner("play"))
    ///     .unwrap();
    ///
    /// let outcome = tree.parse(&["play", "solarus"]).unwrap();
    /// assert_eq!(outcome.runner, Some(&"play"));
    /// assert_eq!(outcome.source, Some(RunnerSource::Command));
    /// assert_eq!(outcome.data.arg("<game>"), Some("solarus"));
    /// ```
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S]) -> Result<ParseOutcome<'_, R>> {
        let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();

        let has_option_runner = Scanner::new(self, &tokens)
            .scan(Pass::ForOptionRunner)?
            .is_some();
        debug!(has_option_runner, tokens = tokens.len(), "option runner pre-scan");

        let pass = if has_option_runner {
            Pass::HasOptionRunner
        } else {
            Pass::Normal
        };

        let mut scanner = Scanner::new(self, &tokens);
        scanner.scan(pass)?;
        scanner.finish()
    }
}

impl<'t, 'a, R> Scanner<'t, 'a, R> {
    fn new(tree: &'t CommandTree<R>, tokens: &'a [&'a str]) -> Self {
        let root = tree.root();
        let mut scanner = Self {
            tree,
            tokens,
            index: 0,
            command: root,
            ancestors: Vec::new(),
            pending: None,
            eat_all: false,
            option_to_run: None,
            data: CommandData::default(),
        };
        scanner.init_arity(root);
        scanner
    }

    /// Walks every token; in [`Pass::ForOptionRunner`] stops at the first
    /// runner option and returns it.
    fn scan(&mut self, pass: Pass) -> Result<Option<&'t CommandOption<R>>> {
        while self.index < self.tokens.len() {
            let token = self.tokens[self.index];
            let (option_name, option_arg) = split_option(token);

            if let Some((scope, option)) = self.lookup_option(option_name) {
                if pass == Pass::ForOptionRunner && option.runner.is_some() {
                    return Ok(Some(option));
                }
                self.apply_option(scope, option_name, option_arg, option)?;
            } else {
                self.apply_operand(token, pass)?;
            }

            self.index += 1;
        }

        Ok(self.option_to_run)
    }

    /// Local options shadow global ones; global ones shadow ancestors'.
    fn lookup_option(&self, name: &str) -> Option<(Scope, &'t CommandOption<R>)> {
        let tree = self.tree;
        if let Some(option) = tree.find_option(self.command, name) {
            return Some((Scope::Local, option));
        }
        if let Some(option) = tree.find_option(tree.global_options(), name) {
            return Some((Scope::Global, option));
        }
        self.ancestors
            .iter()
            .rev()
            .find_map(|&ancestor| tree.find_option(ancestor, name))
            .map(|option| (Scope::Local, option))
    }

    fn apply_option(
        &mut self,
        scope: Scope,
        typed: &str,
        embedded: Option<&str>,
        option: &'t CommandOption<R>,
    ) -> Result<()> {
        let value = match (option.takes_arg(), embedded) {
            (false, Some(value)) => {
                return Err(CrimError::UnexpectedOptionArgument {
                    command: self.scope_name(),
                    option: typed.to_string(),
                    value: value.to_string(),
                });
            }
            (false, None) => String::new(),
            (true, Some(value)) => value.to_string(),
            (true, None) => {
                self.index += 1;
                match self.tokens.get(self.index) {
                    Some(value) => value.to_string(),
                    None => {
                        return Err(CrimError::MissingOptionArgument {
                            command: self.scope_name(),
                            option: typed.to_string(),
                        });
                    }
                }
            }
        };

        debug!(option = %option.name, ?scope, %value, "matched option");
        let target = match scope {
            Scope::Global => &mut self.data.global_opts,
            Scope::Local => &mut self.data.opts,
        };
        target.insert(option.name.clone(), value);

        if option.runner.is_some() {
            match self.option_to_run {
                Some(selected) if !std::ptr::eq(selected, option) => {
                    return Err(CrimError::ConflictingOptionRunners {
                        command: self.scope_name(),
                        option: typed.to_string(),
                        selected: selected.name.clone(),
                    });
                }
                _ => self.option_to_run = Some(option),
            }
        }

        Ok(())
    }

    fn apply_operand(&mut self, token: &str, pass: Pass) -> Result<()> {
        // With a runner option in play, "cmd1 cmd2 --help" must reach cmd2 even
        // if cmd1 wants positional args; everything else is skipped.
        if pass != Pass::Normal || self.option_to_run.is_some() {
            if let Some(sub) = self.tree.find_subcommand(self.command, token) {
                self.descend(sub);
            }
            return Ok(());
        }

        if self.eat_all {
            debug!(token, "collected multi-arg");
            self.data.multi_args.push(token.to_string());
            return Ok(());
        }

        let tree = self.tree;
        if let Some(mut pending) = self.pending {
            let arg_names = &tree.command(pending.command).arg_names;
            let name = &arg_names[pending.next];
            debug!(arg = %name, token, "bound positional arg");
            self.data.args.insert(name.clone(), token.to_string());

            pending.next += 1;
            self.pending = (pending.next < arg_names.len()).then_some(pending);
            return Ok(());
        }

        if let Some(sub) = tree.find_subcommand(self.command, token) {
            self.descend(sub);
            return Ok(());
        }

        Err(CrimError::InvalidCommandOrOption {
            command: self.scope_name(),
            token: token.to_string(),
            position: self.index,
        })
    }

    fn descend(&mut self, sub: CommandId) {
        debug!(command = %self.tree.command(sub).name, "entered subcommand");
        self.ancestors.push(self.command);
        self.command = sub;
        self.init_arity(sub);
    }

    fn init_arity(&mut self, id: CommandId) {
        let command = self.tree.command(id);
        if command.multi_arg {
            self.eat_all = true;
        } else if command.has_args() {
            self.pending = Some(PendingArgs {
                command: id,
                next: 0,
            });
        }
    }

    /// Arity check and runner selection after a real pass.
    fn finish(self) -> Result<ParseOutcome<'t, R>> {
        if self.option_to_run.is_none() {
            if let Some(pending) = self.pending {
                let declared = self.tree.command(pending.command).arg_names.len();
                return Err(CrimError::MissingRequiredArguments {
                    command: self.scope_name(),
                    missing: declared - pending.next,
                });
            }
        }

        let tree = self.tree;
        let command = tree.command(self.command);
        let root = tree.command(tree.root());

        let (runner, source) = if let Some(option) = self.option_to_run {
            (
                option.runner.as_ref(),
                Some(RunnerSource::Option {
                    name: option.name.clone(),
                }),
            )
        } else if let Some(runner) = command.runner.as_ref() {
            (Some(runner), Some(RunnerSource::Command))
        } else if let Some(runner) = root.runner.as_ref() {
            (Some(runner), Some(RunnerSource::Root))
        } else {
            (None, None)
        };

        debug!(command = %command.name, ?source, "selected runner");
        Ok(ParseOutcome {
            command: self.command,
            runner,
            source,
            data: self.data,
        })
    }

    fn scope_name(&self) -> Option<String> {
        if self.tree.is_root(self.command) {
            None
        } else {
            Some(self.tree.full_name(self.command, Some(self.tree.root())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandDef, OptionDef};

    fn twandy() -> CommandTree<&'static str> {
        let mut tree = CommandTree::with_config(
            CommandDef::new("twandy").with_runner("usage"),
            Default::default(),
        )
        .unwrap();
        let root = tree.root();
        tree.add_global_option(OptionDef::new("--help").with_alias("-h").with_runner("help"))
            .unwrap();
        tree.add_option(root, OptionDef::new("--version").with_alias("-v").with_runner("version"))
            .unwrap();
        tree.add_command(root, CommandDef::new("coords").with_alias("x").with_runner("coords"))
            .unwrap();
        tree.add_command(
            root,
            CommandDef::new("play <game>")
                .with_option(OptionDef::new("--fhat").with_alias("-f"))
                .with_option(OptionDef::new("--speed=<n>"))
                .with_runner("play"),
        )
        .unwrap();
        tree.add_command(root, CommandDef::new("help").multi_arg().with_runner("help-cmd"))
            .unwrap();
        tree
    }

    #[test]
    fn test_empty_vector_selects_root_runner() {
        let tree = twandy();
        let outcome = tree.parse::<&str>(&[]).unwrap();
        assert_eq!(outcome.command, tree.root());
        assert_eq!(outcome.runner, Some(&"usage"));
        assert_eq!(outcome.source, Some(RunnerSource::Root));
    }

    #[test]
    fn test_command_without_runner_falls_back_to_root() {
        let mut tree = twandy();
        tree.add_command(tree.root(), CommandDef::new("idle")).unwrap();
        let outcome = tree.parse(&["idle"]).unwrap();
        assert_eq!(outcome.runner, Some(&"usage"));
        assert_eq!(outcome.source, Some(RunnerSource::Root));
    }

    #[test]
    fn test_no_runner_anywhere() {
        let tree: CommandTree<()> = CommandTree::new("bare").unwrap();
        let outcome = tree.parse::<String>(&[]).unwrap();
        assert_eq!(outcome.runner, None);
        assert_eq!(outcome.source, None);
    }

    #[test]
    fn test_option_values_embedded_and_following() {
        let tree = twandy();
        let outcome = tree.parse(&["play", "--speed=3", "solarus"]).unwrap();
        assert_eq!(outcome.data.opt("--speed"), Some("3"));
        assert_eq!(outcome.data.arg("<game>"), Some("solarus"));

        let outcome = tree.parse(&["play", "solarus", "--speed", "--fhat"]).unwrap();
        // The next whole token is the value, whatever it looks like.
        assert_eq!(outcome.data.opt("--speed"), Some("--fhat"));
        assert!(!outcome.data.opts.contains_key("--fhat"));
    }

    #[test]
    fn test_flag_alias_records_canonical_name() {
        let tree = twandy();
        let outcome = tree.parse(&["play", "-f", "lichess"]).unwrap();
        assert_eq!(outcome.data.opts.get("--fhat").map(String::as_str), Some(""));
        assert!(outcome.data.has_opt("--fhat"));
    }

    #[test]
    fn test_missing_option_argument() {
        let tree = twandy();
        assert_eq!(
            tree.parse(&["play", "solarus", "--speed"]).unwrap_err(),
            CrimError::MissingOptionArgument {
                command: Some("play".to_string()),
                option: "--speed".to_string(),
            }
        );
    }

    #[test]
    fn test_unexpected_option_argument() {
        let tree = twandy();
        assert_eq!(
            tree.parse(&["play", "-f=yes", "solarus"]).unwrap_err(),
            CrimError::UnexpectedOptionArgument {
                command: Some("play".to_string()),
                option: "-f".to_string(),
                value: "yes".to_string(),
            }
        );
    }

    #[test]
    fn test_conflicting_option_runners() {
        let tree = twandy();
        assert_eq!(
            tree.parse(&["--version", "--help"]).unwrap_err(),
            CrimError::ConflictingOptionRunners {
                command: None,
                option: "--help".to_string(),
                selected: "--version".to_string(),
            }
        );
    }

    #[test]
    fn test_repeated_runner_option_is_not_a_conflict() {
        let tree = twandy();
        let outcome = tree.parse(&["-h", "--help"]).unwrap();
        assert_eq!(outcome.runner, Some(&"help"));
    }

    #[test]
    fn test_invalid_token_reports_position_and_command() {
        let tree = twandy();
        assert_eq!(
            tree.parse(&["play", "solarus", "bogus"]).unwrap_err(),
            CrimError::InvalidCommandOrOption {
                command: Some("play".to_string()),
                token: "bogus".to_string(),
                position: 2,
            }
        );
    }

    #[test]
    fn test_positional_slot_beats_subcommand_without_runner_option() {
        let mut tree = twandy();
        let play = tree.find_subcommand(tree.root(), "play").unwrap();
        tree.add_command(play, CommandDef::new("coop").with_runner("coop"))
            .unwrap();

        let outcome = tree.parse(&["play", "coop"]).unwrap();
        assert_eq!(outcome.command, play);
        assert_eq!(outcome.data.arg("<game>"), Some("coop"));
    }

    #[test]
    fn test_subcommand_beats_positional_slot_with_runner_option() {
        let mut tree = twandy();
        let play = tree.find_subcommand(tree.root(), "play").unwrap();
        let coop = tree
            .add_command(play, CommandDef::new("coop <friend>").with_runner("coop"))
            .unwrap();

        let outcome = tree.parse(&["play", "coop", "--help"]).unwrap();
        assert_eq!(outcome.command, coop);
        assert_eq!(outcome.runner, Some(&"help"));
        assert!(outcome.data.args.is_empty());
    }

    #[test]
    fn test_runner_option_before_subcommands_still_descends() {
        let tree = twandy();
        let outcome = tree.parse(&["--help", "play"]).unwrap();
        assert_eq!(tree.command(outcome.command).name, "play");
        assert_eq!(
            outcome.source,
            Some(RunnerSource::Option {
                name: "--help".to_string()
            })
        );
    }

    #[test]
    fn test_ancestor_option_visible_in_subcommand() {
        let mut tree = twandy();
        let play = tree.find_subcommand(tree.root(), "play").unwrap();
        tree.add_command(play, CommandDef::new("coop")).unwrap();

        let outcome = tree.parse(&["play", "solarus", "coop", "-f"]).unwrap();
        assert!(outcome.data.opts.contains_key("--fhat"));
        assert_eq!(tree.command(outcome.command).name, "coop");
    }

    #[test]
    fn test_multi_arg_collects_option_like_tokens_only_when_unknown() {
        let tree = twandy();
        let outcome = tree.parse(&["help", "play", "-z", "x"]).unwrap();
        assert_eq!(outcome.data.multi_args, vec!["play", "-z", "x"]);
        assert_eq!(outcome.runner, Some(&"help-cmd"));
    }

    fn with_copy(mut tree: CommandTree<&'static str>) -> CommandTree<&'static str> {
        tree.add_command(tree.root(), CommandDef::new("cp <a> <b> <c>").with_runner("cp"))
            .unwrap();
        tree
    }

    #[test]
    fn test_partially_filled_slots_report_count_owed() {
        let tree = with_copy(twandy());
        assert_eq!(
            tree.parse(&["cp", "x"]).unwrap_err(),
            CrimError::MissingRequiredArguments {
                command: Some("cp".to_string()),
                missing: 2,
            }
        );
        assert_eq!(
            tree.parse(&["cp", "x", "y"]).unwrap_err(),
            CrimError::MissingRequiredArguments {
                command: Some("cp".to_string()),
                missing: 1,
            }
        );
    }

    #[test]
    fn test_all_slots_filled_in_order() {
        let tree = with_copy(twandy());
        let outcome = tree.parse(&["cp", "x", "y", "z"]).unwrap();
        assert_eq!(outcome.runner, Some(&"cp"));
        let bound: Vec<_> = outcome
            .data
            .args
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        assert_eq!(bound, vec![("<a>", "x"), ("<b>", "y"), ("<c>", "z")]);

        // Slots are exhausted, so a fourth operand has nowhere to go.
        assert_eq!(
            tree.parse(&["cp", "x", "y", "z", "w"]).unwrap_err(),
            CrimError::InvalidCommandOrOption {
                command: Some("cp".to_string()),
                token: "w".to_string(),
                position: 4,
            }
        );
    }
}

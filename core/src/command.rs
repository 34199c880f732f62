//! Command tree model.
//!
//! A [`CommandTree`] is an arena of [`Command`] records addressed by
//! [`CommandId`]. Each command stores its parent id, its subcommands and its
//! options in declaration order, and one [`Trie`] per scope for resolving
//! names, aliases and abbreviations.
//!
//! Two records always exist: the root command and the global-options
//! container. The container hangs off the root for naming purposes only; it is
//! never registered as a subcommand and cannot receive subcommands, so its
//! options are visible at every depth without it being reachable itself.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::config::TreeConfig;
use crate::error::{CrimError, Result};
use crate::trie::Trie;

/// Splits `--name=<arg>`, `--name <arg>` and `--name = <arg>` into two parts.
/// Shared by option declarations and option tokens on the command line.
static OPTION_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*=\s*|\s+").expect("static regex must compile"));

/// Name of the global-options container.
pub const GLOBAL_OPTIONS_NAME: &str = "globalopts";

/// Splits an option declaration or token at its first separator.
///
/// # Examples
///
/// ```
/// use crim_core::split_option;
///
/// assert_eq!(split_option("--out=a.txt"), ("--out", Some("a.txt")));
/// assert_eq!(split_option("--out a b"), ("--out", Some("a b")));
/// assert_eq!(split_option("--verbose"), ("--verbose", None));
/// ```
pub fn split_option(text: &str) -> (&str, Option<&str>) {
    let mut parts = OPTION_SEPARATOR.splitn(text, 2);
    let name = parts.next().unwrap_or_default();
    (name, parts.next())
}

/// Index of a command record inside a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

impl CommandId {
    /// Position of the record in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A leaf declaration attached to a command: a flag, or a `name=value` option
/// when it declares an argument placeholder.
#[derive(Debug, Clone)]
pub struct CommandOption<R> {
    /// Name without placeholder (e.g. `--out`).
    pub name: String,
    /// Placeholder of the value this option takes (e.g. `<file>`).
    pub arg_name: Option<String>,
    /// Single alias (e.g. `-o`).
    pub alias: Option<String>,
    /// Marks the option as repeatable in usage text.
    pub multi_arg: bool,
    pub runner: Option<R>,
    pub summary: Vec<String>,
}

impl<R> CommandOption<R> {
    /// Whether this option consumes a value.
    pub fn takes_arg(&self) -> bool {
        self.arg_name.is_some()
    }
}

/// One node of the command tree.
#[derive(Debug, Clone)]
pub struct Command<R> {
    /// Name without placeholders (e.g. `play`).
    pub name: String,
    pub aliases: Vec<String>,
    /// Positional placeholders in order (e.g. `["<game>"]`).
    pub arg_names: Vec<String>,
    /// Collects every trailing token verbatim instead of binding named args.
    pub multi_arg: bool,
    pub runner: Option<R>,
    pub summary: Vec<String>,
    pub about: Vec<String>,
    parent: Option<CommandId>,
    subcommands: IndexMap<String, CommandId>,
    subcommand_trie: Trie<CommandId>,
    options: IndexMap<String, CommandOption<R>>,
    option_trie: Trie<usize>,
}

impl<R> Command<R> {
    /// Whether this command declares positional arguments.
    pub fn has_args(&self) -> bool {
        !self.arg_names.is_empty()
    }

    /// Parent command; `None` only for the root.
    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    /// Name followed by its placeholders, as declared.
    pub fn declaration(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.arg_names.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builder for a command declaration.
///
/// The declaration string holds the name followed by whitespace-separated
/// positional placeholders.
///
/// # Examples
///
/// ```
/// use crim_core::{CommandDef, CommandTree, OptionDef};
///
/// let mut tree: CommandTree<&str> = CommandTree::new("twandy").unwrap();
/// let play = tree
///     .add_command(
///         tree.root(),
///         CommandDef::new("play <game>")
///             .with_summary("Play a game.")
///             .with_option(OptionDef::new("--fhat").with_alias("-f"))
///             .with_runner("play"),
///     )
///     .unwrap();
///
/// assert_eq!(tree.command(play).arg_names, vec!["<game>"]);
/// assert_eq!(tree.find_subcommand(tree.root(), "pl"), Some(play));
/// ```
#[derive(Debug, Clone)]
pub struct CommandDef<R> {
    declaration: String,
    aliases: Vec<String>,
    multi_arg: bool,
    runner: Option<R>,
    summary: Vec<String>,
    about: Vec<String>,
    options: Vec<OptionDef<R>>,
    subcommands: Vec<CommandDef<R>>,
}

impl<R> CommandDef<R> {
    /// Starts a declaration such as `"play <game>"`.
    pub fn new(declaration: impl Into<String>) -> Self {
        Self {
            declaration: declaration.into(),
            aliases: Vec::new(),
            multi_arg: false,
            runner: None,
            summary: Vec::new(),
            about: Vec::new(),
            options: Vec::new(),
            subcommands: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Collects all trailing tokens into the multi-arg list.
    pub fn multi_arg(mut self) -> Self {
        self.multi_arg = true;
        self
    }

    pub fn with_runner(mut self, runner: R) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Appends a summary line (shown in the parent's command list).
    pub fn with_summary(mut self, line: impl Into<String>) -> Self {
        self.summary.push(line.into());
        self
    }

    /// Appends an about line (shown in this command's own help).
    pub fn with_about(mut self, line: impl Into<String>) -> Self {
        self.about.push(line.into());
        self
    }

    pub fn with_option(mut self, option: OptionDef<R>) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_subcommand(mut self, subcommand: CommandDef<R>) -> Self {
        self.subcommands.push(subcommand);
        self
    }
}

/// Builder for an option declaration such as `"--out=<file>"`.
#[derive(Debug, Clone)]
pub struct OptionDef<R> {
    declaration: String,
    alias: Option<String>,
    multi_arg: bool,
    runner: Option<R>,
    summary: Vec<String>,
}

impl<R> OptionDef<R> {
    pub fn new(declaration: impl Into<String>) -> Self {
        Self {
            declaration: declaration.into(),
            alias: None,
            multi_arg: false,
            runner: None,
            summary: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn multi_arg(mut self) -> Self {
        self.multi_arg = true;
        self
    }

    pub fn with_runner(mut self, runner: R) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn with_summary(mut self, line: impl Into<String>) -> Self {
        self.summary.push(line.into());
        self
    }
}

/// Arena of commands rooted at a single root command.
///
/// Built once, then only read while parsing.
#[derive(Debug, Clone)]
pub struct CommandTree<R> {
    commands: Vec<Command<R>>,
    config: TreeConfig,
}

const ROOT: CommandId = CommandId(0);
const GLOBAL_OPTIONS: CommandId = CommandId(1);

impl<R> CommandTree<R> {
    /// Creates a tree whose root is declared by `root` (e.g. `"twandy"`).
    pub fn new(root: &str) -> Result<Self> {
        Self::with_config(CommandDef::new(root), TreeConfig::default())
    }

    /// Creates a tree from a full root declaration and lookup configuration.
    pub fn with_config(root: CommandDef<R>, config: TreeConfig) -> Result<Self> {
        let mut tree = Self {
            commands: Vec::new(),
            config,
        };

        let (record, options, subcommands) = tree.new_record(root, None)?;
        tree.commands.push(record);
        let (globals, _, _) = tree.new_record(CommandDef::new(GLOBAL_OPTIONS_NAME), Some(ROOT))?;
        tree.commands.push(globals);

        tree.register_children(ROOT, options, subcommands)?;
        Ok(tree)
    }

    pub fn config(&self) -> TreeConfig {
        self.config
    }

    pub fn root(&self) -> CommandId {
        ROOT
    }

    /// Container of options visible at every depth.
    pub fn global_options(&self) -> CommandId {
        GLOBAL_OPTIONS
    }

    /// # Panics
    ///
    /// Panics if `id` does not come from this tree.
    pub fn command(&self, id: CommandId) -> &Command<R> {
        &self.commands[id.0]
    }

    pub fn parent(&self, id: CommandId) -> Option<CommandId> {
        self.command(id).parent
    }

    pub fn is_root(&self, id: CommandId) -> bool {
        id == ROOT
    }

    /// Number of reachable commands, root included.
    pub fn command_count(&self) -> usize {
        self.commands.len() - 1
    }

    /// Number of declared options across all scopes.
    pub fn option_count(&self) -> usize {
        self.commands.iter().map(|c| c.options.len()).sum()
    }

    /// Sets or replaces the runner of a command.
    pub fn set_runner(&mut self, id: CommandId, runner: R) {
        self.commands[id.0].runner = Some(runner);
    }

    /// Declares a subcommand (and everything nested in `def`) under `parent`.
    ///
    /// # Errors
    ///
    /// [`CrimError::InvalidArgument`] for empty names or when `parent` is the
    /// global-options container, [`CrimError::DuplicateRegistration`] when a
    /// name or alias collides with a sibling.
    pub fn add_command(&mut self, parent: CommandId, def: CommandDef<R>) -> Result<CommandId> {
        if parent == GLOBAL_OPTIONS {
            return Err(CrimError::InvalidArgument(
                "global options container cannot have subcommands".to_string(),
            ));
        }

        let (record, options, subcommands) = self.new_record(def, Some(parent))?;

        let mut keys = vec![record.name.as_str()];
        keys.extend(record.aliases.iter().map(String::as_str));
        check_keys(&self.commands[parent.0].subcommand_trie, "command", &keys)?;

        let id = CommandId(self.commands.len());
        let name = record.name.clone();
        let aliases = record.aliases.clone();
        self.commands.push(record);

        // Descendants land after `id`; the parent only learns about the new
        // command once the whole subtree registered.
        if let Err(err) = self.register_children(id, options, subcommands) {
            self.commands.truncate(id.0);
            return Err(err);
        }

        let owner = &mut self.commands[parent.0];
        owner.subcommand_trie.add(&name, id)?;
        owner.subcommand_trie.add_aliases(id, &aliases)?;
        owner.subcommands.insert(name, id);
        Ok(id)
    }

    /// Declares an option local to `owner`.
    pub fn add_option(&mut self, owner: CommandId, def: OptionDef<R>) -> Result<()> {
        let (name, arg_name) = match split_option(def.declaration.trim()) {
            ("", _) => return Err(CrimError::InvalidArgument("empty option name".to_string())),
            (_, Some("")) => {
                return Err(CrimError::InvalidArgument(format!(
                    "empty arg name for option '{}'",
                    def.declaration.trim()
                )));
            }
            (name, arg_name) => (name.to_string(), arg_name.map(str::to_string)),
        };

        let alias = match def.alias.as_deref().map(str::trim) {
            Some("") => {
                return Err(CrimError::InvalidArgument(format!(
                    "empty alias for option '{name}'"
                )));
            }
            alias => alias.map(str::to_string),
        };

        let command = &mut self.commands[owner.0];
        let mut keys = vec![name.as_str()];
        keys.extend(alias.as_deref());
        check_keys(&command.option_trie, "option", &keys)?;

        let index = command.options.len();
        command.option_trie.add(&name, index)?;
        command.option_trie.add_aliases(index, alias.as_deref())?;
        command.options.insert(
            name.clone(),
            CommandOption {
                name,
                arg_name,
                alias,
                multi_arg: def.multi_arg,
                runner: def.runner,
                summary: def.summary,
            },
        );
        Ok(())
    }

    /// Declares an option visible at every depth.
    pub fn add_global_option(&mut self, def: OptionDef<R>) -> Result<()> {
        self.add_option(GLOBAL_OPTIONS, def)
    }

    /// Resolves a subcommand name, alias or abbreviation under `id`.
    pub fn find_subcommand(&self, id: CommandId, partial: &str) -> Option<CommandId> {
        self.command(id).subcommand_trie.find(partial).copied()
    }

    /// Resolves an option name, alias or abbreviation local to `id`.
    pub fn find_option(&self, id: CommandId, partial: &str) -> Option<&CommandOption<R>> {
        let command = self.command(id);
        command
            .option_trie
            .find(partial)
            .and_then(|&index| command.options.get_index(index))
            .map(|(_, option)| option)
    }

    /// Subcommands of `id` in declaration order.
    pub fn subcommands(&self, id: CommandId) -> impl Iterator<Item = (CommandId, &Command<R>)> {
        self.command(id)
            .subcommands
            .values()
            .map(|&child| (child, self.command(child)))
    }

    /// Options local to `id` in declaration order.
    pub fn options(&self, id: CommandId) -> impl Iterator<Item = &CommandOption<R>> {
        self.command(id).options.values()
    }

    /// Space-separated path from the root (or from just below `stop_at`) to
    /// `id`.
    ///
    /// # Examples
    ///
    /// ```
    /// use crim_core::{CommandDef, CommandTree};
    ///
    /// let mut tree: CommandTree<()> = CommandTree::new("git").unwrap();
    /// let remote = tree.add_command(tree.root(), CommandDef::new("remote")).unwrap();
    /// let add = tree.add_command(remote, CommandDef::new("add <name> <url>")).unwrap();
    ///
    /// assert_eq!(tree.full_name(add, None), "git remote add");
    /// assert_eq!(tree.full_name(add, Some(tree.root())), "remote add");
    /// ```
    pub fn full_name(&self, id: CommandId, stop_at: Option<CommandId>) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(cmd) = current {
            if Some(cmd) == stop_at {
                break;
            }
            let command = self.command(cmd);
            names.push(command.name.as_str());
            current = command.parent;
        }
        names.reverse();
        names.join(" ")
    }

    #[allow(clippy::type_complexity)]
    fn new_record(
        &self,
        def: CommandDef<R>,
        parent: Option<CommandId>,
    ) -> Result<(Command<R>, Vec<OptionDef<R>>, Vec<CommandDef<R>>)> {
        let (name, arg_names) = split_declaration(&def.declaration)?;

        let mut aliases = Vec::with_capacity(def.aliases.len());
        for alias in def.aliases {
            let alias = alias.trim();
            if alias.is_empty() {
                return Err(CrimError::InvalidArgument(format!(
                    "empty alias for command '{name}'"
                )));
            }
            aliases.push(alias.to_string());
        }

        let record = Command {
            name,
            aliases,
            arg_names,
            multi_arg: def.multi_arg,
            runner: def.runner,
            summary: def.summary,
            about: def.about,
            parent,
            subcommands: IndexMap::new(),
            subcommand_trie: Trie::with_allow_longer(self.config.command_allow_longer),
            options: IndexMap::new(),
            option_trie: Trie::with_allow_longer(self.config.option_allow_longer),
        };
        Ok((record, def.options, def.subcommands))
    }

    fn register_children(
        &mut self,
        id: CommandId,
        options: Vec<OptionDef<R>>,
        subcommands: Vec<CommandDef<R>>,
    ) -> Result<()> {
        for option in options {
            self.add_option(id, option)?;
        }
        for subcommand in subcommands {
            self.add_command(id, subcommand)?;
        }
        Ok(())
    }
}

/// Splits `"play <game> <level>"` into the name and its placeholders.
fn split_declaration(declaration: &str) -> Result<(String, Vec<String>)> {
    let declaration = declaration.trim();
    if declaration.is_empty() {
        return Err(CrimError::InvalidArgument("empty name".to_string()));
    }

    match declaration.find(char::is_whitespace) {
        None => Ok((declaration.to_string(), Vec::new())),
        Some(0) => Err(CrimError::InvalidArgument(format!(
            "empty name with args: '{declaration}'"
        ))),
        Some(split) => Ok((
            declaration[..split].to_string(),
            declaration[split..]
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        )),
    }
}

/// Rejects keys already taken in `trie` or repeated within `keys`.
fn check_keys<V>(trie: &Trie<V>, kind: &'static str, keys: &[&str]) -> Result<()> {
    for (i, key) in keys.iter().enumerate() {
        if trie.contains_key(key) || keys[..i].contains(key) {
            return Err(CrimError::DuplicateRegistration {
                kind,
                name: key.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> CommandTree<&'static str> {
        CommandTree::new("twandy").unwrap()
    }

    #[test]
    fn test_declaration_splits_name_and_placeholders() {
        let mut tree = tree();
        let id = tree
            .add_command(tree.root(), CommandDef::new("  copy <src>   <dest> "))
            .unwrap();
        let command = tree.command(id);
        assert_eq!(command.name, "copy");
        assert_eq!(command.arg_names, vec!["<src>", "<dest>"]);
        assert_eq!(command.declaration(), "copy <src> <dest>");
        assert_eq!(command.parent(), Some(tree.root()));
    }

    #[test]
    fn test_option_declaration_forms() {
        let mut tree = tree();
        let root = tree.root();
        tree.add_option(root, OptionDef::new("--out=<file>")).unwrap();
        tree.add_option(root, OptionDef::new("--level <n>")).unwrap();
        tree.add_option(root, OptionDef::new("--quiet")).unwrap();

        assert_eq!(
            tree.find_option(root, "--out").unwrap().arg_name.as_deref(),
            Some("<file>")
        );
        assert_eq!(
            tree.find_option(root, "--level").unwrap().arg_name.as_deref(),
            Some("<n>")
        );
        assert!(!tree.find_option(root, "--quiet").unwrap().takes_arg());
    }

    #[test]
    fn test_rejects_empty_names() {
        let mut tree = tree();
        let root = tree.root();
        assert!(matches!(
            tree.add_command(root, CommandDef::new("   ")),
            Err(CrimError::InvalidArgument(_))
        ));
        assert!(matches!(
            tree.add_option(root, OptionDef::new("=<x>")),
            Err(CrimError::InvalidArgument(_))
        ));
        assert!(matches!(
            tree.add_option(root, OptionDef::new("--out=")),
            Err(CrimError::InvalidArgument(_))
        ));
        assert!(matches!(
            tree.add_option(root, OptionDef::new("--out").with_alias(" ")),
            Err(CrimError::InvalidArgument(_))
        ));
        assert!(CommandTree::<()>::new("").is_err());
    }

    #[test]
    fn test_rejects_sibling_collisions() {
        let mut tree = tree();
        let root = tree.root();
        tree.add_command(root, CommandDef::new("coords").with_alias("x"))
            .unwrap();

        assert_eq!(
            tree.add_command(root, CommandDef::new("x <n>")).unwrap_err(),
            CrimError::DuplicateRegistration {
                kind: "command",
                name: "x".to_string(),
            }
        );
        assert_eq!(
            tree.add_command(root, CommandDef::new("play").with_alias("coords"))
                .unwrap_err(),
            CrimError::DuplicateRegistration {
                kind: "command",
                name: "coords".to_string(),
            }
        );
        assert!(
            tree.add_command(root, CommandDef::new("roll").with_aliases(["r", "r"]))
                .is_err()
        );
        // Failed registrations leave nothing behind.
        assert_eq!(tree.command_count(), 2);
        assert_eq!(tree.find_subcommand(root, "pl"), None);
    }

    #[test]
    fn test_rejects_option_collisions() {
        let mut tree = tree();
        let root = tree.root();
        tree.add_option(root, OptionDef::new("--force").with_alias("-f"))
            .unwrap();
        assert!(matches!(
            tree.add_option(root, OptionDef::new("--fast").with_alias("-f")),
            Err(CrimError::DuplicateRegistration { kind: "option", .. })
        ));
        assert!(matches!(
            tree.add_option(root, OptionDef::new("--force=<how>")),
            Err(CrimError::DuplicateRegistration { kind: "option", .. })
        ));
        // Same name in another scope is fine.
        tree.add_global_option(OptionDef::new("--force")).unwrap();
        assert_eq!(tree.option_count(), 2);
    }

    #[test]
    fn test_nested_failure_rolls_back_whole_subtree() {
        let mut tree = tree();
        let root = tree.root();
        let before = tree.command_count();

        let err = tree
            .add_command(
                root,
                CommandDef::new("remote")
                    .with_subcommand(
                        CommandDef::new("add <name> <url>")
                            .with_option(OptionDef::new("--track=<branch>")),
                    )
                    .with_subcommand(CommandDef::new("add")),
            )
            .unwrap_err();
        assert_eq!(
            err,
            CrimError::DuplicateRegistration {
                kind: "command",
                name: "add".to_string(),
            }
        );
        assert_eq!(tree.command_count(), before);
        assert_eq!(tree.find_subcommand(root, "remote"), None);
        assert_eq!(tree.subcommands(root).count(), 0);

        let option_err = tree.add_command(
            root,
            CommandDef::new("fetch")
                .with_option(OptionDef::new("--all"))
                .with_option(OptionDef::new("--all")),
        );
        assert!(option_err.is_err());
        assert_eq!(tree.command_count(), before);
        assert_eq!(tree.option_count(), 0);

        let remote = tree.add_command(root, CommandDef::new("remote")).unwrap();
        assert_eq!(tree.find_subcommand(root, "remote"), Some(remote));
        assert_eq!(tree.command_count(), before + 1);
    }

    #[test]
    fn test_global_options_container_is_not_a_subcommand() {
        let mut tree = tree();
        let globals = tree.global_options();
        assert_eq!(tree.find_subcommand(tree.root(), GLOBAL_OPTIONS_NAME), None);
        assert_eq!(tree.parent(globals), Some(tree.root()));
        assert!(tree.add_command(globals, CommandDef::new("nope")).is_err());
    }

    #[test]
    fn test_nested_definitions_register_recursively() {
        let mut tree = tree();
        let remote = tree
            .add_command(
                tree.root(),
                CommandDef::new("remote")
                    .with_option(OptionDef::new("--verbose").with_alias("-V"))
                    .with_subcommand(CommandDef::new("add <name> <url>").with_runner("add"))
                    .with_subcommand(CommandDef::new("remove <name>").with_alias("rm")),
            )
            .unwrap();

        let names: Vec<_> = tree.subcommands(remote).map(|(_, c)| c.name.as_str()).collect();
        assert_eq!(names, vec!["add", "remove"]);

        let rm = tree.find_subcommand(remote, "rm").unwrap();
        assert_eq!(tree.full_name(rm, None), "twandy remote remove");
        assert_eq!(tree.find_option(remote, "-V").unwrap().name, "--verbose");
        assert_eq!(tree.command_count(), 4);
    }

    #[test]
    fn test_option_lookup_does_not_allow_longer_by_default() {
        let mut tree = tree();
        let root = tree.root();
        tree.add_option(root, OptionDef::new("--help")).unwrap();
        assert!(tree.find_option(root, "--he").is_some());
        assert!(tree.find_option(root, "--helpme").is_none());

        let config = TreeConfig {
            option_allow_longer: true,
            ..TreeConfig::default()
        };
        let mut tree: CommandTree<()> =
            CommandTree::with_config(CommandDef::new("app"), config).unwrap();
        tree.add_global_option(OptionDef::new("--help")).unwrap();
        assert!(tree.find_option(tree.global_options(), "--helpme").is_some());
    }

    #[test]
    fn test_split_option_tokens() {
        assert_eq!(split_option("--out = x"), ("--out", Some("x")));
        assert_eq!(split_option("--out="), ("--out", Some("")));
        assert_eq!(split_option("play solarus"), ("play", Some("solarus")));
        assert_eq!(split_option("a=b=c"), ("a", Some("b=c")));
    }
}

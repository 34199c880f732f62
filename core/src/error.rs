//! Error types for tree construction, argument parsing and declaration
//! loading.
//!
//! [`CrimError`] covers everything that can go wrong while building a command
//! tree or resolving an argument vector against it. Every parse failure is
//! raised immediately at the offending token; nothing is recovered or retried.
//! [`LoadError`] adds the I/O and format failures of reading a declaration
//! file.

use thiserror::Error;

/// Errors raised while building a command tree or parsing arguments.
///
/// Parse-time variants carry the full path of the command that was current
/// when the error occurred (`None` while still at the root), so the caller can
/// show that command's usage next to the message.
///
/// # Examples
///
/// ```
/// use crim_core::CrimError;
///
/// let err = CrimError::MissingRequiredArguments {
///     command: Some("play".into()),
///     missing: 1,
/// };
/// assert_eq!(err.to_string(), "command 'play': missing 1 required arg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrimError {
    /// Empty key, name, alias or placeholder at construction time.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A command/option name or alias collides with an existing sibling key.
    #[error("duplicate {kind}: '{name}'")]
    DuplicateRegistration {
        /// What was being registered (`"command"`, `"option"` or `"key"`).
        kind: &'static str,
        /// The colliding name or alias.
        name: String,
    },

    /// A token matches neither an option nor a subcommand.
    #[error("{}invalid option/command: '{token}'", scope(.command))]
    InvalidCommandOrOption {
        command: Option<String>,
        token: String,
        /// Zero-based index of the token in the argument vector.
        position: usize,
    },

    /// An option without a placeholder received an embedded value.
    #[error("{}option '{option}' does not accept args: '{value}'", scope(.command))]
    UnexpectedOptionArgument {
        command: Option<String>,
        option: String,
        value: String,
    },

    /// An option with a placeholder was the last token.
    #[error("{}option '{option}' requires an arg", scope(.command))]
    MissingOptionArgument {
        command: Option<String>,
        option: String,
    },

    /// Two distinct options with runners in one argument vector.
    #[error("{}option '{option}' conflicts with option '{selected}' runner", scope(.command))]
    ConflictingOptionRunners {
        command: Option<String>,
        option: String,
        /// Canonical name of the runner option selected first.
        selected: String,
    },

    /// The argument vector ended with positional slots still unfilled.
    #[error("{}missing {missing} required arg{}", scope(.command), plural(.missing))]
    MissingRequiredArguments {
        command: Option<String>,
        /// Number of positional slots still owed.
        missing: usize,
    },
}

fn scope(command: &Option<String>) -> String {
    match command {
        Some(name) => format!("command '{name}': "),
        None => String::new(),
    }
}

fn plural(count: &usize) -> &'static str {
    if *count == 1 { "" } else { "s" }
}

/// Errors raised while loading an application declaration file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The declaration parsed but does not form a valid tree.
    #[error("invalid declaration: {0}")]
    Tree(#[from] CrimError),
}

/// Convenience alias for results with [`CrimError`].
pub type Result<T> = std::result::Result<T, CrimError>;

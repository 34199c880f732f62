//! Plain-text help rendering for a command tree.

use std::fmt::Write;

use crate::command::{CommandId, CommandTree};

/// Renders the full help page of `id`: usage, about, subcommands, its own
/// options and the global options.
///
/// Sections without content are left out.
pub fn render_help<R>(tree: &CommandTree<R>, id: CommandId) -> String {
    let mut sections = vec![render_usage(tree, id)];
    sections.extend(render_about(tree, id));
    sections.extend(render_subcommands(tree, id));
    sections.extend(render_options(tree, id));
    if id != tree.global_options() {
        sections.extend(render_options(tree, tree.global_options()));
    }
    sections.join("\n")
}

/// `USAGE` section with the full command path and placeholders.
pub fn render_usage<R>(tree: &CommandTree<R>, id: CommandId) -> String {
    let command = tree.command(id);
    let mut out = String::from("USAGE\n");

    let _ = write!(out, "  {} [options]", tree.full_name(id, None));
    for arg_name in &command.arg_names {
        let _ = write!(out, " {arg_name}");
    }
    if command.multi_arg {
        out.push_str(" [args...]");
    }
    if tree.subcommands(id).next().is_some() {
        out.push_str(" [commands]");
    }
    out.push('\n');

    if !command.aliases.is_empty() {
        let _ = writeln!(out, "\n  aliases: {}", command.aliases.join(" "));
    }
    out
}

fn render_about<R>(tree: &CommandTree<R>, id: CommandId) -> Option<String> {
    let command = tree.command(id);
    let lines = if command.about.is_empty() {
        &command.summary
    } else {
        &command.about
    };
    if lines.is_empty() {
        return None;
    }

    let mut out = String::from("ABOUT\n");
    for line in lines {
        let _ = writeln!(out, "  {line}");
    }
    Some(out)
}

fn render_subcommands<R>(tree: &CommandTree<R>, id: CommandId) -> Option<String> {
    let rows: Vec<(String, &[String])> = tree
        .subcommands(id)
        .map(|(_, sub)| {
            let mut label = sub.declaration();
            if !sub.aliases.is_empty() {
                let _ = write!(label, "; {}", sub.aliases.join(" "));
            }
            let summary = if sub.summary.is_empty() {
                &sub.about
            } else {
                &sub.summary
            };
            (label, summary.as_slice())
        })
        .collect();
    if rows.is_empty() {
        return None;
    }

    let title = if tree.is_root(id) {
        "COMMANDS"
    } else {
        "SUBCOMMANDS"
    };
    Some(render_table(title, &rows))
}

fn render_options<R>(tree: &CommandTree<R>, id: CommandId) -> Option<String> {
    let rows: Vec<(String, &[String])> = tree
        .options(id)
        .map(|option| {
            let mut label = String::new();
            if let Some(alias) = &option.alias {
                let _ = write!(label, "{alias} ");
            }
            label.push_str(&option.name);
            if let Some(arg_name) = &option.arg_name {
                let _ = write!(label, "={arg_name}");
                if option.multi_arg {
                    label.push_str("...");
                }
            }
            (label, option.summary.as_slice())
        })
        .collect();
    if rows.is_empty() {
        return None;
    }

    let title = if id == tree.global_options() {
        "GLOBAL OPTIONS"
    } else {
        "OPTIONS"
    };
    Some(render_table(title, &rows))
}

/// Two-column table; summaries line up four columns past the widest label.
fn render_table(title: &str, rows: &[(String, &[String])]) -> String {
    let width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        + 4;

    let mut out = format!("{title}\n");
    for (label, summary) in rows {
        let mut lines = summary.iter();
        match lines.next() {
            None => {
                let _ = writeln!(out, "  {label}");
            }
            Some(first) => {
                let _ = writeln!(out, "  {label:<width$}{first}");
                for line in lines {
                    let _ = writeln!(out, "  {:width$}{line}", "");
                }
            }
        }
    }
    out
}

use std::io::{self, BufRead};

use crim_core::{
    App, AppDecl, CommandData, CommandDef, Dispatch, Invocation, OptionDef, Runner, RunnerSource,
    TreeConfig,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, reload};

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Parse,
    Check,
    Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    fn from_arg(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            None | Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some(other) => Err(format!(
                "Unsupported --format '{other}' (expected json or yaml)"
            )),
        }
    }
}

/// Outcome of parsing one line against a declared tree.
#[derive(Debug, Serialize)]
struct LineReport {
    tokens: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<RunnerSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<CommandData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl LineReport {
    fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

fn main() {
    let filter = init_tracing();

    let app = match build_app() {
        Ok(app) => app,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let dispatch = match app.dispatch(&argv) {
        Ok(dispatch) => dispatch,
        Err(err) => {
            eprint!("{}", app.help_text(app.root()));
            eprintln!("\nerror: {err}");
            std::process::exit(1);
        }
    };

    let result = match dispatch {
        Dispatch::Help { command } => {
            print!("{}", app.help_text(command));
            Ok(())
        }
        Dispatch::Version => {
            println!("{}", app.version_text());
            Ok(())
        }
        Dispatch::Run(invocation) => run(invocation, &filter),
        Dispatch::Nothing => Ok(()),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn build_app() -> crim_core::Result<App<Action>> {
    let root = CommandDef::new("crim")
        .with_about("Load declared command trees and try argument vectors against them.")
        .with_subcommand(
            CommandDef::new("parse <tree-file>")
                .with_summary("Parse a line (or each stdin line) against a declared tree.")
                .with_option(
                    OptionDef::new("--line=<text>")
                        .with_alias("-l")
                        .with_summary("Line to parse instead of reading stdin."),
                )
                .with_option(
                    OptionDef::new("--format=<format>")
                        .with_alias("-f")
                        .with_summary("Report format: json (default) or yaml."),
                )
                .with_runner(Runner::Action(Action::Parse)),
        )
        .with_subcommand(
            CommandDef::new("check <tree-file>")
                .with_summary("Load a declared tree and print its size.")
                .with_runner(Runner::Action(Action::Check)),
        )
        .with_subcommand(
            CommandDef::new("usage")
                .with_alias("show")
                .multi_arg()
                .with_summary("Show help of a declared tree:")
                .with_summary("usage <tree-file> [command path...]")
                .with_runner(Runner::Action(Action::Usage)),
        );

    let mut app = App::from_root(root, PACKAGE_VERSION, TreeConfig::default())?;
    app.add_global_option(
        OptionDef::new("--log-level=<level>")
            .with_summary("Log filter (e.g. debug); overrides RUST_LOG."),
    )?;
    app.add_defaults()?;
    Ok(app)
}

fn run(invocation: Invocation<'_, Action>, filter: &FilterHandle) -> Result<(), String> {
    if let Some(level) = invocation.data.opt("--log-level") {
        set_log_level(filter, level)?;
    }

    let data = &invocation.data;
    match invocation.action {
        Action::Parse => run_parse(data),
        Action::Check => run_check(data),
        Action::Usage => run_usage(data),
    }
}

/// Installs the stderr subscriber from `RUST_LOG` (default `warn`) before
/// `crim`'s own argv is parsed. `--log-level` can only be read after that
/// parse, so the filter stays swappable.
fn init_tracing() -> FilterHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
    handle
}

fn set_log_level(filter: &FilterHandle, level: &str) -> Result<(), String> {
    let level = EnvFilter::try_new(level)
        .map_err(|err| format!("Invalid --log-level '{level}': {err}"))?;
    filter
        .reload(level)
        .map_err(|err| format!("Failed to apply --log-level: {err}"))
}

fn run_parse(data: &CommandData) -> Result<(), String> {
    let format = OutputFormat::from_arg(data.opt("--format"))?;
    let app = load_app(data.arg("<tree-file>"))?;

    let lines = match data.opt("--line") {
        Some(line) => vec![line.to_string()],
        None => read_stdin_lines()?,
    };

    let mut failed = 0usize;
    for line in &lines {
        let report = parse_line(&app, line);
        if report.is_error() {
            failed += 1;
        }
        println!("{}", format_report(&report, format)?);
    }

    if failed > 0 {
        return Err(format!("{failed} of {} line(s) failed to parse", lines.len()));
    }
    Ok(())
}

fn run_check(data: &CommandData) -> Result<(), String> {
    let app = load_app(data.arg("<tree-file>"))?;
    println!(
        "Loaded '{}' v{}: {} command(s), {} option(s).",
        app.name(),
        app.version(),
        app.tree().command_count(),
        app.tree().option_count()
    );
    Ok(())
}

fn run_usage(data: &CommandData) -> Result<(), String> {
    let Some((tree_file, path)) = data.multi_args.split_first() else {
        return Err("Missing <tree-file>; see 'crim help usage'".to_string());
    };

    let app = load_app(Some(tree_file.as_str()))?;
    let target = app.help_target(path);
    print!("{}", app.help_text(target));
    Ok(())
}

fn load_app(path: Option<&str>) -> Result<App<String>, String> {
    let path = path.ok_or_else(|| "Missing <tree-file>".to_string())?;
    let decl = AppDecl::load(path).map_err(|err| format!("Failed to load '{path}': {err}"))?;
    let app = decl
        .build()
        .map_err(|err| format!("Invalid tree in '{path}': {err}"))?;
    debug!(path, app = %app.name(), "loaded declared tree");
    Ok(app)
}

fn read_stdin_lines() -> Result<Vec<String>, String> {
    let mut lines = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.map_err(|err| format!("Failed to read stdin: {err}"))?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

fn parse_line(app: &App<String>, line: &str) -> LineReport {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let tree = app.tree();

    let parsed = tree.parse(&tokens);
    match parsed {
        Ok(outcome) => LineReport {
            command: Some(tree.full_name(outcome.command, None)),
            runner: outcome.runner.map(ToString::to_string),
            source: outcome.source,
            data: Some(outcome.data),
            error: None,
            tokens,
        },
        Err(err) => LineReport {
            command: None,
            runner: None,
            source: None,
            data: None,
            error: Some(err.to_string()),
            tokens,
        },
    }
}

fn format_report(report: &LineReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string(report)
            .map_err(|err| format!("Failed to serialize report: {err}")),
        OutputFormat::Yaml => serde_yaml::to_string(report)
            .map(|raw| format!("---\n{}", raw.trim_end()))
            .map_err(|err| format!("Failed to serialize report: {err}")),
    }
}

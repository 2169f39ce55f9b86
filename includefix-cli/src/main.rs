mod config;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use includefix_core::adapters::FsWritePort;
use includefix_core::pipeline::{run_reconcile, write_reconcile_artifacts};
use includefix_core::settings::ReconcileSettings;
use includefix_core::{ReconcileError, ToolInfo};
use includefix_edit::PersistMode;
use includefix_engine::{RuleSet, RuleShape};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "includefix",
    version,
    about = "Reconciles C/C++ include paths against a canonical header root."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Discover headers, rewrite references, and patch the build config.
    Reconcile(ReconcileArgs),
    /// List the built-in rewrite rules in priority order.
    ListRules(ListRulesArgs),
}

#[derive(Debug, Parser)]
struct ReconcileArgs {
    /// Root of the source tree to repair (default: current directory).
    #[arg(long, default_value = ".")]
    source: Utf8PathBuf,

    /// Candidate header roots in priority order; the first is the canonical
    /// include root (default: <source>/include).
    #[arg(long = "include-roots", value_delimiter = ',')]
    include_roots: Vec<Utf8PathBuf>,

    /// Persistence mode on unresolved references.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Run the full pipeline but suppress filesystem writes.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Build configuration to patch (default: <source>/CMakeLists.txt).
    #[arg(long)]
    build_config: Option<Utf8PathBuf>,

    /// Output directory for artifacts (default: <source>/artifacts/includefix).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Leave scattered canonical headers where they are.
    #[arg(long, default_value_t = false)]
    no_consolidate: bool,

    /// Worker count for the rewrite pool.
    #[arg(long)]
    jobs: Option<usize>,

    /// Restrict discovery to these header base names.
    #[arg(long = "expect", value_delimiter = ',')]
    expected: Vec<String>,

    /// Mirror originals of overwritten files into <out-dir>/backups.
    #[arg(long, default_value_t = false)]
    backups: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Strict,
    BestEffort,
}

impl From<ModeArg> for PersistMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Strict => PersistMode::Strict,
            ModeArg::BestEffort => PersistMode::BestEffort,
        }
    }
}

#[derive(Debug, Parser)]
struct ListRulesArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn real_main() -> anyhow::Result<u8> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Reconcile(args) => cmd_reconcile(args),
        Command::ListRules(args) => {
            cmd_list_rules(args)?;
            Ok(0)
        }
    }
}

fn cmd_reconcile(args: ReconcileArgs) -> anyhow::Result<u8> {
    let settings = build_settings(args)?;

    let outcome = match run_reconcile(&settings, tool_info()) {
        Ok(outcome) => outcome,
        Err(ReconcileError::Halted(halt)) => {
            error!("run halted: {halt}");
            return Ok(2);
        }
        Err(ReconcileError::Runtime(err)) => return Err(err),
    };

    write_reconcile_artifacts(&outcome, &settings.out_dir, &FsWritePort)
        .context("write artifacts")?;
    info!("wrote artifacts to {}", settings.out_dir);

    if let Some(halted) = &outcome.report.halted {
        error!("run halted: {halted}");
    }
    for ambiguity in &outcome.report.ambiguities {
        error!(
            "ambiguous header {} ({} candidates)",
            ambiguity.name,
            ambiguity.candidates.len()
        );
    }
    for unresolved in &outcome.report.unresolved {
        info!(
            "unresolved {}:{} \"{}\"",
            unresolved.file, unresolved.line, unresolved.reference
        );
    }

    Ok(outcome.status.exit_code())
}

fn build_settings(args: ReconcileArgs) -> anyhow::Result<ReconcileSettings> {
    let source_root = args.source;
    let file_config =
        config::load_or_default(&source_root).context("load includefix.toml config")?;

    let defaults = ReconcileSettings::default();

    // CLI arguments take precedence over the config file; the config file
    // takes precedence over built-in defaults.
    let include_roots = if !args.include_roots.is_empty() {
        args.include_roots
    } else if !file_config.discovery.include_roots.is_empty() {
        file_config
            .discovery
            .include_roots
            .iter()
            .map(|root| source_root.join(root))
            .collect()
    } else {
        vec![source_root.join("include")]
    };

    let mode = match args.mode {
        Some(mode) => mode.into(),
        None => match &file_config.rewrite.mode {
            Some(mode) => config::parse_mode(mode)?,
            None => defaults.mode,
        },
    };

    let settings = ReconcileSettings {
        build_config: Some(
            args.build_config
                .unwrap_or_else(|| source_root.join("CMakeLists.txt")),
        ),
        out_dir: args
            .out_dir
            .unwrap_or_else(|| source_root.join("artifacts").join("includefix")),
        include_roots,
        mode,
        dry_run: args.dry_run,
        consolidate: !args.no_consolidate,
        jobs: args.jobs.or(file_config.rewrite.jobs),
        header_suffixes: non_empty_or(
            file_config.discovery.header_suffixes,
            defaults.header_suffixes,
        ),
        expected_headers: if !args.expected.is_empty() {
            args.expected
        } else {
            file_config.discovery.expected
        },
        source_suffixes: non_empty_or(
            file_config.rewrite.source_suffixes,
            defaults.source_suffixes,
        ),
        skip_dirs: non_empty_or(file_config.rewrite.skip_dirs, defaults.skip_dirs),
        root_prefixes: non_empty_or(file_config.rewrite.root_prefixes, defaults.root_prefixes),
        backups_enabled: args.backups || file_config.backups.enabled,
        source_root,
    };

    debug!(?settings, "merged settings");
    Ok(settings)
}

fn non_empty_or<T>(value: Vec<T>, fallback: Vec<T>) -> Vec<T> {
    if value.is_empty() { fallback } else { value }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "includefix".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        commit: None,
    }
}

fn cmd_list_rules(args: ListRulesArgs) -> anyhow::Result<()> {
    let rules = RuleSet::default();

    match args.format {
        OutputFormat::Text => {
            println!("Built-in rewrite rules, in priority order:\n");
            for (i, rule) in rules.rules().iter().enumerate() {
                println!("  {}. {:<16} {}", i + 1, rule.id, describe_shape(&rule.shape));
            }
            println!();
            println!("A quoted include matching none of these shapes is left untouched.");
        }
        OutputFormat::Json => {
            let rules: Vec<_> = rules
                .rules()
                .iter()
                .map(|rule| {
                    serde_json::json!({
                        "id": rule.id,
                        "description": describe_shape(&rule.shape),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
    }
    Ok(())
}

fn describe_shape(shape: &RuleShape) -> String {
    match shape {
        RuleShape::ParentRelative => {
            "one or more ../ segments, then the header name (\"../Graphics.h\")".to_string()
        }
        RuleShape::RootPrefixed { prefixes } => format!(
            "a known tree prefix ({}), then the header name (\"src/Entity/UFO.h\")",
            prefixes.join(", ")
        ),
        RuleShape::Subfolder => {
            "one or more directories, then the header name (\"Entity/Graphics.h\")".to_string()
        }
    }
}

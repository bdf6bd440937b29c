//! Cohort Metrics Core - batch conversion and retention analysis
//!
//! The main entry point for cm-core, handling:
//! - Config resolution (flag, environment, XDG, system, built-in preset)
//! - Loading raw rows from JSON or JSON Lines
//! - Running the analysis and rendering JSON, Markdown or a summary line

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use cm_common::{format_error_human, Error, OutputFormat, Result, RunId, StructuredError};
use cm_config::{
    get_preset, list_presets, resolve_config_path, validate_config, AnalysisConfig,
    ConfigSnapshot, ConfigSource, PresetName,
};
use cm_core::exit_codes::ExitCode;
use cm_core::logging::{event_names, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage};
use cm_core::{load_rows, render, run_analysis};

/// Cohort Metrics - conversion and retention by registration cohort
#[derive(Parser)]
#[command(name = "cm-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level (overrides -v/-q and CM_LOG)
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (overrides CM_LOG_FORMAT)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,
}

/// Where the analysis configuration comes from
#[derive(Args, Debug, Default)]
struct ConfigSelect {
    /// Built-in preset (conversion, retention, pay_time)
    #[arg(long, conflicts_with = "config")]
    preset: Option<PresetName>,

    /// Analysis configuration file (JSON); COHORT_METRICS_CONFIG is used when absent
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze rows and print a report
    Run(RunArgs),
    /// Validate an analysis configuration without reading any rows
    Check(ConfigSelect),
    /// List built-in presets
    Presets,
    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input rows: .json array, .jsonl/.ndjson lines, or - for stdin
    #[arg(long, short = 'i')]
    input: PathBuf,

    #[command(flatten)]
    select: ConfigSelect,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration
    Show(ConfigSelect),
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            std::process::exit(code.as_i32());
        }
    };

    let cli_level = cli.global.log_level.or(if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    });
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let run_id = RunId::new();
    let ctx = LogContext::new(run_id.as_str());
    let span = tracing::info_span!("run", run_id = %run_id);
    let _enter = span.enter();

    let result = match &cli.command {
        Commands::Run(args) => run_cmd(&cli.global, args, &ctx),
        Commands::Check(select) => check_cmd(&cli.global, select),
        Commands::Presets => presets_cmd(&cli.global),
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show(select) => config_show_cmd(select),
        },
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => {
            report_error(&cli.global, &err, &ctx);
            ExitCode::for_error(&err)
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn report_error(global: &GlobalOpts, err: &Error, ctx: &LogContext) {
    cm_core::log_event!(
        ctx,
        ERROR,
        event_names::INTERNAL_ERROR,
        Stage::Init,
        "command failed",
        code = err.code()
    );
    if global.format == OutputFormat::Json {
        eprintln!("{}", StructuredError::from(err).to_json());
    } else {
        let use_color = !global.no_color && std::io::stderr().is_terminal();
        eprintln!("{}", format_error_human(err, use_color));
    }
}

/// Resolve the analysis configuration: `--preset`, then the path chain,
/// then the conversion preset.
fn load_analysis_config(select: &ConfigSelect) -> Result<(AnalysisConfig, ConfigSource)> {
    if let Some(preset) = select.preset {
        tracing::debug!(
            target: event_names::CONFIG_DEFAULT_USED,
            stage = %Stage::Init,
            preset = %preset,
            message = "using preset from flag"
        );
        return Ok((get_preset(preset), ConfigSource::BuiltinPreset));
    }

    let (path, source) = resolve_config_path(select.config.as_deref());
    match path {
        Some(path) => {
            let config = AnalysisConfig::from_file(&path).map_err(|e| {
                tracing::error!(
                    target: event_names::CONFIG_ERROR,
                    stage = %Stage::Init,
                    path = %path.display(),
                    message = "configuration could not be loaded"
                );
                Error::from(e)
            })?;
            tracing::info!(
                target: event_names::CONFIG_LOADED,
                stage = %Stage::Init,
                path = %path.display(),
                source = %source,
                message = "configuration loaded"
            );
            Ok((config, source))
        }
        None => {
            tracing::info!(
                target: event_names::CONFIG_DEFAULT_USED,
                stage = %Stage::Init,
                preset = %PresetName::Conversion,
                message = "no configuration file found, using preset"
            );
            Ok((get_preset(PresetName::Conversion), ConfigSource::BuiltinPreset))
        }
    }
}

fn run_cmd(global: &GlobalOpts, args: &RunArgs, ctx: &LogContext) -> Result<ExitCode> {
    cm_core::log_event!(
        ctx,
        INFO,
        event_names::RUN_STARTED,
        Stage::Init,
        "analysis run started",
        input = tracing::field::display(args.input.display())
    );

    let (config, source) = load_analysis_config(&args.select)?;
    let rows = load_rows(&args.input)?;
    tracing::info!(
        target: event_names::INPUT_LOADED,
        stage = %Stage::Init,
        rows = rows.len() as u64,
        message = "input rows loaded"
    );

    let report = run_analysis(&rows, &config, &source)?;
    let rendered = render(&report, global.format)?;
    write_output(args.output.as_deref(), &rendered)?;

    let exit_code = if report.is_empty() {
        ExitCode::NoRecords
    } else {
        ExitCode::Clean
    };
    cm_core::log_event!(
        ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Report,
        "analysis run finished",
        cohorts = report.cohort_count as u64,
        exit_code = exit_code.as_i32()
    );
    Ok(exit_code)
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<()> {
    match path {
        Some(path) => {
            let mut content = rendered.to_string();
            if !content.ends_with('\n') {
                content.push('\n');
            }
            std::fs::write(path, content)?;
            tracing::info!(
                target: event_names::REPORT_WRITTEN,
                stage = %Stage::Report,
                path = %path.display(),
                message = "report written"
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn check_cmd(global: &GlobalOpts, select: &ConfigSelect) -> Result<ExitCode> {
    let (config, source) = load_analysis_config(select)?;
    validate_config(&config)?;
    let snapshot = ConfigSnapshot::new(&config, &source);

    match global.format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "status": "ok",
                "snapshot": snapshot,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Md | OutputFormat::Summary => {
            println!(
                "ok: config {} ({}), {} windows, {} histograms, {} periods",
                snapshot.short_id(),
                snapshot.source,
                snapshot.summary.windows.len(),
                snapshot.summary.histograms.len(),
                snapshot.summary.period_count
            );
        }
    }
    Ok(ExitCode::Clean)
}

fn presets_cmd(global: &GlobalOpts) -> Result<ExitCode> {
    let presets = list_presets();
    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&presets)?),
        OutputFormat::Md => {
            println!("| Preset | Description |");
            println!("|---|---|");
            for p in &presets {
                println!("| {} | {} |", p.name, p.description);
            }
        }
        OutputFormat::Summary => {
            let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
            println!("{}", names.join(" "));
        }
    }
    Ok(ExitCode::Clean)
}

fn config_show_cmd(select: &ConfigSelect) -> Result<ExitCode> {
    let (config, _) = load_analysis_config(select)?;
    println!("{}", config.to_json_pretty()?);
    Ok(ExitCode::Clean)
}

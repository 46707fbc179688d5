//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use tipitaka_core::pipeline::{BuildConfig, BuildReport, ProgressReporter};
use tipitaka_script::{BridgeTransliterator, CachedTransliterator, Transliterator};
use tipitaka_shared::{
    AppConfig, TipitakaError, init_config, load_config, load_config_from,
};
use tipitaka_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Tipitaka builder: generate per-script documentation trees from the Pali canon.
#[derive(Parser)]
#[command(
    name = "tipitaka",
    version,
    about = "Generate per-script Markdown trees of the Tipitaka from its record store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.tipitaka-builder/tipitaka-builder.toml.
    #[arg(long, global = true, env = "TIPITAKA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate the document trees.
    Build {
        /// Record store (SQLite) path.
        #[arg(long, env = "TIPITAKA_DB")]
        db: Option<PathBuf>,

        /// Output root; one directory per script is created below it.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Build mode: hierarchy or chapters.
        #[arg(short, long)]
        mode: Option<String>,

        /// Script code to build (repeatable). Defaults to all.
        #[arg(short, long = "script")]
        scripts: Vec<String>,

        /// Book id or abbreviation to build (repeatable). Defaults to all.
        #[arg(short, long = "book")]
        books: Vec<String>,

        /// Remove each selected script tree before building.
        #[arg(long)]
        clean: bool,
    },

    /// List configured script profiles.
    Scripts,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

const CRATES: [&str; 5] = [
    "tipitaka_cli",
    "tipitaka_core",
    "tipitaka_script",
    "tipitaka_storage",
    "tipitaka_shared",
];

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = CRATES
        .iter()
        .map(|c| format!("{c}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build {
            db,
            out,
            mode,
            scripts,
            books,
            clean,
        } => {
            let options = BuildOptions {
                db,
                out,
                mode,
                scripts,
                books,
                clean,
            };
            cmd_build(&resolve_config(config_path)?, options).await
        }
        Command::Scripts => cmd_scripts(&resolve_config(config_path)?),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&resolve_config(config_path)?),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

/// Flag overrides for `build`.
struct BuildOptions {
    db: Option<PathBuf>,
    out: Option<PathBuf>,
    mode: Option<String>,
    scripts: Vec<String>,
    books: Vec<String>,
    clean: bool,
}

async fn cmd_build(config: &AppConfig, options: BuildOptions) -> Result<()> {
    let mut build_config = BuildConfig::from_app_config(config, &options.scripts)?;
    if let Some(out) = options.out {
        build_config.output_root = out;
    }
    if let Some(mode) = options.mode.as_deref() {
        build_config.mode = mode.parse()?;
    }
    build_config.books = options.books;
    build_config.clean = options.clean;

    let db_path = options
        .db
        .unwrap_or_else(|| PathBuf::from(&config.defaults.database));

    info!(
        db = %db_path.display(),
        out = %build_config.output_root.display(),
        mode = %build_config.mode,
        scripts = build_config.scripts.len(),
        clean = build_config.clean,
        "building document trees"
    );

    let storage = Storage::open_readonly(&db_path).await?;

    // The bridge is only needed when some selected script is not the native one.
    let needs_engine = build_config.scripts.iter().any(|p| !p.is_identity());
    let engine = if needs_engine {
        Some(CachedTransliterator::new(BridgeTransliterator::spawn(
            &config.bridge,
        )?))
    } else {
        None
    };

    let reporter = CliProgress::new();
    let result = match &engine {
        Some(engine) => {
            tipitaka_core::pipeline::build(&build_config, &storage, engine, &reporter).await
        }
        None => {
            tipitaka_core::pipeline::build(&build_config, &storage, &NoEngine, &reporter).await
        }
    };

    if let Some(engine) = engine {
        info!(
            cached = engine.len(),
            cache_bytes = engine.bytes(),
            "shutting down transliteration bridge"
        );
        engine.into_inner().shutdown();
    }
    let report = result?;

    println!();
    println!("  Build complete!");
    println!("  Scripts:  {}", report.scripts);
    println!("  Books:    {}", report.books);
    println!("  Skipped:  {}", report.books_skipped);
    println!("  Written:  {}", report.units_created);
    println!("  Existing: {}", report.units_already_present);
    println!("  Output:   {}", build_config.output_root.display());
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

/// Stand-in engine for builds that only emit the native script.
struct NoEngine;

impl Transliterator for NoEngine {
    fn transliterate(
        &self,
        _text: &str,
        _source: &str,
        _dest: &str,
    ) -> tipitaka_shared::Result<String> {
        Err(TipitakaError::Transliteration(
            "no transliteration bridge is running".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn book_started(&self, abbr: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {abbr}"));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// scripts / config
// ---------------------------------------------------------------------------

fn cmd_scripts(config: &AppConfig) -> Result<()> {
    for code in config.script_codes() {
        let profile = config.profile(&code)?;
        if profile.is_identity() {
            println!("  {code:<6} native");
            continue;
        }
        let rules = profile
            .corrections
            .iter()
            .map(|c| format!("{:?}->{:?}", c.from, c.to))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {code:<6} {} -> {}  {rules}", profile.from, profile.to);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| eyre!("cannot render config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

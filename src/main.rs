// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;

use mclt::app_config::{self, Config, TranslationProvider};
use mclt::app_controller::Controller;
use mclt::pipeline::{CancellationFlag, RunStatus};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTranslationProvider {
    Google,
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Google => TranslationProvider::Google,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a localization file or folder (default command)
    Translate(TranslateArgs),

    /// Check platform, network and provider connectivity
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: String,
    },

    /// Generate shell completions for mclt
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug, Clone)]
struct TranslateArgs {
    /// Input .yml/.yaml file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output file (file mode) or directory (folder mode)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to try first
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name for the selected provider
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g. 'en', 'auto')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g. 'it', 'pt_BR')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Shortcut for --log-level debug
    #[arg(short, long)]
    verbose: bool,

    /// Do not write a .bak copy of the input
    #[arg(long)]
    no_backup: bool,
}

/// mclt - Minecraft localization translator
///
/// Translates YAML language files of Minecraft plugins while keeping
/// placeholders, colour codes and game terms intact.
#[derive(Parser, Debug)]
#[command(name = "mclt")]
#[command(version)]
#[command(about = "Placeholder-preserving translator for Minecraft localization files")]
#[command(long_about = "mclt repairs, translates and verifies YAML localization files.

EXAMPLES:
    mclt messages.yml                        # Translate using default config
    mclt -t de messages.yml                  # Translate to German
    mclt -p ollama -m llama3.2:3b lang/      # Every .yml under lang/ with Ollama
    mclt -o out/messages_it.yml messages.yml # Explicit output file
    mclt check                               # Test network and providers
    mclt completions bash > mclt.bash        # Generate bash completions

EXIT STATUS:
    0 success, 2 degraded (see the .manifest.txt next to the output), 1 failed

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file does not
    exist, a default one is created.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input .yml/.yaml file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output file (file mode) or directory (folder mode)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to try first
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name for the selected provider
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g. 'en', 'auto')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g. 'it', 'pt_BR')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Shortcut for --log-level debug
    #[arg(short, long)]
    verbose: bool,

    /// Do not write a .bak copy of the input
    #[arg(long)]
    no_backup: bool,
}

impl CommandLineOptions {
    // @returns: Top-level arguments as a translate command, used when no subcommand is given
    fn into_translate_args(self) -> Result<TranslateArgs> {
        let input_path = self
            .input_path
            .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

        Ok(TranslateArgs {
            input_path,
            output: self.output,
            force_overwrite: self.force_overwrite,
            provider: self.provider,
            model: self.model,
            source_language: self.source_language,
            target_language: self.target_language,
            config_path: self.config_path,
            log_level: self.log_level,
            verbose: self.verbose,
            no_backup: self.no_backup,
        })
    }
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger; the effective level is set later with log::set_max_level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(std::io::stderr(), "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let mut cli = CommandLineOptions::parse();

    let status = match cli.command.take() {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "mclt", &mut std::io::stdout());
            return Ok(());
        }
        Some(Commands::Check { config_path }) => run_check(&config_path).await?,
        Some(Commands::Translate(args)) => run_translate(args).await?,
        // Default behavior: top-level args
        None => run_translate(cli.into_translate_args()?).await?,
    };

    log::logger().flush();
    if status != RunStatus::Success {
        std::process::exit(status.exit_code());
    }
    Ok(())
}

/// Load the configuration and apply command line overrides
fn load_config(options: &TranslateArgs) -> Result<Config> {
    let mut config = Config::load_or_create(&options.config_path)
        .with_context(|| format!("Failed to load config file: {}", options.config_path))?;

    if let Some(provider) = options.provider {
        config.translation.prefer_provider(provider.into());
    }
    if let Some(model) = &options.model {
        let provider = config
            .translation
            .providers
            .first()
            .copied()
            .unwrap_or_default();
        config.translation.set_model(provider, model);
    }
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(log_level) = options.log_level {
        config.log_level = log_level.into();
    }
    if options.verbose {
        config.log_level = app_config::LogLevel::Debug;
    }
    if options.no_backup {
        config.backup = false;
    }

    Ok(config)
}

async fn run_translate(options: TranslateArgs) -> Result<RunStatus> {
    let config = load_config(&options)?;
    log::set_max_level(config.log_level.into());

    config.validate().context("Configuration validation failed")?;
    info!(
        "Translating {} -> {} with {}",
        config.source_language,
        config.target_language,
        config
            .translation
            .providers
            .iter()
            .map(|p| p.display_name())
            .collect::<Vec<_>>()
            .join(" > ")
    );

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing entries in flight");
            on_interrupt.cancel();
        }
    });

    let controller = Controller::with_config(config)?.with_cancellation(cancel);
    controller
        .run(options.input_path, options.output, options.force_overwrite)
        .await
}

async fn run_check(config_path: &str) -> Result<RunStatus> {
    let config = Config::load_or_create(config_path)
        .with_context(|| format!("Failed to load config file: {}", config_path))?;
    log::set_max_level(config.log_level.into());

    let controller = Controller::with_config(config)?;
    let items = controller.check_environment().await;

    let mut all_ok = true;
    for item in &items {
        if item.ok {
            info!("[ok]   {}: {}", item.name, item.detail);
        } else {
            all_ok = false;
            error!("[fail] {}: {}", item.name, item.detail);
        }
    }

    Ok(if all_ok { RunStatus::Success } else { RunStatus::Failed })
}

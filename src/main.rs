//! prm CLI
//!
//! Browse project sources in the terminal, or manage them from the shell.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use prm::error::AppError;
use prm::logging;
use prm::provider::ProviderRegistry;
use prm::source::SourceCatalog;
use prm::tui::run::run;
use prm::types::AppConfig;

#[derive(Parser)]
#[command(name = "prm")]
#[command(about = "Keyboard-driven terminal browser for project sources")]
#[command(version)]
struct Cli {
    /// Directory holding the sources
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Directory for log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Run the interactive UI when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List sources with their provider indicator
    Sources,

    /// List registered providers
    Providers,

    /// Create a new source on disk
    NewSource {
        /// Display name
        name: String,

        /// Provider id
        #[arg(long, default_value = "local")]
        provider: String,
    },
}

impl Cli {
    fn config(&self) -> AppConfig {
        let defaults = AppConfig::default();
        AppConfig {
            data_dir: self.data_dir.clone().unwrap_or(defaults.data_dir),
            settings_path: self.settings.clone().unwrap_or(defaults.settings_path),
            log_dir: self.log_dir.clone().unwrap_or(defaults.log_dir),
            tick_interval: defaults.tick_interval,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();
    let _logging = logging::init(&config.log_dir);

    let result = match cli.command {
        None => run(config),
        Some(Commands::Sources) => cmd_sources(&config),
        Some(Commands::Providers) => cmd_providers(),
        Some(Commands::NewSource { name, provider }) => cmd_new_source(&config, &name, &provider),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn catalog(config: &AppConfig) -> SourceCatalog {
    SourceCatalog::new(&config.data_dir, ProviderRegistry::builtin())
}

fn cmd_sources(config: &AppConfig) -> Result<(), AppError> {
    let catalog = catalog(config);
    let sources = catalog.list()?;

    if sources.is_empty() {
        println!("No sources in {}", catalog.root().display());
        println!();
        println!("To create one: prm new-source <NAME>");
        return Ok(());
    }

    for info in &sources {
        println!(
            "{} {}  {}",
            catalog.registry().indicator(&info.meta.provider),
            info.id,
            info.meta.name
        );
    }
    Ok(())
}

fn cmd_providers() -> Result<(), AppError> {
    for entry in ProviderRegistry::builtin().entries() {
        let indicator = entry.indicator.map_or_else(String::new, String::from);
        println!("{:<8} {}", entry.id, indicator);
    }
    Ok(())
}

fn cmd_new_source(config: &AppConfig, name: &str, provider: &str) -> Result<(), AppError> {
    let catalog = catalog(config);
    let id = catalog.create(name, provider)?;
    println!("Created source {} ({})", id, name);
    println!("Location: {}", catalog.source_dir(&id).display());
    Ok(())
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use policygen::cli::commands::generate::GenerateOptions;
use policygen::types::{CustomizationLevel, PolicyType, TargetAudience};

#[derive(Parser)]
#[command(name = "policygen")]
#[command(
    version,
    about = "AI compliance policy generator with provider fallback and streaming"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the global/project lookup
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, help = "Bind host (default from config)")]
        host: Option<String>,
        #[arg(long, short, help = "Bind port (default from config)")]
        port: Option<u16>,
    },

    /// Generate a policy document
    Generate {
        #[arg(long, short = 'F', help = "Compliance framework id (e.g. GDPR, ISO27001)")]
        framework: String,
        #[arg(long, help = "Organisation name")]
        org: String,
        #[arg(long, help = "Industry sector")]
        industry: String,
        #[arg(long, default_value = "50", help = "Number of employees")]
        employees: u32,
        #[arg(long = "data-type", help = "Data category processed (repeatable)")]
        data_types: Vec<String>,
        #[arg(long, help = "Data is transferred outside the UK")]
        cross_border: bool,
        #[arg(long, default_value = "privacy_policy", help = "Policy type, e.g. privacy_policy, information_security")]
        policy_type: PolicyType,
        #[arg(long, default_value = "standard", help = "Customization level: basic, standard, comprehensive")]
        level: CustomizationLevel,
        #[arg(long, default_value = "all_employees", help = "Target audience")]
        audience: TargetAudience,
        #[arg(long, default_value = "en-GB", help = "Document language (BCP 47 tag)")]
        language: String,
        #[arg(long, help = "Stream the document as it is generated")]
        stream: bool,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// List available compliance frameworks
    Frameworks {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json, yaml")]
        format: String,
    },

    /// Show provider circuit breaker state
    Health {
        #[arg(long, help = "Also probe each provider endpoint")]
        check: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mpolicygen encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    // Logs go to stderr; stdout carries generated documents
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = Runtime::new()?;
            rt.block_on(policygen::cli::commands::serve::run(host, port, config_path))?;
        }
        Commands::Generate {
            framework,
            org,
            industry,
            employees,
            data_types,
            cross_border,
            policy_type,
            level,
            audience,
            language,
            stream,
            format,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(policygen::cli::commands::generate::run(GenerateOptions {
                framework,
                organization: org,
                industry,
                employees,
                data_types,
                cross_border,
                policy_type,
                level,
                audience,
                language,
                stream,
                format,
                config_path: cli.config.clone(),
            }))?;
        }
        Commands::Frameworks { format } => {
            policygen::cli::commands::frameworks::run(&format, config_path)?;
        }
        Commands::Health { check } => {
            let rt = Runtime::new()?;
            rt.block_on(policygen::cli::commands::health::run(check, config_path))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                policygen::cli::commands::config::show(&format)?;
            }
            ConfigAction::Path => {
                policygen::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    policygen::cli::commands::config::init_global(force)?;
                } else {
                    policygen::cli::commands::config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}

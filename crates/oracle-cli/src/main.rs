//! oracle - document signing for specification management
//!
//! Signs specification documents with tamper-evident, time-bounded
//! signatures, anchors the signature artifacts in git, and re-verifies
//! documents against them.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod exit_codes;
mod settings;

use commands::sign::SignArgs;
use commands::status::StatusArgs;
use commands::verify::VerifyArgs;
use exit_codes::codes;
use settings::Settings;

/// oracle - document signing for specification management
#[derive(Parser, Debug)]
#[command(name = "oracle")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Project root that signed documents are relative to
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Path to configuration file (default: <root>/.oracle/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign documents, store the signature, and commit it
    Sign(SignArgs),

    /// Verify a document against its stored signature
    Verify(VerifyArgs),

    /// Show the expiration status of a stored signature
    Status(StatusArgs),
}

impl Commands {
    const fn json(&self) -> bool {
        match self {
            Self::Sign(args) => args.json,
            Self::Verify(args) => args.json,
            Self::Status(args) => args.json,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let settings = match Settings::load(&cli.root, cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            let code = commands::report_error(
                cli.command.json(),
                &format!("{err:#}"),
                codes::VALIDATION_ERROR,
            );
            std::process::exit(i32::from(code));
        },
    };

    // Commands map every outcome to a deterministic exit code.
    let exit_code = match &cli.command {
        Commands::Sign(args) => commands::sign::run_sign(args, &settings),
        Commands::Verify(args) => commands::verify::run_verify(args, &settings),
        Commands::Status(args) => commands::status::run_status(args, &settings),
    };
    std::process::exit(i32::from(exit_code));
}

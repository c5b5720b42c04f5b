//! helmsync CLI - Converge Helm releases toward a declared manifest

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod display;
mod error;
mod exit_codes;

use config::{Overrides, Settings};
use error::Result;

#[derive(Parser)]
#[command(name = "helmsync")]
#[command(author = "helmsync Contributors")]
#[command(version)]
#[command(about = "Converge Helm releases toward a declared manifest", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Helm binary to run
    #[arg(long = "helm-bin", global = true, env = "HELMSYNC_HELM_BIN")]
    helm_bin: Option<String>,

    /// Kube context passed to every helm invocation
    #[arg(long, global = true, env = "HELMSYNC_KUBE_CONTEXT")]
    kube_context: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Converge releases toward the manifest
    Reconcile {
        /// Manifest path (default: ./helmsync.yaml)
        manifest: Option<PathBuf>,

        /// Only reconcile these releases
        #[arg(short, long = "release")]
        releases: Vec<String>,

        /// Dry run: preview every change without applying it
        #[arg(long)]
        check: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the action and command each release would get
    Plan {
        /// Manifest path (default: ./helmsync.yaml)
        manifest: Option<PathBuf>,

        /// Only plan these releases
        #[arg(short, long = "release")]
        releases: Vec<String>,
    },

    /// List the releases of a namespace
    List {
        /// Namespace to query
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        helm_binary: cli.helm_bin,
        kube_context: cli.kube_context,
        check: false,
    };

    match cli.command {
        Commands::Reconcile {
            manifest,
            releases,
            check,
            json,
        } => {
            let overrides = Overrides { check, ..overrides };
            commands::reconcile::run(manifest.as_deref(), &releases, &overrides, json)
        }

        Commands::Plan { manifest, releases } => {
            commands::plan::run(manifest.as_deref(), &releases, &overrides)
        }

        Commands::List { namespace, json } => {
            let options = Settings::default().engine_options(&overrides);
            commands::list::run(&namespace, &options, json)
        }
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

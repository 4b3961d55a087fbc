mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::EXIT_FAILURE;
use macaw_setup_core::install_signal_handler;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "macaw-setup",
    version,
    about = "Installer and service provisioner for the Macaw OpenVoice speech runtime"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Install the runtime, publish the entry point, and register the
    /// service. Safe to re-run: the environment is recreated from scratch.
    Install {
        /// Target directory for the isolated runtime (env: INSTALL_DIR).
        #[arg(long)]
        install_dir: Option<PathBuf>,
        /// Comma-separated capability extras (env: EXTRAS).
        #[arg(long)]
        extras: Option<String>,
        /// Exact package version to pin (env: VERSION).
        #[arg(long)]
        version_pin: Option<String>,
        /// Skip service registration entirely (env: NO_SERVICE).
        #[arg(long, default_value_t = false)]
        no_service: bool,
        /// Host the service binds to.
        #[arg(long)]
        host: Option<String>,
        /// Port the service binds to.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run read-only diagnostic checks on this host.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MACAW_SETUP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Install {
            install_dir,
            extras,
            version_pin,
            no_service,
            host,
            port,
        } => commands::install::run(
            commands::install::Overrides {
                install_dir,
                extras,
                version_pin,
                no_service,
                host,
                port,
            },
            json_output,
        ),
        Commands::Doctor => commands::doctor::run(json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

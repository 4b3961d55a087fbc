//! Provisioning orchestrator for the Macaw OpenVoice speech runtime.
//!
//! Converges a host from nothing installed to a running service through a
//! strictly sequential pipeline: probe the environment, bootstrap the fetch
//! tool, build the isolated runtime, install the package, register the
//! systemd service, detect GPU acceleration, and report. Every step is
//! idempotent; re-running the installer is the recovery mechanism for any
//! fatal abort.

pub mod accel;
pub mod bootstrap;
pub mod config;
pub mod guard;
pub mod host;
pub mod install;
pub mod installer;
pub mod register;
pub mod report;
pub mod signal;

pub use config::InstallConfig;
pub use guard::Deferred;
pub use host::{probe, Arch, HostProfile, KernelClass, OsFamily, Privilege};
pub use installer::{InstallReport, Installer};
pub use register::RegisterOutcome;
pub use signal::{install_signal_handler, shutdown_requested};

use macaw_setup_system::SystemError;
use thiserror::Error;

/// Process exit codes, one per failure class. `SetupError::exit_code` is
/// the only mapping; the CLI re-exports these constants.
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_ENVIRONMENT: u8 = 2;
pub const EXIT_BOOTSTRAP: u8 = 3;
pub const EXIT_INSTALL: u8 = 4;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("unsupported CPU architecture '{0}' (supported: x86_64, aarch64, arm64)")]
    UnsupportedArch(String),
    #[error(
        "WSL 1 detected; only WSL 2 is supported. Convert the distribution with: wsl --set-version <distro> 2"
    )]
    UnsupportedWsl,
    #[error("not running as root and 'sudo' is not available; re-run as root or install sudo")]
    EscalationUnavailable,
    #[error("bootstrap failed: {0}")]
    Bootstrap(SystemError),
    #[error(
        "'uv' is still unavailable after running its installer; install it manually: https://docs.astral.sh/uv/getting-started/installation/"
    )]
    BootstrapUnresolved,
    #[error("package install failed: {0}")]
    Install(SystemError),
    #[error("service registration failed: {0}")]
    Register(SystemError),
    #[error("interrupted; partial state is safe, re-run the installer to finish")]
    Interrupted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SetupError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::UnsupportedArch(_) | Self::UnsupportedWsl | Self::EscalationUnavailable => {
                EXIT_ENVIRONMENT
            }
            Self::Bootstrap(_) | Self::BootstrapUnresolved => EXIT_BOOTSTRAP,
            Self::Install(_) => EXIT_INSTALL,
            Self::Register(_) | Self::Interrupted | Self::Io(_) => EXIT_FAILURE,
        }
    }
}

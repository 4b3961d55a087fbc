//! System capability layer for the Macaw OpenVoice installer.
//!
//! This crate wraps every external tool the provisioning sequence touches
//! behind a trait: `FetchTool` (uv and the virtual environment it manages),
//! `ServiceManager` (systemd units and lifecycle), `Accounts` (service user
//! and group administration), and `AcceleratorProbe` (GPU detection). Each
//! trait has a real process-backed implementation and a shared `MockSystem`
//! fake so the orchestration layer is testable without a live machine.

pub mod accel;
pub mod account;
pub mod fetch;
pub mod mock;
pub mod paths;
pub mod process;
pub mod service;

pub use accel::{detect, AcceleratorProbe, GpuStatus, HostProbe};
pub use account::{Accounts, EtcAccounts};
pub use fetch::{FetchTool, PackageRequest, RuntimeEnv, UvTool};
pub use mock::MockSystem;
pub use paths::{publish_symlink, system_bin_dirs};
pub use process::command_exists;
pub use service::{ManagerState, ServiceManager, ServiceUnit, Systemd};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("system I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("required tool '{0}' not found on PATH")]
    ToolMissing(String),
    #[error("download failed: {0}")]
    Download(String),
    #[error("no writable bin directory among: {0}")]
    NoWritableBinDir(String),
}

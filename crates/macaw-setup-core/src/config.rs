use crate::host::{HostProfile, OsFamily};
use macaw_setup_system::{system_bin_dirs, PackageRequest};
use std::path::PathBuf;

pub const PACKAGE_NAME: &str = "macaw-openvoice";
pub const ENTRY_POINT: &str = "macaw";
pub const PYTHON_VERSION: &str = "3.12";
pub const GPU_EXTRA: &str = "gpu";
pub const SERVICE_NAME: &str = "macaw";
pub const SERVICE_USER: &str = "macaw";

const DEFAULT_EXTRAS: &str = "server,grpc";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SERVICE_HOME: &str = "/var/lib/macaw";

/// Installer configuration, resolved from the environment (and CLI
/// overrides) before any side effect. No step reads process-global state
/// after this is built.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    pub install_dir: PathBuf,
    pub extras: Vec<String>,
    pub version: Option<String>,
    pub skip_service: bool,
    pub host: String,
    pub port: u16,
    pub service_home: PathBuf,
    pub bin_dirs: Vec<PathBuf>,
}

impl InstallConfig {
    pub fn from_env(profile: &HostProfile) -> Self {
        Self::from_lookup(profile, |key| std::env::var(key).ok())
    }

    /// Build the configuration from an explicit variable lookup, keeping
    /// the resolution logic testable without mutating the process
    /// environment.
    pub fn from_lookup(
        profile: &HostProfile,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let install_dir = lookup("INSTALL_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_install_dir(profile));

        let extras = lookup("EXTRAS")
            .unwrap_or_else(|| DEFAULT_EXTRAS.to_owned())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        let version = lookup("VERSION").filter(|v| !v.is_empty());
        let skip_service = lookup("NO_SERVICE").is_some_and(|v| !v.is_empty());

        Self {
            install_dir,
            extras,
            version,
            skip_service,
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            service_home: PathBuf::from(DEFAULT_SERVICE_HOME),
            bin_dirs: system_bin_dirs(),
        }
    }

    pub fn package_request(&self) -> PackageRequest {
        PackageRequest::new(PACKAGE_NAME, self.extras.clone(), self.version.clone())
    }

    /// The acceleration bundle, pinned to the same version as the base
    /// package so the environment stays coherent.
    pub fn gpu_request(&self) -> PackageRequest {
        PackageRequest::new(
            PACKAGE_NAME,
            vec![GPU_EXTRA.to_owned()],
            self.version.clone(),
        )
    }

    pub fn models_dir(&self) -> PathBuf {
        self.service_home.join("models")
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_install_dir(profile: &HostProfile) -> PathBuf {
    match profile.os_family {
        OsFamily::Linux => PathBuf::from("/opt/macaw"),
        OsFamily::Darwin => std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".macaw"))
            .unwrap_or_else(|_| PathBuf::from("/opt/macaw")),
    }
}

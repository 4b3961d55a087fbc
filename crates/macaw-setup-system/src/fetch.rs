use crate::process;
use crate::SystemError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const UV_INSTALLER_URL: &str = "https://astral.sh/uv/install.sh";
pub const UV_INSTALL_DOCS: &str = "https://docs.astral.sh/uv/getting-started/installation/";

/// Bound on the installer download. No automatic retry: a hung or slow
/// mirror should surface as a failure, not block the whole run.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// A package to resolve from the index: base name, optional capability
/// extras, optional exact version pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub name: String,
    pub extras: Vec<String>,
    pub version: Option<String>,
}

impl PackageRequest {
    pub fn new(name: impl Into<String>, extras: Vec<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            extras,
            version,
        }
    }

    /// Render the PEP 508 specifier: `name[extra1,extra2]==version`.
    pub fn specifier(&self) -> String {
        let mut spec = self.name.clone();
        if !self.extras.is_empty() {
            spec.push('[');
            spec.push_str(&self.extras.join(","));
            spec.push(']');
        }
        if let Some(version) = &self.version {
            spec.push_str("==");
            spec.push_str(version);
        }
        spec
    }
}

/// The isolated virtual environment rooted at `<install_dir>/.venv`.
///
/// Disposable by design: every install run recreates it from scratch, so
/// there is no in-place mutation and re-running is always safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnv {
    root: PathBuf,
}

impl RuntimeEnv {
    pub fn new(install_dir: &Path) -> Self {
        Self {
            root: install_dir.join(".venv"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn interpreter(&self) -> PathBuf {
        self.root.join("bin").join("python3")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn entry_point(&self, name: &str) -> PathBuf {
        self.root.join("bin").join(name)
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }
}

/// Package fetching and environment management capability.
pub trait FetchTool {
    fn available(&self) -> bool;

    /// Download and run the tool's official installer, using `scratch` for
    /// downloaded artifacts. After this returns, `available` is re-checked
    /// by the caller; the tool must be reachable without a new session.
    fn bootstrap(&self, scratch: &Path) -> Result<(), SystemError>;

    /// Create the pinned virtual environment, replacing any existing one.
    fn create_env(&self, env: &RuntimeEnv, python_version: &str) -> Result<(), SystemError>;

    /// Install a package into the environment's interpreter.
    fn install(&self, env: &RuntimeEnv, request: &PackageRequest) -> Result<(), SystemError>;
}

/// Production fetch tool backed by `uv`.
///
/// The binary is re-resolved on every call rather than cached: a bootstrap
/// earlier in the run places it under `~/.local/bin` or `~/.cargo/bin`
/// without touching this process's PATH.
pub struct UvTool {
    agent: ureq::Agent,
}

impl Default for UvTool {
    fn default() -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        Self {
            agent: config.new_agent(),
        }
    }
}

impl UvTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_binary() -> Option<PathBuf> {
        if process::command_exists("uv") {
            return Some(PathBuf::from("uv"));
        }
        let home = std::env::var("HOME").ok()?;
        for candidate in [".local/bin/uv", ".cargo/bin/uv"] {
            let path = Path::new(&home).join(candidate);
            if path.is_file() {
                return Some(path);
            }
        }
        None
    }

    fn require_binary() -> Result<PathBuf, SystemError> {
        Self::resolve_binary().ok_or_else(|| SystemError::ToolMissing("uv".to_owned()))
    }
}

impl FetchTool for UvTool {
    fn available(&self) -> bool {
        Self::resolve_binary().is_some()
    }

    fn bootstrap(&self, scratch: &Path) -> Result<(), SystemError> {
        info!("downloading uv installer from {UV_INSTALLER_URL}");
        let response = self
            .agent
            .get(UV_INSTALLER_URL)
            .call()
            .map_err(|e| SystemError::Download(e.to_string()))?;

        let mut reader = response.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| SystemError::Download(e.to_string()))?;

        let script = scratch.join("install-uv.sh");
        std::fs::write(&script, body)?;

        process::run("sh", &[&script.to_string_lossy()])?;
        Ok(())
    }

    fn create_env(&self, env: &RuntimeEnv, python_version: &str) -> Result<(), SystemError> {
        if env.exists() {
            debug!("removing existing environment at {}", env.root().display());
            std::fs::remove_dir_all(env.root())?;
        }
        let uv = Self::require_binary()?;
        process::run(
            &uv.to_string_lossy(),
            &[
                "venv",
                "--python",
                python_version,
                &env.root().to_string_lossy(),
            ],
        )?;
        Ok(())
    }

    fn install(&self, env: &RuntimeEnv, request: &PackageRequest) -> Result<(), SystemError> {
        let uv = Self::require_binary()?;
        let interpreter = env.interpreter();
        process::run(
            &uv.to_string_lossy(),
            &[
                "pip",
                "install",
                "--python",
                &interpreter.to_string_lossy(),
                &request.specifier(),
            ],
        )?;
        Ok(())
    }
}

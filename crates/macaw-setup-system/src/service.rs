use crate::process;
use crate::SystemError;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Global state of the init system, as reported by
/// `systemctl is-system-running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    Running,
    Degraded,
    /// systemctl exists but the manager is not running (containers, WSL
    /// distributions with systemd disabled).
    Offline,
    /// No service manager on this host at all.
    Absent,
}

/// A service unit definition. `render` is deterministic so re-running the
/// installer rewrites an identical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub name: String,
    pub description: String,
    pub exec_start: String,
    pub working_dir: PathBuf,
    pub user: String,
    pub group: String,
    pub environment: Vec<(String, String)>,
    pub restart_sec: u32,
}

impl ServiceUnit {
    pub fn file_name(&self) -> String {
        format!("{}.service", self.name)
    }

    pub fn render(&self) -> String {
        use std::fmt::Write as _;
        let mut out = String::new();
        let _ = writeln!(out, "[Unit]");
        let _ = writeln!(out, "Description={}", self.description);
        let _ = writeln!(out, "After=network-online.target");
        let _ = writeln!(out, "Wants=network-online.target");
        let _ = writeln!(out);
        let _ = writeln!(out, "[Service]");
        let _ = writeln!(out, "Type=simple");
        let _ = writeln!(out, "User={}", self.user);
        let _ = writeln!(out, "Group={}", self.group);
        let _ = writeln!(out, "WorkingDirectory={}", self.working_dir.display());
        let _ = writeln!(out, "ExecStart={}", self.exec_start);
        let _ = writeln!(out, "Restart=always");
        let _ = writeln!(out, "RestartSec={}", self.restart_sec);
        for (key, value) in &self.environment {
            let _ = writeln!(out, "Environment={key}={value}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "[Install]");
        let _ = writeln!(out, "WantedBy=multi-user.target");
        out
    }
}

/// Init-system capability: unit persistence and lifecycle operations.
pub trait ServiceManager {
    fn state(&self) -> ManagerState;

    /// Persist the unit definition, returning the path written.
    fn write_unit(&self, unit: &ServiceUnit) -> Result<PathBuf, SystemError>;

    fn daemon_reload(&self) -> Result<(), SystemError>;

    fn enable(&self, name: &str) -> Result<(), SystemError>;

    fn restart(&self, name: &str) -> Result<(), SystemError>;
}

/// Production service manager backed by systemd.
pub struct Systemd {
    unit_dir: PathBuf,
    use_sudo: bool,
}

impl Systemd {
    pub fn new(use_sudo: bool) -> Self {
        Self {
            unit_dir: PathBuf::from("/etc/systemd/system"),
            use_sudo,
        }
    }

    pub fn with_unit_dir(unit_dir: impl Into<PathBuf>, use_sudo: bool) -> Self {
        Self {
            unit_dir: unit_dir.into(),
            use_sudo,
        }
    }

    /// Write unit content through `sudo tee` when the direct write is denied.
    fn write_elevated(&self, path: &Path, content: &str) -> Result<(), SystemError> {
        let mut child = Command::new("sudo")
            .arg("tee")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(content.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(SystemError::CommandFailed {
                command: format!("sudo tee {}", path.display()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

impl ServiceManager for Systemd {
    fn state(&self) -> ManagerState {
        if !process::command_exists("systemctl") {
            return ManagerState::Absent;
        }
        // Exits non-zero for every state except "running", so inspect the
        // output instead of the status code.
        let output = Command::new("systemctl").arg("is-system-running").output();
        match output {
            Ok(o) => match String::from_utf8_lossy(&o.stdout).trim() {
                "running" => ManagerState::Running,
                "degraded" => ManagerState::Degraded,
                _ => ManagerState::Offline,
            },
            Err(_) => ManagerState::Absent,
        }
    }

    fn write_unit(&self, unit: &ServiceUnit) -> Result<PathBuf, SystemError> {
        let path = self.unit_dir.join(unit.file_name());
        let content = unit.render();
        match std::fs::write(&path, &content) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied && self.use_sudo => {
                debug!("direct unit write denied, escalating via sudo tee");
                self.write_elevated(&path, &content)?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(path)
    }

    fn daemon_reload(&self) -> Result<(), SystemError> {
        process::run_elevated(self.use_sudo, "systemctl", &["daemon-reload"])?;
        Ok(())
    }

    fn enable(&self, name: &str) -> Result<(), SystemError> {
        process::run_elevated(self.use_sudo, "systemctl", &["enable", name])?;
        Ok(())
    }

    fn restart(&self, name: &str) -> Result<(), SystemError> {
        process::run_elevated(self.use_sudo, "systemctl", &["restart", name])?;
        Ok(())
    }
}

use crate::accel::AcceleratorProbe;
use crate::account::Accounts;
use crate::fetch::{FetchTool, PackageRequest, RuntimeEnv};
use crate::service::{ManagerState, ServiceManager, ServiceUnit};
use crate::SystemError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Everything the mock observed, for assertions.
#[derive(Debug, Default)]
pub struct MockState {
    pub bootstrap_dirs: Vec<PathBuf>,
    pub envs_created: Vec<PathBuf>,
    pub installed: Vec<String>,
    pub units: Vec<(PathBuf, String)>,
    pub reloads: u32,
    pub enabled: Vec<String>,
    pub restarted: Vec<String>,
    pub users: Vec<String>,
    pub group_adds: Vec<(String, String)>,
    pub owned_dirs: Vec<(PathBuf, String)>,
}

/// In-memory implementation of every system capability.
///
/// `create_env` materializes a fake venv tree (interpreter and entry point
/// markers) so orchestration tests exercise the real filesystem paths:
/// symlink publishing, idempotent recreation, unit rendering.
pub struct MockSystem {
    pub state: Mutex<MockState>,
    pub tool_available: AtomicBool,
    /// Specifier substrings whose install should fail.
    pub fail_installs: Vec<String>,
    pub manager_state: ManagerState,
    pub existing_groups: Vec<String>,
    pub smi_ok: bool,
    pub pci_match: bool,
    pub passthrough: bool,
    unit_dir: PathBuf,
}

impl MockSystem {
    pub fn new(unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            tool_available: AtomicBool::new(true),
            fail_installs: Vec::new(),
            manager_state: ManagerState::Running,
            existing_groups: vec!["render".to_owned(), "video".to_owned()],
            smi_ok: false,
            pci_match: false,
            passthrough: false,
            unit_dir: unit_dir.into(),
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl FetchTool for MockSystem {
    fn available(&self) -> bool {
        self.tool_available.load(Ordering::SeqCst)
    }

    fn bootstrap(&self, scratch: &Path) -> Result<(), SystemError> {
        self.locked().bootstrap_dirs.push(scratch.to_path_buf());
        self.tool_available.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn create_env(&self, env: &RuntimeEnv, _python_version: &str) -> Result<(), SystemError> {
        if env.exists() {
            std::fs::remove_dir_all(env.root())?;
        }
        std::fs::create_dir_all(env.bin_dir())?;
        std::fs::write(env.interpreter(), "")?;
        std::fs::write(env.entry_point("macaw"), "")?;
        self.locked().envs_created.push(env.root().to_path_buf());
        Ok(())
    }

    fn install(&self, _env: &RuntimeEnv, request: &PackageRequest) -> Result<(), SystemError> {
        let specifier = request.specifier();
        if self.fail_installs.iter().any(|s| specifier.contains(s)) {
            return Err(SystemError::CommandFailed {
                command: format!("mock install {specifier}"),
                stderr: "simulated install failure".to_owned(),
            });
        }
        self.locked().installed.push(specifier);
        Ok(())
    }
}

impl ServiceManager for MockSystem {
    fn state(&self) -> ManagerState {
        self.manager_state
    }

    fn write_unit(&self, unit: &ServiceUnit) -> Result<PathBuf, SystemError> {
        std::fs::create_dir_all(&self.unit_dir)?;
        let path = self.unit_dir.join(unit.file_name());
        let content = unit.render();
        std::fs::write(&path, &content)?;
        self.locked().units.push((path.clone(), content));
        Ok(path)
    }

    fn daemon_reload(&self) -> Result<(), SystemError> {
        self.locked().reloads += 1;
        Ok(())
    }

    fn enable(&self, name: &str) -> Result<(), SystemError> {
        self.locked().enabled.push(name.to_owned());
        Ok(())
    }

    fn restart(&self, name: &str) -> Result<(), SystemError> {
        self.locked().restarted.push(name.to_owned());
        Ok(())
    }
}

impl Accounts for MockSystem {
    fn user_exists(&self, name: &str) -> bool {
        self.locked().users.iter().any(|u| u == name)
    }

    fn group_exists(&self, name: &str) -> bool {
        self.existing_groups.iter().any(|g| g == name)
    }

    fn create_system_user(&self, name: &str, _home: &Path) -> Result<(), SystemError> {
        let mut state = self.locked();
        if state.users.iter().any(|u| u == name) {
            return Err(SystemError::CommandFailed {
                command: format!("mock useradd {name}"),
                stderr: "user already exists".to_owned(),
            });
        }
        state.users.push(name.to_owned());
        Ok(())
    }

    fn add_to_group(&self, user: &str, group: &str) -> Result<(), SystemError> {
        self.locked()
            .group_adds
            .push((user.to_owned(), group.to_owned()));
        Ok(())
    }

    fn ensure_owned_dir(&self, path: &Path, owner: &str) -> Result<(), SystemError> {
        std::fs::create_dir_all(path)?;
        self.locked()
            .owned_dirs
            .push((path.to_path_buf(), owner.to_owned()));
        Ok(())
    }
}

impl AcceleratorProbe for MockSystem {
    fn management_tool_ok(&self) -> bool {
        self.smi_ok
    }

    fn pci_device_present(&self) -> bool {
        self.pci_match
    }

    fn passthrough_tool_present(&self) -> bool {
        self.passthrough
    }
}

use crate::config::{InstallConfig, PYTHON_VERSION};
use crate::host::{invoking_user, HostProfile, Privilege};
use crate::SetupError;
use macaw_setup_system::{process, FetchTool, RuntimeEnv};
use std::path::Path;
use tracing::{debug, info};

/// Make sure the fetch tool is callable, installing it when absent. The
/// tool must be reachable within this run; a bootstrap that completes but
/// leaves the binary unresolvable is fatal with a manual-install pointer.
pub fn ensure_fetch_tool(fetch: &dyn FetchTool, scratch: &Path) -> Result<(), SetupError> {
    if fetch.available() {
        debug!("fetch tool already present");
        return Ok(());
    }
    info!("fetch tool not found, running its installer");
    fetch.bootstrap(scratch).map_err(SetupError::Bootstrap)?;
    if !fetch.available() {
        return Err(SetupError::BootstrapUnresolved);
    }
    Ok(())
}

/// Create the install directory, escalating only when the direct write is
/// denied. When running as root via sudo, ownership is handed back to the
/// invoking user so later steps need no escalation.
pub fn prepare_install_dir(
    config: &InstallConfig,
    profile: &HostProfile,
) -> Result<(), SetupError> {
    match std::fs::create_dir_all(&config.install_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied && profile.use_sudo() => {
            let dir = config.install_dir.to_string_lossy().into_owned();
            process::run_elevated(true, "mkdir", &["-p", &dir]).map_err(SetupError::Bootstrap)?;
            if let Some(user) = invoking_user().filter(|u| u != "root") {
                process::run_elevated(true, "chown", &[&format!("{user}:{user}"), &dir])
                    .map_err(SetupError::Bootstrap)?;
            }
        }
        Err(e) => return Err(SetupError::Io(e)),
    }

    if matches!(profile.privilege, Privilege::Root) {
        if let (Some(uid), Some(gid)) = (sudo_id("SUDO_UID"), sudo_id("SUDO_GID")) {
            debug!("handing install dir ownership back to uid {uid}");
            std::os::unix::fs::chown(&config.install_dir, Some(uid), Some(gid))?;
        }
    }
    Ok(())
}

/// Build the pinned runtime environment, replacing any previous one. No
/// "already exists" error path: recreation is the idempotency mechanism.
pub fn create_runtime_env(
    fetch: &dyn FetchTool,
    config: &InstallConfig,
) -> Result<RuntimeEnv, SetupError> {
    let env = RuntimeEnv::new(&config.install_dir);
    info!(
        "creating python {PYTHON_VERSION} environment at {}",
        env.root().display()
    );
    fetch
        .create_env(&env, PYTHON_VERSION)
        .map_err(SetupError::Bootstrap)?;
    Ok(env)
}

fn sudo_id(var: &str) -> Option<u32> {
    std::env::var(var).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Arch, KernelClass, OsFamily};
    use macaw_setup_system::MockSystem;
    use std::sync::atomic::Ordering;

    fn profile() -> HostProfile {
        HostProfile {
            os_family: OsFamily::Linux,
            arch: Arch::Amd64,
            kernel: KernelClass::Native,
            privilege: Privilege::Root,
        }
    }

    fn config_in(dir: &Path) -> InstallConfig {
        let mut config = InstallConfig::from_lookup(&profile(), |_| None);
        config.install_dir = dir.join("macaw");
        config
    }

    #[test]
    fn available_tool_skips_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockSystem::new(dir.path());
        ensure_fetch_tool(&mock, dir.path()).unwrap();
        assert!(mock.state.lock().unwrap().bootstrap_dirs.is_empty());
    }

    #[test]
    fn missing_tool_triggers_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockSystem::new(dir.path());
        mock.tool_available.store(false, Ordering::SeqCst);
        ensure_fetch_tool(&mock, dir.path()).unwrap();
        assert_eq!(mock.state.lock().unwrap().bootstrap_dirs.len(), 1);
    }

    #[test]
    fn prepare_install_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        prepare_install_dir(&config, &profile()).unwrap();
        assert!(config.install_dir.is_dir());
    }

    #[test]
    fn runtime_env_recreation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockSystem::new(dir.path());
        let config = config_in(dir.path());
        prepare_install_dir(&config, &profile()).unwrap();

        let env = create_runtime_env(&mock, &config).unwrap();
        std::fs::write(env.root().join("leftover"), "").unwrap();
        let env = create_runtime_env(&mock, &config).unwrap();
        assert!(!env.root().join("leftover").exists());
        assert!(env.interpreter().is_file());
    }
}

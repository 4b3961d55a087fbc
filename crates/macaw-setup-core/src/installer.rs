use crate::config::{InstallConfig, SERVICE_NAME};
use crate::guard::Deferred;
use crate::host::HostProfile;
use crate::register::RegisterOutcome;
use crate::{accel, bootstrap, install, register, SetupError};
use macaw_setup_system::{AcceleratorProbe, Accounts, FetchTool, GpuStatus, ServiceManager};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

/// Capability handles for one provisioning run. Production wires the
/// process-backed implementations; tests wire `MockSystem` for all four.
pub struct Installer<'a> {
    pub fetch: &'a dyn FetchTool,
    pub service: &'a dyn ServiceManager,
    pub accounts: &'a dyn Accounts,
    pub gpu: &'a dyn AcceleratorProbe,
    /// Polled between steps; production passes `shutdown_requested`.
    pub cancel: fn() -> bool,
}

/// End state of a successful run, for the session report.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub specifier: String,
    pub bin_path: PathBuf,
    pub endpoint: String,
    pub service: RegisterOutcome,
    pub gpu: GpuStatus,
}

impl Installer<'_> {
    /// Run the full sequence: bootstrap, environment, package, entry
    /// point, service, accelerator. Strictly sequential; any fatal error
    /// aborts the run and re-invocation is the recovery path.
    pub fn run(
        &self,
        profile: &HostProfile,
        config: &InstallConfig,
    ) -> Result<InstallReport, SetupError> {
        // Removed on every exit path, including fatal aborts.
        let scratch = tempfile::tempdir()?;

        bootstrap::ensure_fetch_tool(self.fetch, scratch.path())?;
        self.checkpoint()?;
        bootstrap::prepare_install_dir(config, profile)?;
        let env = bootstrap::create_runtime_env(self.fetch, config)?;
        self.checkpoint()?;

        let request = config.package_request();
        install::install_package(self.fetch, &env, &request)?;
        let bin_path = install::publish_entry_point(&env, config, profile)?;
        self.checkpoint()?;

        let outcome = register::register(self.service, self.accounts, &env, config, profile)?;

        // Start the service when this scope unwinds, so a GPU-step hiccup
        // still leaves it running.
        let _restart = outcome.wants_restart().then(|| {
            Deferred::new(|| {
                if let Err(e) = self.service.restart(SERVICE_NAME) {
                    warn!(
                        "could not start {SERVICE_NAME}.service: {e}; start it with: sudo systemctl restart {SERVICE_NAME}"
                    );
                }
            })
        });

        let gpu = accel::configure_accelerator(self.fetch, self.gpu, &env, profile, config);

        Ok(InstallReport {
            specifier: request.specifier(),
            bin_path,
            endpoint: config.endpoint(),
            service: outcome,
            gpu,
        })
    }

    /// Abort between steps once an interrupt has been requested. The step
    /// in flight finishes first, and scoped cleanup runs on the way out.
    fn checkpoint(&self) -> Result<(), SetupError> {
        if (self.cancel)() {
            return Err(SetupError::Interrupted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Arch, KernelClass, OsFamily, Privilege};
    use macaw_setup_system::{MockSystem, RuntimeEnv};
    use std::path::Path;
    use std::sync::atomic::Ordering;

    fn profile() -> HostProfile {
        HostProfile {
            os_family: OsFamily::Linux,
            arch: Arch::Amd64,
            kernel: KernelClass::Native,
            privilege: Privilege::Root,
        }
    }

    fn config_in(root: &Path) -> InstallConfig {
        let mut config = InstallConfig::from_lookup(&profile(), |key| match key {
            "EXTRAS" => Some("server,grpc".to_owned()),
            _ => None,
        });
        config.install_dir = root.join("opt");
        config.service_home = root.join("home");
        config.bin_dirs = vec![root.join("bin")];
        config
    }

    fn run_once(mock: &MockSystem, config: &InstallConfig) -> Result<InstallReport, SetupError> {
        let installer = Installer {
            fetch: mock,
            service: mock,
            accounts: mock,
            gpu: mock,
            cancel: || false,
        };
        installer.run(&profile(), config)
    }

    #[test]
    fn full_run_converges_to_running_service() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockSystem::new(dir.path().join("units"));
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.bin_dirs[0]).unwrap();

        let report = run_once(&mock, &config).unwrap();
        assert_eq!(report.specifier, "macaw-openvoice[server,grpc]");
        assert_eq!(report.endpoint, "http://127.0.0.1:8000");
        assert_eq!(report.service, RegisterOutcome::Enabled);
        assert_eq!(report.gpu, GpuStatus::Absent);

        let env = RuntimeEnv::new(&config.install_dir);
        assert_eq!(
            std::fs::read_link(&report.bin_path).unwrap(),
            env.entry_point("macaw")
        );

        let state = mock.state.lock().unwrap();
        assert_eq!(state.installed, vec!["macaw-openvoice[server,grpc]"]);
        // Deferred restart fired when the run scope closed.
        assert_eq!(state.restarted, vec!["macaw"]);
    }

    #[test]
    fn rerunning_reaches_the_same_end_state() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockSystem::new(dir.path().join("units"));
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.bin_dirs[0]).unwrap();

        let first = run_once(&mock, &config).unwrap();
        let second = run_once(&mock, &config).unwrap();

        assert_eq!(first.bin_path, second.bin_path);
        assert_eq!(
            std::fs::read_link(&first.bin_path).unwrap(),
            std::fs::read_link(&second.bin_path).unwrap()
        );

        let state = mock.state.lock().unwrap();
        assert_eq!(state.users, vec!["macaw"], "no duplicate service account");
        assert_eq!(state.units[0].1, state.units[1].1, "unit content stable");
        assert_eq!(state.envs_created.len(), 2, "environment recreated");
    }

    #[test]
    fn scratch_dir_removed_on_success_and_on_fatal_abort() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockSystem::new(dir.path().join("units"));
        mock.tool_available.store(false, Ordering::SeqCst);
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.bin_dirs[0]).unwrap();

        run_once(&mock, &config).unwrap();
        let scratch = mock.state.lock().unwrap().bootstrap_dirs[0].clone();
        assert!(!scratch.exists(), "scratch leaked after success");

        let mut failing = MockSystem::new(dir.path().join("units"));
        failing.fail_installs = vec!["macaw-openvoice".to_owned()];
        failing.tool_available.store(false, Ordering::SeqCst);
        let err = run_once(&failing, &config).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        let scratch = failing.state.lock().unwrap().bootstrap_dirs[0].clone();
        assert!(!scratch.exists(), "scratch leaked after fatal abort");
    }

    #[test]
    fn opt_out_skips_service_and_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockSystem::new(dir.path().join("units"));
        let mut config = config_in(dir.path());
        config.skip_service = true;
        std::fs::create_dir_all(&config.bin_dirs[0]).unwrap();

        let report = run_once(&mock, &config).unwrap();
        assert_eq!(report.service, RegisterOutcome::SkippedOptOut);

        let state = mock.state.lock().unwrap();
        assert!(state.units.is_empty());
        assert!(state.restarted.is_empty());
        assert!(!config.service_home.exists());
    }

    #[test]
    fn interrupt_stops_the_sequence_between_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockSystem::new(dir.path().join("units"));
        mock.tool_available.store(false, Ordering::SeqCst);
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.bin_dirs[0]).unwrap();

        let installer = Installer {
            fetch: &mock,
            service: &mock,
            accounts: &mock,
            gpu: &mock,
            cancel: || true,
        };
        let err = installer.run(&profile(), &config).unwrap_err();
        assert!(matches!(err, SetupError::Interrupted));
        assert_eq!(err.exit_code(), 1);

        let state = mock.state.lock().unwrap();
        // The bootstrap step in flight finished; nothing after it ran.
        assert_eq!(state.bootstrap_dirs.len(), 1);
        assert!(state.envs_created.is_empty());
        assert!(state.installed.is_empty());
        assert!(state.units.is_empty());
        assert!(state.restarted.is_empty());
        assert!(
            !state.bootstrap_dirs[0].exists(),
            "scratch leaked on interrupt"
        );
    }

    #[test]
    fn gpu_failure_does_not_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSystem::new(dir.path().join("units"));
        mock.smi_ok = true;
        mock.fail_installs = vec!["[gpu]".to_owned()];
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.bin_dirs[0]).unwrap();

        let report = run_once(&mock, &config).unwrap();
        assert_eq!(report.gpu, GpuStatus::PresentAndUsable);
        // Base install landed even though the extra failed, and the
        // deferred restart still ran.
        let state = mock.state.lock().unwrap();
        assert_eq!(state.installed, vec!["macaw-openvoice[server,grpc]"]);
        assert_eq!(state.restarted, vec!["macaw"]);
    }
}

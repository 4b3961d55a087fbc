use crate::config::InstallConfig;
use crate::host::HostProfile;
use macaw_setup_system::{detect, AcceleratorProbe, FetchTool, GpuStatus, RuntimeEnv};
use tracing::{info, warn};

/// Probe for a GPU and configure acceleration when one is usable.
///
/// Runs after service registration on purpose: the unit must exist even if
/// GPU setup fails. Nothing here is fatal; the base install has already
/// succeeded, so every failure degrades to a warning with the exact
/// follow-up command.
pub fn configure_accelerator(
    fetch: &dyn FetchTool,
    probe: &dyn AcceleratorProbe,
    env: &RuntimeEnv,
    profile: &HostProfile,
    config: &InstallConfig,
) -> GpuStatus {
    let status = detect(probe, profile.is_virtualized_linux());
    match status {
        GpuStatus::PresentAndUsable => {
            let request = config.gpu_request();
            info!("GPU detected, installing {}", request.specifier());
            if let Err(e) = fetch.install(env, &request) {
                warn!("GPU support install failed: {e}");
                warn!(
                    "install it later with: uv pip install --python {} '{}'",
                    env.interpreter().display(),
                    request.specifier()
                );
            }
        }
        GpuStatus::PresentButDriverMissing => {
            warn!(
                "NVIDIA device found but the driver is not working; install the driver, verify with nvidia-smi, then run: uv pip install --python {} '{}'",
                env.interpreter().display(),
                config.gpu_request().specifier()
            );
        }
        GpuStatus::Absent => {
            info!("no GPU detected, running in CPU mode");
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Arch, KernelClass, OsFamily, Privilege};
    use macaw_setup_system::MockSystem;

    fn profile(kernel: KernelClass) -> HostProfile {
        HostProfile {
            os_family: OsFamily::Linux,
            arch: Arch::Amd64,
            kernel,
            privilege: Privilege::Root,
        }
    }

    fn config() -> InstallConfig {
        InstallConfig::from_lookup(&profile(KernelClass::Native), |_| None)
    }

    #[test]
    fn usable_gpu_installs_acceleration_extra() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSystem::new(dir.path());
        mock.smi_ok = true;
        let env = RuntimeEnv::new(dir.path());

        let status =
            configure_accelerator(&mock, &mock, &env, &profile(KernelClass::Native), &config());
        assert_eq!(status, GpuStatus::PresentAndUsable);
        assert_eq!(
            mock.state.lock().unwrap().installed,
            vec!["macaw-openvoice[gpu]".to_owned()]
        );
    }

    #[test]
    fn extra_install_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSystem::new(dir.path());
        mock.smi_ok = true;
        mock.fail_installs = vec!["[gpu]".to_owned()];
        let env = RuntimeEnv::new(dir.path());

        let status =
            configure_accelerator(&mock, &mock, &env, &profile(KernelClass::Native), &config());
        assert_eq!(status, GpuStatus::PresentAndUsable);
        assert!(mock.state.lock().unwrap().installed.is_empty());
    }

    #[test]
    fn driver_missing_installs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSystem::new(dir.path());
        mock.pci_match = true;
        let env = RuntimeEnv::new(dir.path());

        let status =
            configure_accelerator(&mock, &mock, &env, &profile(KernelClass::Native), &config());
        assert_eq!(status, GpuStatus::PresentButDriverMissing);
        assert!(mock.state.lock().unwrap().installed.is_empty());
    }

    #[test]
    fn wsl_passthrough_requires_gen2_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockSystem::new(dir.path());
        mock.passthrough = true;
        let env = RuntimeEnv::new(dir.path());

        let native =
            configure_accelerator(&mock, &mock, &env, &profile(KernelClass::Native), &config());
        assert_eq!(native, GpuStatus::Absent);

        let wsl =
            configure_accelerator(&mock, &mock, &env, &profile(KernelClass::WslGen2), &config());
        assert_eq!(wsl, GpuStatus::PresentAndUsable);
    }
}

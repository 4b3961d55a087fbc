use crate::config::{InstallConfig, ENTRY_POINT};
use crate::host::HostProfile;
use crate::SetupError;
use macaw_setup_system::{publish_symlink, FetchTool, PackageRequest, RuntimeEnv};
use std::path::PathBuf;
use tracing::info;

/// Install the application package into the runtime environment. Fatal on
/// failure: the environment is disposable, so no partial-state recovery is
/// attempted and re-running is the fix.
pub fn install_package(
    fetch: &dyn FetchTool,
    env: &RuntimeEnv,
    request: &PackageRequest,
) -> Result<(), SetupError> {
    info!("installing {}", request.specifier());
    fetch.install(env, request).map_err(SetupError::Install)
}

/// Expose the installed entry point on the system path.
pub fn publish_entry_point(
    env: &RuntimeEnv,
    config: &InstallConfig,
    profile: &HostProfile,
) -> Result<PathBuf, SetupError> {
    let target = env.entry_point(ENTRY_POINT);
    publish_symlink(&target, ENTRY_POINT, &config.bin_dirs, profile.use_sudo())
        .map_err(SetupError::Install)
}

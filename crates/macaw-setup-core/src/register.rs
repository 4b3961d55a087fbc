use crate::config::{InstallConfig, ENTRY_POINT, SERVICE_NAME, SERVICE_USER};
use crate::host::{invoking_user, HostProfile, KernelClass};
use crate::SetupError;
use macaw_setup_system::{
    Accounts, ManagerState, RuntimeEnv, ServiceManager, ServiceUnit,
};
use serde::Serialize;
use tracing::{debug, info, warn};

const HARDWARE_GROUPS: [&str; 2] = ["render", "video"];
const RESTART_SEC: u32 = 3;

/// What the registrar did, for the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// Operator opted out via `NO_SERVICE`.
    SkippedOptOut,
    /// No service manager on this host.
    SkippedNoServiceManager,
    /// Unit and account exist, but the manager is not running so the unit
    /// was neither enabled nor started.
    WrittenNotEnabled,
    /// Unit written, enabled for boot, restart deferred to sequence exit.
    Enabled,
}

impl RegisterOutcome {
    pub fn wants_restart(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Build the service unit. Pure, so re-runs rewrite identical content.
pub fn build_unit(env: &RuntimeEnv, config: &InstallConfig) -> ServiceUnit {
    ServiceUnit {
        name: SERVICE_NAME.to_owned(),
        description: "Macaw OpenVoice speech service".to_owned(),
        exec_start: format!(
            "{} serve --host {} --port {}",
            env.entry_point(ENTRY_POINT).display(),
            config.host,
            config.port
        ),
        working_dir: config.service_home.clone(),
        user: SERVICE_USER.to_owned(),
        group: SERVICE_USER.to_owned(),
        environment: vec![
            (
                "PATH".to_owned(),
                format!("{}:/usr/local/bin:/usr/bin:/bin", env.bin_dir().display()),
            ),
            (
                "MACAW_MODELS_DIR".to_owned(),
                config.models_dir().display().to_string(),
            ),
        ],
        restart_sec: RESTART_SEC,
    }
}

/// Register the background service: dedicated account, hardware groups,
/// service home, unit file, enablement. Skips entirely on operator opt-out
/// or when no service manager exists; downgrades to a warning when the
/// manager is present but not running.
pub fn register(
    service: &dyn ServiceManager,
    accounts: &dyn Accounts,
    env: &RuntimeEnv,
    config: &InstallConfig,
    profile: &HostProfile,
) -> Result<RegisterOutcome, SetupError> {
    if config.skip_service {
        info!("service registration skipped (NO_SERVICE set)");
        return Ok(RegisterOutcome::SkippedOptOut);
    }

    let state = service.state();
    if state == ManagerState::Absent {
        warn!(
            "no service manager found; start the server manually with: {} serve --host {} --port {}",
            env.entry_point(ENTRY_POINT).display(),
            config.host,
            config.port
        );
        return Ok(RegisterOutcome::SkippedNoServiceManager);
    }

    if accounts.user_exists(SERVICE_USER) {
        debug!("service account '{SERVICE_USER}' already exists");
    } else {
        info!("creating service account '{SERVICE_USER}'");
        accounts
            .create_system_user(SERVICE_USER, &config.service_home)
            .map_err(SetupError::Register)?;
    }

    // Hardware access for accelerated inference; a host without these
    // groups is not an error.
    for group in HARDWARE_GROUPS {
        if accounts.group_exists(group) {
            accounts
                .add_to_group(SERVICE_USER, group)
                .map_err(SetupError::Register)?;
        } else {
            debug!("group '{group}' not present, skipping");
        }
    }

    // Let the invoking user reach the service's files without escalation.
    if let Some(user) = invoking_user() {
        if user != "root" {
            accounts
                .add_to_group(&user, SERVICE_USER)
                .map_err(SetupError::Register)?;
        }
    }

    accounts
        .ensure_owned_dir(&config.service_home, SERVICE_USER)
        .map_err(SetupError::Register)?;
    accounts
        .ensure_owned_dir(&config.models_dir(), SERVICE_USER)
        .map_err(SetupError::Register)?;

    let unit = build_unit(env, config);
    let path = service.write_unit(&unit).map_err(SetupError::Register)?;
    info!("wrote service unit {}", path.display());

    match state {
        ManagerState::Running | ManagerState::Degraded => {
            service.daemon_reload().map_err(SetupError::Register)?;
            service.enable(SERVICE_NAME).map_err(SetupError::Register)?;
            Ok(RegisterOutcome::Enabled)
        }
        ManagerState::Offline => {
            if profile.kernel == KernelClass::WslGen2 {
                warn!(
                    "systemd is not running; enable it in /etc/wsl.conf ([boot] systemd=true), restart the distribution, then run: sudo systemctl enable --now {SERVICE_NAME}"
                );
            } else {
                warn!(
                    "systemd is not running (container?); start the service later with: sudo systemctl enable --now {SERVICE_NAME}"
                );
            }
            Ok(RegisterOutcome::WrittenNotEnabled)
        }
        ManagerState::Absent => unreachable!("handled above"),
    }
}

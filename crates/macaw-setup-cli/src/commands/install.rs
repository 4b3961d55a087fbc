use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use macaw_setup_core::{probe, report, shutdown_requested, InstallConfig, Installer};
use macaw_setup_system::{EtcAccounts, HostProbe, Systemd, UvTool};
use std::path::PathBuf;

/// CLI flag overrides; anything unset falls back to the environment
/// variables and their defaults.
pub struct Overrides {
    pub install_dir: Option<PathBuf>,
    pub extras: Option<String>,
    pub version_pin: Option<String>,
    pub no_service: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
}

pub fn run(overrides: Overrides, json: bool) -> Result<u8, String> {
    let profile = match probe() {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    };

    let mut config = InstallConfig::from_env(&profile);
    if let Some(dir) = overrides.install_dir {
        config.install_dir = dir;
    }
    if let Some(extras) = overrides.extras {
        config.extras = extras
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
    }
    if let Some(version) = overrides.version_pin {
        config.version = Some(version);
    }
    if overrides.no_service {
        config.skip_service = true;
    }
    if let Some(host) = overrides.host {
        config.host = host;
    }
    if let Some(port) = overrides.port {
        config.port = port;
    }

    let use_sudo = profile.use_sudo();
    let fetch = UvTool::new();
    let service = Systemd::new(use_sudo);
    let accounts = EtcAccounts::new(use_sudo);
    let gpu = HostProbe;
    let installer = Installer {
        fetch: &fetch,
        service: &service,
        accounts: &accounts,
        gpu: &gpu,
        cancel: shutdown_requested,
    };

    let pb = if json {
        None
    } else {
        Some(spinner(&format!(
            "installing {}...",
            config.package_request().specifier()
        )))
    };

    match installer.run(&profile, &config) {
        Ok(install_report) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "install complete");
            }
            if json {
                println!("{}", json_pretty(&install_report)?);
            } else {
                report::print_summary(&install_report, &config);
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "install failed");
            }
            eprintln!("error: {e}");
            Ok(e.exit_code())
        }
    }
}

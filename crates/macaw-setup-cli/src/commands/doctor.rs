use super::{EXIT_FAILURE, EXIT_SUCCESS};
use macaw_setup_core::host;
use macaw_setup_system::{
    command_exists, detect, FetchTool, GpuStatus, HostProbe, ManagerState, ServiceManager,
    Systemd, UvTool,
};

/// Read-only host diagnostics: no filesystem writes, no accounts, no units.
pub fn run(json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_architecture(&mut checks, &mut all_pass);
    let wsl2 = check_kernel(&mut checks, &mut all_pass);
    check_privilege(&mut checks, &mut all_pass);
    check_fetch_tool(&mut checks);
    check_service_manager(&mut checks, wsl2);
    check_accelerator(&mut checks, wsl2);

    print_results(&checks, all_pass, json_output)
}

fn check_architecture(checks: &mut Vec<Check>, all_pass: &mut bool) {
    match host::normalize_arch(std::env::consts::ARCH) {
        Ok(arch) => checks.push(Check::pass(
            "architecture",
            &format!("Architecture {arch} is supported"),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("architecture", &e.to_string()));
        }
    }
}

fn check_kernel(checks: &mut Vec<Check>, all_pass: &mut bool) -> bool {
    if cfg!(target_os = "macos") {
        checks.push(Check::pass("kernel", "Native Darwin kernel"));
        return false;
    }
    match host::kernel_release() {
        Ok(release) => match host::classify_kernel(&release) {
            Ok(host::KernelClass::Native) => {
                checks.push(Check::pass("kernel", &format!("Native kernel ({release})")));
                false
            }
            Ok(host::KernelClass::WslGen2) => {
                checks.push(Check::pass("kernel", &format!("WSL 2 kernel ({release})")));
                true
            }
            Err(e) => {
                *all_pass = false;
                checks.push(Check::fail("kernel", &e.to_string()));
                false
            }
        },
        Err(e) => {
            checks.push(Check::warn("kernel", &format!("Cannot read kernel release: {e}")));
            false
        }
    }
}

fn check_privilege(checks: &mut Vec<Check>, all_pass: &mut bool) {
    if host::effective_uid() == 0 {
        checks.push(Check::pass("privilege", "Running as root"));
    } else if command_exists("sudo") {
        checks.push(Check::pass(
            "privilege",
            "Running unprivileged with sudo available",
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "privilege",
            "Not root and sudo is unavailable; installation would fail",
        ));
    }
}

fn check_fetch_tool(checks: &mut Vec<Check>) {
    if UvTool::new().available() {
        checks.push(Check::pass("fetch_tool", "uv is installed"));
    } else {
        checks.push(Check::info(
            "fetch_tool",
            "uv not found (will be installed on first run)",
        ));
    }
}

fn check_service_manager(checks: &mut Vec<Check>, wsl2: bool) {
    match Systemd::new(false).state() {
        ManagerState::Running => {
            checks.push(Check::pass("service_manager", "systemd is running"));
        }
        ManagerState::Degraded => checks.push(Check::warn(
            "service_manager",
            "systemd is degraded (some units failed); service registration still works",
        )),
        ManagerState::Offline => {
            let hint = if wsl2 {
                "systemd present but not running; enable it in /etc/wsl.conf ([boot] systemd=true)"
            } else {
                "systemd present but not running; the service cannot be started here"
            };
            checks.push(Check::warn("service_manager", hint));
        }
        ManagerState::Absent => checks.push(Check::info(
            "service_manager",
            "No systemd; install would skip service registration",
        )),
    }
}

fn check_accelerator(checks: &mut Vec<Check>, wsl2: bool) {
    match detect(&HostProbe, wsl2) {
        GpuStatus::PresentAndUsable => {
            checks.push(Check::pass("accelerator", "NVIDIA GPU usable"));
        }
        GpuStatus::PresentButDriverMissing => checks.push(Check::warn(
            "accelerator",
            "NVIDIA device on the PCI bus but the driver is not working",
        )),
        GpuStatus::Absent => {
            checks.push(Check::info("accelerator", "No GPU detected (CPU mode)"));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Macaw Setup Doctor\n");
        for check in checks {
            let icon = match check.status.as_str() {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("This host can run the installer.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: String,
    status: String,
    message: String,
}

impl Check {
    fn pass(name: &str, message: &str) -> Self {
        Self::with_status(name, "pass", message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::with_status(name, "fail", message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::with_status(name, "warn", message)
    }

    fn info(name: &str, message: &str) -> Self {
        Self::with_status(name, "info", message)
    }

    fn with_status(name: &str, status: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: status.to_owned(),
            message: message.to_owned(),
        }
    }
}

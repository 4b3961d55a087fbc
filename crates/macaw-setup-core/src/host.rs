use crate::SetupError;
use macaw_setup_system::command_exists;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    Linux,
    Darwin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Amd64,
    Arm64,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amd64 => write!(f, "amd64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Kernel variant. WSL generation 1 is rejected during probing and is
/// deliberately not representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelClass {
    Native,
    WslGen2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Root,
    /// Not root, but `sudo` is available for the steps that need it.
    Unprivileged,
}

/// Immutable snapshot of the host, computed once before any side effect
/// and threaded through every step as a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostProfile {
    pub os_family: OsFamily,
    pub arch: Arch,
    pub kernel: KernelClass,
    pub privilege: Privilege,
}

impl HostProfile {
    pub fn is_virtualized_linux(&self) -> bool {
        matches!(self.kernel, KernelClass::WslGen2)
    }

    pub fn use_sudo(&self) -> bool {
        matches!(self.privilege, Privilege::Unprivileged)
    }
}

/// Normalize a machine architecture string, failing on anything outside
/// the supported set before any filesystem mutation happens.
pub fn normalize_arch(raw: &str) -> Result<Arch, SetupError> {
    match raw {
        "x86_64" => Ok(Arch::Amd64),
        "aarch64" | "arm64" => Ok(Arch::Arm64),
        other => Err(SetupError::UnsupportedArch(other.to_owned())),
    }
}

/// Classify a kernel release string. The Microsoft marker plus a WSL2
/// suffix means supported generation-2 virtualization; the marker alone is
/// generation 1 and rejected outright.
pub fn classify_kernel(release: &str) -> Result<KernelClass, SetupError> {
    let lower = release.to_lowercase();
    if lower.contains("microsoft") {
        if lower.contains("wsl2") {
            Ok(KernelClass::WslGen2)
        } else {
            Err(SetupError::UnsupportedWsl)
        }
    } else {
        Ok(KernelClass::Native)
    }
}

/// Read the running kernel's release string.
pub fn kernel_release() -> std::io::Result<String> {
    std::fs::read_to_string("/proc/sys/kernel/osrelease").map(|s| s.trim().to_owned())
}

/// The human who launched the installer, if identifiable. Prefers the
/// pre-escalation identity over the current one.
pub fn invoking_user() -> Option<String> {
    resolve_invoking_user(|key| std::env::var(key).ok())
}

fn resolve_invoking_user(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    lookup("SUDO_USER")
        .or_else(|| lookup("USER"))
        .filter(|u| !u.is_empty())
}

pub fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail.
    #[allow(unsafe_code, clippy::undocumented_unsafe_blocks)]
    unsafe {
        libc::geteuid()
    }
}

/// Probe the host once. Fails fatally on unsupported architecture,
/// unsupported WSL generation, or missing escalation capability.
pub fn probe() -> Result<HostProfile, SetupError> {
    let os_family = if cfg!(target_os = "macos") {
        OsFamily::Darwin
    } else {
        OsFamily::Linux
    };

    let arch = normalize_arch(std::env::consts::ARCH)?;

    let kernel = match os_family {
        OsFamily::Darwin => KernelClass::Native,
        OsFamily::Linux => classify_kernel(&kernel_release()?)?,
    };

    let privilege = if effective_uid() == 0 {
        Privilege::Root
    } else if command_exists("sudo") {
        Privilege::Unprivileged
    } else {
        return Err(SetupError::EscalationUnavailable);
    };

    Ok(HostProfile {
        os_family,
        arch,
        kernel,
        privilege,
    })
}

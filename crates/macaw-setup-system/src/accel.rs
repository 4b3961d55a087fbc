use crate::process;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Path the WSL compatibility layer mounts the vendor management tool at
/// when GPU passthrough is configured on the Windows side.
const WSL_PASSTHROUGH_TOOL: &str = "/usr/lib/wsl/lib/nvidia-smi";

/// NVIDIA PCI vendor id, as printed by `lspci -n`.
const NVIDIA_VENDOR_ID: &str = "10de:";

/// Outcome of accelerator detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuStatus {
    /// Driver stack works; the acceleration extra can be installed.
    PresentAndUsable,
    /// A device is visible on the bus but the driver is missing or broken.
    PresentButDriverMissing,
    Absent,
}

/// Independent GPU detection signals, ordered by reliability by `detect`.
pub trait AcceleratorProbe {
    /// The vendor management tool exists and exits zero.
    fn management_tool_ok(&self) -> bool;

    /// The PCI bus lists a device from the vendor.
    fn pci_device_present(&self) -> bool;

    /// The WSL passthrough copy of the management tool is mounted.
    fn passthrough_tool_present(&self) -> bool;
}

/// Run the detection strategies in order and stop at the first non-absent
/// result. A present-but-failing management tool falls through to the next
/// strategy instead of erroring.
pub fn detect(probe: &dyn AcceleratorProbe, gen2_virtualized: bool) -> GpuStatus {
    let strategies: [(&str, &dyn Fn() -> GpuStatus); 3] = [
        ("management tool", &|| {
            if probe.management_tool_ok() {
                GpuStatus::PresentAndUsable
            } else {
                GpuStatus::Absent
            }
        }),
        ("pci scan", &|| {
            if probe.pci_device_present() {
                GpuStatus::PresentButDriverMissing
            } else {
                GpuStatus::Absent
            }
        }),
        ("wsl passthrough", &|| {
            if gen2_virtualized && probe.passthrough_tool_present() {
                GpuStatus::PresentAndUsable
            } else {
                GpuStatus::Absent
            }
        }),
    ];

    for (name, strategy) in strategies {
        let status = strategy();
        if status != GpuStatus::Absent {
            debug!("accelerator detected via {name}: {status:?}");
            return status;
        }
    }
    GpuStatus::Absent
}

/// Production probe shelling out to the host's diagnostic tools.
pub struct HostProbe;

impl AcceleratorProbe for HostProbe {
    fn management_tool_ok(&self) -> bool {
        process::run_status("nvidia-smi", &[])
    }

    fn pci_device_present(&self) -> bool {
        process::run("lspci", &["-n"])
            .map(|out| out.to_lowercase().contains(NVIDIA_VENDOR_ID))
            .unwrap_or(false)
    }

    fn passthrough_tool_present(&self) -> bool {
        Path::new(WSL_PASSTHROUGH_TOOL).is_file()
    }
}

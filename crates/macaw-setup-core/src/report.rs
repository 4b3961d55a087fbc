use crate::config::{InstallConfig, SERVICE_NAME};
use crate::installer::InstallReport;
use crate::register::RegisterOutcome;
use console::Style;
use macaw_setup_system::GpuStatus;

/// Print the post-install summary and quick-start commands. Pure output:
/// this step never fails and never exits non-zero.
pub fn print_summary(report: &InstallReport, config: &InstallConfig) {
    let ok = Style::new().green().bold();
    let dim = Style::new().dim();

    println!();
    println!("{}", ok.apply_to("Macaw OpenVoice installed"));
    println!();
    println!("  package:  {}", report.specifier);
    println!("  binary:   {}", report.bin_path.display());
    println!("  api:      {}", report.endpoint);
    println!("  gpu:      {}", gpu_line(report.gpu));
    println!("  service:  {}", service_line(report.service));
    println!();
    println!("Get started:");
    println!("  macaw pull whisper-base");
    println!("  macaw transcribe recording.wav");
    println!("  curl {}/health", report.endpoint);
    println!();
    println!(
        "{}",
        dim.apply_to(format!(
            "Re-run this installer any time; it recreates {} from scratch.",
            config.install_dir.join(".venv").display()
        ))
    );
}

fn gpu_line(status: GpuStatus) -> &'static str {
    match status {
        GpuStatus::PresentAndUsable => "NVIDIA GPU, acceleration enabled",
        GpuStatus::PresentButDriverMissing => "NVIDIA device found, driver missing (CPU mode)",
        GpuStatus::Absent => "none detected (CPU mode)",
    }
}

fn service_line(outcome: RegisterOutcome) -> String {
    match outcome {
        RegisterOutcome::Enabled => {
            format!("{SERVICE_NAME}.service enabled and starting")
        }
        RegisterOutcome::WrittenNotEnabled => {
            format!("{SERVICE_NAME}.service written; enable it once systemd is running")
        }
        RegisterOutcome::SkippedNoServiceManager => {
            "not registered (no service manager); run 'macaw serve' manually".to_owned()
        }
        RegisterOutcome::SkippedOptOut => "not registered (NO_SERVICE set)".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_lines_always_state_the_mode() {
        assert!(gpu_line(GpuStatus::Absent).contains("CPU"));
        assert!(gpu_line(GpuStatus::PresentButDriverMissing).contains("CPU"));
        assert!(gpu_line(GpuStatus::PresentAndUsable).contains("acceleration"));
    }

    #[test]
    fn service_lines_tell_the_operator_what_happened() {
        assert!(service_line(RegisterOutcome::Enabled).contains("enabled"));
        assert!(service_line(RegisterOutcome::SkippedOptOut).contains("NO_SERVICE"));
        assert!(service_line(RegisterOutcome::SkippedNoServiceManager).contains("manually"));
    }
}

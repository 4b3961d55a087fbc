use crate::SystemError;
use std::process::Command;

pub fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run a command and return its trimmed stdout, failing on non-zero exit.
pub fn run(program: &str, args: &[&str]) -> Result<String, SystemError> {
    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SystemError::ToolMissing(program.to_owned())
        } else {
            SystemError::Io(e)
        }
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    } else {
        Err(SystemError::CommandFailed {
            command: format!("{program} {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

/// Run a command and report only whether it exited zero.
pub fn run_status(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run a command, prefixing it with `sudo` when escalation is requested.
pub fn run_elevated(use_sudo: bool, program: &str, args: &[&str]) -> Result<String, SystemError> {
    if use_sudo {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(program);
        full.extend_from_slice(args);
        run("sudo", &full)
    } else {
        run(program, args)
    }
}

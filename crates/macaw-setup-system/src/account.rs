use crate::process;
use crate::SystemError;
use std::path::Path;

/// Service account and group administration capability.
pub trait Accounts {
    fn user_exists(&self, name: &str) -> bool;

    fn group_exists(&self, name: &str) -> bool;

    /// Create a system account with no login shell, homed at `home`, with
    /// a matching primary group.
    fn create_system_user(&self, name: &str, home: &Path) -> Result<(), SystemError>;

    fn add_to_group(&self, user: &str, group: &str) -> Result<(), SystemError>;

    /// Ensure `path` exists and is owned by `owner`, escalating when the
    /// direct write is denied.
    fn ensure_owned_dir(&self, path: &Path, owner: &str) -> Result<(), SystemError>;
}

/// Production account administration over `useradd`/`usermod`/`getent`.
pub struct EtcAccounts {
    use_sudo: bool,
}

impl EtcAccounts {
    pub fn new(use_sudo: bool) -> Self {
        Self { use_sudo }
    }
}

impl Accounts for EtcAccounts {
    fn user_exists(&self, name: &str) -> bool {
        process::run_status("id", &["-u", name])
    }

    fn group_exists(&self, name: &str) -> bool {
        process::run_status("getent", &["group", name])
    }

    fn create_system_user(&self, name: &str, home: &Path) -> Result<(), SystemError> {
        process::run_elevated(
            self.use_sudo,
            "useradd",
            &[
                "--system",
                "--user-group",
                "--create-home",
                "--home-dir",
                &home.to_string_lossy(),
                "--shell",
                "/usr/sbin/nologin",
                name,
            ],
        )?;
        Ok(())
    }

    fn add_to_group(&self, user: &str, group: &str) -> Result<(), SystemError> {
        process::run_elevated(self.use_sudo, "usermod", &["--append", "--groups", group, user])?;
        Ok(())
    }

    fn ensure_owned_dir(&self, path: &Path, owner: &str) -> Result<(), SystemError> {
        match std::fs::create_dir_all(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied && self.use_sudo => {
                process::run_elevated(true, "mkdir", &["-p", &path.to_string_lossy()])?;
            }
            Err(e) => return Err(e.into()),
        }
        process::run_elevated(
            self.use_sudo,
            "chown",
            &[&format!("{owner}:{owner}"), &path.to_string_lossy()],
        )?;
        Ok(())
    }
}

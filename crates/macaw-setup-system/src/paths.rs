use crate::process;
use crate::SystemError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// System bin directories tried for the entry point symlink, in priority
/// order.
pub fn system_bin_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/local/bin"), PathBuf::from("/usr/bin")]
}

/// Create or overwrite a symlink named `link_name` pointing at `target`,
/// trying each bin directory in order. Escalates via sudo only when the
/// direct write is denied.
pub fn publish_symlink(
    target: &Path,
    link_name: &str,
    bin_dirs: &[PathBuf],
    use_sudo: bool,
) -> Result<PathBuf, SystemError> {
    for dir in bin_dirs {
        if !dir.is_dir() {
            continue;
        }
        let link = dir.join(link_name);
        match replace_symlink(target, &link) {
            Ok(()) => {
                debug!("linked {} -> {}", link.display(), target.display());
                return Ok(link);
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied && use_sudo => {
                match process::run_elevated(
                    true,
                    "ln",
                    &["-sfn", &target.to_string_lossy(), &link.to_string_lossy()],
                ) {
                    Ok(_) => return Ok(link),
                    Err(err) => debug!("elevated link in {} failed: {err}", dir.display()),
                }
            }
            Err(e) => debug!("cannot link in {}: {e}", dir.display()),
        }
    }

    let tried = bin_dirs
        .iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(SystemError::NoWritableBinDir(tried))
}

fn replace_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(link) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::os::unix::fs::symlink(target, link)
}

//! Hosts-file I/O around the pure transforms in [`crate::editor`].
//!
//! Every mutation is read whole → transform → write whole. Writes go to a
//! `<hosts>.siteblock.tmp` sibling that takes over the original permissions
//! and is then renamed over the target, so a crash leaves either the old or
//! the new content, never a truncated file. Unchanged content is not
//! rewritten.

use std::fs;
use std::path::{Path, PathBuf};

use siteblock_core::Domain;

use crate::editor;
use crate::error::{io_err, HostsError};

#[cfg(windows)]
const SYSTEM_HOSTS: &str = r"C:\Windows\System32\drivers\etc\hosts";
#[cfg(not(windows))]
const SYSTEM_HOSTS: &str = "/etc/hosts";

/// The operating system's hosts file.
pub fn default_hosts_path() -> PathBuf {
    PathBuf::from(SYSTEM_HOSTS)
}

/// Outcome of a hosts-file mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Content changed and was written.
    Written { path: PathBuf },
    /// The transform produced identical content; nothing was written.
    Unchanged { path: PathBuf },
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Handle on one hosts file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostsFile {
    path: PathBuf,
}

impl HostsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The platform's system hosts file.
    pub fn system() -> Self {
        Self::new(default_hosts_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<String, HostsError> {
        fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))
    }

    /// Add the managed block for `domains`.
    pub fn apply(&self, domains: &[Domain]) -> Result<WriteOutcome, HostsError> {
        self.transform(|text| editor::apply(text, domains))
    }

    /// Remove the managed block for `domains`.
    pub fn revert(&self, domains: &[Domain]) -> Result<WriteOutcome, HostsError> {
        self.transform(|text| editor::revert(text, domains))
    }

    /// Replace the managed block for `previous` with one for `current` in a
    /// single write.
    pub fn resync(
        &self,
        previous: &[Domain],
        current: &[Domain],
    ) -> Result<WriteOutcome, HostsError> {
        self.transform(|text| editor::resync(text, previous, current))
    }

    /// Unified diff of what [`apply`](Self::apply) would write.
    pub fn preview_apply(&self, domains: &[Domain]) -> Result<String, HostsError> {
        let current = self.read()?;
        let desired = editor::apply(&current, domains);
        let label = self.path.display().to_string();
        Ok(editor::preview(
            &current,
            &desired,
            label.trim_start_matches(['/', '\\']),
        ))
    }

    /// Whether the file currently holds a managed block.
    pub fn has_managed_block(&self) -> Result<bool, HostsError> {
        Ok(editor::contains_managed_block(&self.read()?))
    }

    /// Copy the hosts file to `backup`, creating its directory.
    pub fn backup_to(&self, backup: &Path) -> Result<u64, HostsError> {
        if let Some(dir) = backup.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let bytes = fs::copy(&self.path, backup).map_err(|e| io_err(backup, e))?;
        tracing::info!(
            hosts = %self.path.display(),
            backup = %backup.display(),
            bytes,
            "backed up hosts file",
        );
        Ok(bytes)
    }

    /// Overwrite the hosts file with the content of `backup`.
    pub fn restore_from(&self, backup: &Path) -> Result<WriteOutcome, HostsError> {
        if !backup.exists() {
            return Err(HostsError::BackupNotFound {
                path: backup.to_path_buf(),
            });
        }
        let content = fs::read_to_string(backup).map_err(|e| io_err(backup, e))?;
        self.transform(move |_| content)
    }

    fn transform(&self, f: impl FnOnce(&str) -> String) -> Result<WriteOutcome, HostsError> {
        let current = self.read()?;
        let next = f(&current);
        if next == current {
            tracing::debug!(path = %self.path.display(), "hosts file unchanged");
            return Ok(WriteOutcome::Unchanged {
                path: self.path.clone(),
            });
        }
        write_atomic(&self.path, &next)?;
        tracing::info!(path = %self.path.display(), "wrote hosts file");
        Ok(WriteOutcome::Written {
            path: self.path.clone(),
        })
    }
}

/// Replace `path` with `content` via temp file + rename.
///
/// Symlinks are followed so the link itself survives. When the target cannot
/// be renamed over (a bind-mounted file inside a container, or a temp file on
/// another device) the content is written in place instead.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), HostsError> {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let tmp = PathBuf::from(format!("{}.siteblock.tmp", target.display()));
    let permissions = fs::metadata(&target).ok().map(|m| m.permissions());

    fs::write(&tmp, content).map_err(|e| io_err(path, e))?;
    if let Some(permissions) = permissions {
        if let Err(err) = fs::set_permissions(&tmp, permissions) {
            tracing::warn!(path = %tmp.display(), error = %err, "could not copy hosts permissions");
        }
    }

    match fs::rename(&tmp, &target) {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            if !is_rename_unsupported(&err) {
                return Err(io_err(path, err));
            }
            tracing::warn!(
                path = %target.display(),
                error = %err,
                "rename over hosts file not possible, writing in place",
            );
            fs::write(&target, content).map_err(|e| io_err(path, e))
        }
    }
}

#[cfg(unix)]
fn is_rename_unsupported(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(nix::libc::EBUSY) | Some(nix::libc::EXDEV))
}

#[cfg(not(unix))]
fn is_rename_unsupported(_err: &std::io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteblock_core::normalize;
    use tempfile::TempDir;

    const STOCK: &str = "127.0.0.1 localhost\n";

    fn hosts_in(dir: &TempDir) -> HostsFile {
        let path = dir.path().join("hosts");
        fs::write(&path, STOCK).unwrap();
        HostsFile::new(path)
    }

    fn domains() -> Vec<Domain> {
        vec![normalize("example.com").unwrap()]
    }

    #[test]
    fn second_apply_is_unchanged_and_byte_identical() {
        let dir = TempDir::new().unwrap();
        let hosts = hosts_in(&dir);

        assert!(hosts.apply(&domains()).unwrap().is_written());
        let after_first = fs::read(hosts.path()).unwrap();

        let second = hosts.apply(&domains()).unwrap();
        assert!(matches!(second, WriteOutcome::Unchanged { .. }));
        assert_eq!(fs::read(hosts.path()).unwrap(), after_first);
    }

    #[test]
    fn revert_restores_original_content() {
        let dir = TempDir::new().unwrap();
        let hosts = hosts_in(&dir);
        hosts.apply(&domains()).unwrap();
        assert!(hosts.has_managed_block().unwrap());
        hosts.revert(&domains()).unwrap();
        assert_eq!(hosts.read().unwrap(), STOCK);
        assert!(!hosts.has_managed_block().unwrap());
    }

    #[test]
    fn tmp_file_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let hosts = hosts_in(&dir);
        hosts.apply(&domains()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn permissions_survive_rewrite() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let hosts = hosts_in(&dir);
        fs::set_permissions(hosts.path(), fs::Permissions::from_mode(0o644)).unwrap();
        hosts.apply(&domains()).unwrap();
        let mode = fs::metadata(hosts.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_hosts_file_keeps_its_link() {
        let dir = TempDir::new().unwrap();
        let real = hosts_in(&dir);
        let link = dir.path().join("hosts-link");
        std::os::unix::fs::symlink(real.path(), &link).unwrap();

        HostsFile::new(&link).apply(&domains()).unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(real.read().unwrap().contains("127.0.0.1 www.example.com"));
    }

    #[test]
    fn missing_hosts_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let hosts = HostsFile::new(dir.path().join("absent"));
        let err = hosts.apply(&domains()).unwrap_err();
        assert!(matches!(err, HostsError::Io { .. }), "got: {err}");
    }

    #[test]
    fn backup_and_restore() {
        let dir = TempDir::new().unwrap();
        let hosts = hosts_in(&dir);
        let backup = dir.path().join("backups").join("hosts.backup");

        hosts.backup_to(&backup).unwrap();
        hosts.apply(&domains()).unwrap();
        assert_ne!(hosts.read().unwrap(), STOCK);

        assert!(hosts.restore_from(&backup).unwrap().is_written());
        assert_eq!(hosts.read().unwrap(), STOCK);
    }

    #[test]
    fn restore_without_backup_fails() {
        let dir = TempDir::new().unwrap();
        let hosts = hosts_in(&dir);
        let err = hosts.restore_from(&dir.path().join("none")).unwrap_err();
        assert!(matches!(err, HostsError::BackupNotFound { .. }));
    }

    #[test]
    fn preview_does_not_write() {
        let dir = TempDir::new().unwrap();
        let hosts = hosts_in(&dir);
        let diff = hosts.preview_apply(&domains()).unwrap();
        assert!(diff.contains("+127.0.0.1 example.com"));
        assert_eq!(hosts.read().unwrap(), STOCK);
    }

    #[cfg(unix)]
    #[test]
    fn read_only_directory_reports_permission_denied() {
        use std::os::unix::fs::PermissionsExt;
        if nix::unistd::geteuid().is_root() {
            // root ignores file modes
            return;
        }
        let dir = TempDir::new().unwrap();
        let hosts = hosts_in(&dir);
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        let result = hosts.apply(&domains());
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
        assert!(result.unwrap_err().is_permission_denied());
    }
}

use std::{
    fs::{self, File, OpenOptions, Permissions},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::{Container, ContainerErr, Result};

/// Reads the container stored at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Container> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ContainerErr::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Container::read_from(&mut BufReader::new(file)).map_err(|e| e.with_path(path))
}

/// Writes `container` to `path`, replacing any previous file.
///
/// The bytes go to a temporary file in the destination directory which is then renamed over
/// `path`, so readers either see the previous file or the complete new one. A replaced file keeps
/// its permissions, a new one gets `0644` on unix.
pub fn store(path: impl AsRef<Path>, container: &Container) -> Result<()> {
    let path = path.as_ref();
    let io_err = |source: io::Error| ContainerErr::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        container
            .write_to(&mut writer)
            .map_err(|e| e.with_path(path))?;
        writer.flush().map_err(io_err)?;
    }

    if let Some(permissions) = target_permissions(path).map_err(io_err)? {
        tmp.as_file().set_permissions(permissions).map_err(io_err)?;
    }

    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!("stored {} record(s) at {}", container.len(), path.display());
    Ok(())
}

/// The permissions the stored file should end up with, `None` to keep the temporary file's.
fn target_permissions(path: &Path) -> io::Result<Option<Permissions>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(default_permissions()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

/// Scoped exclusive access to a file.
///
/// Holding a guard means a sibling `<file>.lock` exists, created atomically, it is removed when
/// the guard is dropped.
#[derive(Debug)]
pub struct FileGuard {
    lock_path: PathBuf,
}

impl FileGuard {
    /// Takes the guard for `path`.
    ///
    /// # Returns
    /// `ContainerErr::Locked` if the guard is already taken.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let lock_path = lock_path(path);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => Ok(Self { lock_path }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(ContainerErr::Locked(path.to_path_buf()))
            }
            Err(source) => Err(ContainerErr::Io {
                path: lock_path,
                source,
            }),
        }
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            warn!("failed to release {}: {e}", self.lock_path.display());
        }
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

//! Single-path plumbing: mkdir, touch, byte I/O, comparison and polling.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use filetime::FileTime;

use crate::classify::{classify, is_same_path};
use crate::spec::{EnumFsOperation, EnumPathKind, FsOpError, Result, require_path};

const N_WAIT_POLL_INTERVAL_MS: u64 = 100;

/// Create `directory` and any missing parents.
///
/// An existing directory is fine; an existing non-directory is an
/// [`FsOpError::IoFailure`].
pub fn force_mkdir<P: AsRef<Path>>(directory: P) -> Result<()> {
    const OPERATION: EnumFsOperation = EnumFsOperation::ForceMkdir;
    let path_dir = directory.as_ref();
    require_path(OPERATION, path_dir, "directory")?;
    match classify(path_dir) {
        EnumPathKind::Directory => Ok(()),
        EnumPathKind::File => Err(FsOpError::io_failure(
            OPERATION,
            path_dir,
            "A file exists where the directory should be created",
        )),
        EnumPathKind::Missing => fs::create_dir_all(path_dir).or_else(|e| {
            if path_dir.is_dir() {
                Ok(())
            } else {
                Err(FsOpError::io_source(
                    OPERATION,
                    path_dir,
                    "Unable to create directory",
                    e,
                ))
            }
        }),
    }
}

/// Create `file` if missing (parents included) and set its mtime to now.
///
/// Existing content is never truncated.
pub fn touch<P: AsRef<Path>>(file: P) -> Result<()> {
    const OPERATION: EnumFsOperation = EnumFsOperation::Touch;
    let path_file = file.as_ref();
    require_path(OPERATION, path_file, "file")?;

    if classify(path_file) == EnumPathKind::Missing {
        if let Some(path_parent) = path_file.parent()
            && !path_parent.as_os_str().is_empty()
        {
            force_mkdir(path_parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path_file)
            .map_err(|e| FsOpError::io_source(OPERATION, path_file, "Unable to create file", e))?;
    }
    filetime::set_file_mtime(path_file, FileTime::now()).map_err(|e| {
        FsOpError::io_source(OPERATION, path_file, "Unable to set last-modified time", e)
    })
}

/// Compare two files byte for byte.
///
/// Two missing files are equal; a missing file never equals an existing one.
///
/// # Errors
/// [`FsOpError::IoFailure`] if either path is a directory or cannot be read.
pub fn content_equals<P, Q>(file_a: P, file_b: Q) -> Result<bool>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    const OPERATION: EnumFsOperation = EnumFsOperation::ContentEquals;
    let (path_a, path_b) = (file_a.as_ref(), file_b.as_ref());
    require_path(OPERATION, path_a, "file_a")?;
    require_path(OPERATION, path_b, "file_b")?;

    match (classify(path_a), classify(path_b)) {
        (EnumPathKind::Missing, EnumPathKind::Missing) => return Ok(true),
        (EnumPathKind::Directory, _) => {
            return Err(FsOpError::io_failure(
                OPERATION,
                path_a,
                "Cannot compare directories, only files",
            ));
        }
        (_, EnumPathKind::Directory) => {
            return Err(FsOpError::io_failure(
                OPERATION,
                path_b,
                "Cannot compare directories, only files",
            ));
        }
        (EnumPathKind::Missing, _) | (_, EnumPathKind::Missing) => return Ok(false),
        (EnumPathKind::File, EnumPathKind::File) => {}
    }
    if is_same_path(path_a, path_b) {
        return Ok(true);
    }

    let open = |path: &Path| {
        File::open(path).map_err(|e| FsOpError::io_source(OPERATION, path, "Failed to open", e))
    };
    let (file_a, file_b) = (open(path_a)?, open(path_b)?);
    let n_len_a = file_a
        .metadata()
        .map_err(|e| FsOpError::io_source(OPERATION, path_a, "Failed to stat", e))?
        .len();
    let n_len_b = file_b
        .metadata()
        .map_err(|e| FsOpError::io_source(OPERATION, path_b, "Failed to stat", e))?
        .len();
    if n_len_a != n_len_b {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(file_a);
    let mut reader_b = BufReader::new(file_b);
    loop {
        let buf_a = reader_a
            .fill_buf()
            .map_err(|e| FsOpError::io_source(OPERATION, path_a, "Failed to read", e))?;
        let buf_b = reader_b
            .fill_buf()
            .map_err(|e| FsOpError::io_source(OPERATION, path_b, "Failed to read", e))?;
        if buf_a.is_empty() && buf_b.is_empty() {
            return Ok(true);
        }
        let n_chunk = buf_a.len().min(buf_b.len());
        if n_chunk == 0 || buf_a[..n_chunk] != buf_b[..n_chunk] {
            return Ok(false);
        }
        reader_a.consume(n_chunk);
        reader_b.consume(n_chunk);
    }
}

/// `true` if `file` was modified strictly after `reference`.
///
/// A missing `file` is never newer.
///
/// # Errors
/// [`FsOpError::InvalidArgument`] if `reference` does not exist.
pub fn is_file_newer<P, Q>(file: P, reference: Q) -> Result<bool>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    const OPERATION: EnumFsOperation = EnumFsOperation::IsFileNewer;
    let (path_file, path_reference) = (file.as_ref(), reference.as_ref());
    require_path(OPERATION, path_file, "file")?;
    require_path(OPERATION, path_reference, "reference")?;

    let Ok(stat_reference) = fs::metadata(path_reference) else {
        return Err(FsOpError::invalid_argument(
            OPERATION,
            path_reference,
            "Reference file does not exist",
        ));
    };
    let Ok(stat_file) = fs::metadata(path_file) else {
        return Ok(false);
    };
    Ok(FileTime::from_last_modification_time(&stat_file)
        > FileTime::from_last_modification_time(&stat_reference))
}

/// Poll until `path` exists or `timeout` elapses; returns whether it exists.
pub fn wait_for<P: AsRef<Path>>(path: P, timeout: Duration) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return false;
    }
    // `None` when the timeout is too large to represent: wait without deadline.
    let instant_deadline = Instant::now().checked_add(timeout);
    let dur_poll = Duration::from_millis(N_WAIT_POLL_INTERVAL_MS);
    loop {
        if path.exists() {
            return true;
        }
        let dur_sleep = match instant_deadline {
            Some(instant_deadline) => {
                let now = Instant::now();
                if now >= instant_deadline {
                    return false;
                }
                dur_poll.min(instant_deadline - now)
            }
            None => dur_poll,
        };
        thread::sleep(dur_sleep);
    }
}

/// Read a whole file into memory.
pub fn read_file_to_bytes<P: AsRef<Path>>(file: P) -> Result<Vec<u8>> {
    const OPERATION: EnumFsOperation = EnumFsOperation::ReadFile;
    let path_file = file.as_ref();
    require_path(OPERATION, path_file, "file")?;
    match classify(path_file) {
        EnumPathKind::Missing => Err(FsOpError::io_failure(
            OPERATION,
            path_file,
            "File does not exist",
        )),
        EnumPathKind::Directory => Err(FsOpError::io_failure(
            OPERATION,
            path_file,
            "Path is a directory",
        )),
        EnumPathKind::File => fs::read(path_file)
            .map_err(|e| FsOpError::io_source(OPERATION, path_file, "Failed to read", e)),
    }
}

/// Write `data` to `file`, replacing its content and creating parents.
pub fn write_bytes_to_file<P: AsRef<Path>>(file: P, data: &[u8]) -> Result<()> {
    const OPERATION: EnumFsOperation = EnumFsOperation::WriteFile;
    let path_file = file.as_ref();
    require_path(OPERATION, path_file, "file")?;
    if classify(path_file) == EnumPathKind::Directory {
        return Err(FsOpError::io_failure(
            OPERATION,
            path_file,
            "Path is a directory",
        ));
    }
    if let Some(path_parent) = path_file.parent()
        && !path_parent.as_os_str().is_empty()
    {
        force_mkdir(path_parent)?;
    }
    fs::write(path_file, data)
        .map_err(|e| FsOpError::io_source(OPERATION, path_file, "Failed to write", e))
}

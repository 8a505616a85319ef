//! Forced, recursive deletion with a "path is gone" post-check.
//!
//! Deletion never follows symlinks: a link is removed as a link, and the
//! walk does not descend through links inside a tree. Like tree copies,
//! deletion is not transactional; a failure leaves the partially deleted
//! tree as it is.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use crate::classify::classify;
use crate::report::{ReportFsOp, ReportFsOpBuilder};
use crate::spec::{EnumFsOperation, EnumPathKind, FsOpError, Result, require_path};
use crate::util::is_occupied;

/// Delete a file, symlink, or whole directory tree.
///
/// Directories are emptied depth-first, children before parent. A path that
/// does not exist is not an error; the report then has
/// [`ReportFsOp::if_target_missing`] set and nothing counted as deleted.
///
/// # Errors
/// - [`FsOpError::InvalidArgument`] for an empty path.
/// - [`FsOpError::IoFailure`] if any entry still exists after its removal
///   was attempted (permissions, busy files, concurrent writers).
pub fn force_delete<P: AsRef<Path>>(path: P) -> Result<ReportFsOp> {
    const OPERATION: EnumFsOperation = EnumFsOperation::ForceDelete;
    let path = path.as_ref();
    require_path(OPERATION, path, "path")?;

    let mut builder_report = ReportFsOpBuilder::default();
    match inspect_target(path, OPERATION)? {
        None => {
            log::debug!("Nothing to delete at {}", path.display());
            builder_report.mark_target_missing();
        }
        Some(meta) => delete_entry(path, &meta, OPERATION, &mut builder_report)?,
    }
    Ok(builder_report.build())
}

/// Delete a directory tree; a missing directory is a no-op.
///
/// # Errors
/// - [`FsOpError::InvalidArgument`] if `directory` is empty or exists but is
///   not a directory.
/// - [`FsOpError::IoFailure`] as for [`force_delete`].
pub fn delete_directory<P: AsRef<Path>>(directory: P) -> Result<ReportFsOp> {
    const OPERATION: EnumFsOperation = EnumFsOperation::DeleteDirectory;
    let path_dir = directory.as_ref();
    require_path(OPERATION, path_dir, "directory")?;

    let mut builder_report = ReportFsOpBuilder::default();
    let Some(meta) = inspect_target(path_dir, OPERATION)? else {
        builder_report.mark_target_missing();
        return Ok(builder_report.build());
    };
    if classify(path_dir) != EnumPathKind::Directory {
        return Err(FsOpError::invalid_argument(
            OPERATION,
            path_dir,
            "Path is not a directory",
        ));
    }
    delete_entry(path_dir, &meta, OPERATION, &mut builder_report)?;
    Ok(builder_report.build())
}

/// Delete everything inside `directory` but keep the directory itself.
///
/// # Errors
/// - [`FsOpError::InvalidArgument`] if `directory` is empty, missing, or not
///   a directory.
/// - [`FsOpError::IoFailure`] on the first child that cannot be removed.
pub fn clean_directory<P: AsRef<Path>>(directory: P) -> Result<ReportFsOp> {
    const OPERATION: EnumFsOperation = EnumFsOperation::CleanDirectory;
    let path_dir = directory.as_ref();
    require_path(OPERATION, path_dir, "directory")?;
    match classify(path_dir) {
        EnumPathKind::Missing => {
            return Err(FsOpError::invalid_argument(
                OPERATION,
                path_dir,
                "Directory does not exist",
            ));
        }
        EnumPathKind::File => {
            return Err(FsOpError::invalid_argument(
                OPERATION,
                path_dir,
                "Path is not a directory",
            ));
        }
        EnumPathKind::Directory => {}
    }

    let mut builder_report = ReportFsOpBuilder::default();
    delete_children(path_dir, OPERATION, &mut builder_report)?;
    Ok(builder_report.build())
}

/// Delete `path` without reporting errors.
///
/// Returns `true` only if something existed and this call removed it.
pub fn delete_quietly<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return false;
    }
    let Ok(meta) = fs::symlink_metadata(path) else {
        return false;
    };
    let mut builder_report = ReportFsOpBuilder::default();
    match delete_entry(path, &meta, EnumFsOperation::ForceDelete, &mut builder_report) {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Quiet delete failed: {e}");
            false
        }
    }
}

fn inspect_target(path: &Path, operation: EnumFsOperation) -> Result<Option<Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FsOpError::io_source(
            operation,
            path,
            "Failed to inspect path",
            e,
        )),
    }
}

pub(crate) fn delete_entry(
    path: &Path,
    meta: &Metadata,
    operation: EnumFsOperation,
    builder_report: &mut ReportFsOpBuilder,
) -> Result<()> {
    let res_remove = if meta.file_type().is_dir() {
        delete_children(path, operation, builder_report)?;
        fs::remove_dir(path)
    } else {
        remove_non_directory(path, meta)
    };
    verify_removed(path, res_remove, operation)?;
    builder_report.add_deleted();
    Ok(())
}

fn delete_children(
    path_dir: &Path,
    operation: EnumFsOperation,
    builder_report: &mut ReportFsOpBuilder,
) -> Result<()> {
    let iter_entries = fs::read_dir(path_dir).map_err(|e| {
        FsOpError::io_source(operation, path_dir, "Failed to read directory", e)
    })?;
    let mut l_children: Vec<PathBuf> = Vec::new();
    for entry_res in iter_entries {
        let entry = entry_res.map_err(|e| {
            FsOpError::io_source(operation, path_dir, "Failed to read directory entry", e)
        })?;
        l_children.push(entry.path());
    }

    for path_child in l_children {
        match inspect_target(&path_child, operation)? {
            Some(meta_child) => delete_entry(&path_child, &meta_child, operation, builder_report)?,
            None => log::debug!("Vanished before delete: {}", path_child.display()),
        }
    }
    Ok(())
}

fn remove_non_directory(path: &Path, meta: &Metadata) -> io::Result<()> {
    #[cfg(windows)]
    {
        if meta.file_type().is_symlink() && fs::metadata(path).is_ok_and(|m| m.is_dir()) {
            return fs::remove_dir(path);
        }
    }
    #[cfg(not(windows))]
    {
        let _ = meta;
    }
    fs::remove_file(path)
}

/// Judge a removal by whether the path is gone, not by the call's result.
fn verify_removed(
    path: &Path,
    res_remove: io::Result<()>,
    operation: EnumFsOperation,
) -> Result<()> {
    if is_occupied(path) {
        return Err(match res_remove {
            Err(e) => FsOpError::io_source(operation, path, "Unable to delete", e),
            Ok(()) => FsOpError::io_failure(operation, path, "Path still exists after delete"),
        });
    }
    if let Err(e) = res_remove {
        log::debug!("Delete of {} reported {e}, but the path is gone", path.display());
    }
    Ok(())
}

//! Move files and directory trees: rename, or copy then force-delete.

use std::fs;
use std::path::Path;

use crate::classify::{classify, is_ancestor_of};
use crate::copy::{copy_directory, copy_file};
use crate::delete::{delete_quietly, force_delete};
use crate::report::{ReportFsOp, ReportFsOpBuilder};
use crate::spec::{EnumFsOperation, EnumPathKind, FsOpError, Result, require_path};
use crate::util::is_occupied;

/// Move a file to `file_destination`, which must not exist yet.
///
/// Tries a rename first. When that fails (typically across devices) the file
/// is copied with its timestamp and the source force-deleted; if the source
/// cannot be deleted the copy is removed again and the move fails.
///
/// # Errors
/// - [`FsOpError::InvalidArgument`] if a path is empty, or the source is
///   missing or a directory.
/// - [`FsOpError::IoFailure`] if the destination exists or any step fails.
pub fn move_file<P, Q>(file_source: P, file_destination: Q) -> Result<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    const OPERATION: EnumFsOperation = EnumFsOperation::MoveFile;
    let (path_file_src, path_file_dst) = (file_source.as_ref(), file_destination.as_ref());
    require_path(OPERATION, path_file_src, "file_source")?;
    require_path(OPERATION, path_file_dst, "file_destination")?;
    match classify(path_file_src) {
        EnumPathKind::Missing => {
            return Err(FsOpError::invalid_argument(
                OPERATION,
                path_file_src,
                "Source does not exist",
            ));
        }
        EnumPathKind::Directory => {
            return Err(FsOpError::invalid_argument(
                OPERATION,
                path_file_src,
                "Source is a directory",
            ));
        }
        EnumPathKind::File => {}
    }
    ensure_destination_free(path_file_dst, OPERATION)?;
    create_parent_dir(path_file_dst, OPERATION)?;

    if let Err(e) = fs::rename(path_file_src, path_file_dst) {
        log::debug!(
            "Rename {} -> {} failed ({e}); copying instead",
            path_file_src.display(),
            path_file_dst.display()
        );
        return move_file_by_copy(path_file_src, path_file_dst);
    }
    Ok(ReportFsOp::default())
}

/// Copy with timestamp, then force-delete the source; undo the copy on failure.
fn move_file_by_copy(path_file_src: &Path, path_file_dst: &Path) -> Result<ReportFsOp> {
    const OPERATION: EnumFsOperation = EnumFsOperation::MoveFile;
    let mut builder_report = ReportFsOpBuilder::default();
    builder_report.merge(copy_file(path_file_src, path_file_dst, true)?);
    match force_delete(path_file_src) {
        Ok(report_delete) => builder_report.merge(report_delete),
        Err(e) => {
            let reason = if delete_quietly(path_file_dst) {
                format!("Failed to delete original after copy: {e}")
            } else {
                format!(
                    "Failed to delete original after copy: {e}; the copy at {} \
                     could not be removed either",
                    path_file_dst.display()
                )
            };
            return Err(FsOpError::io_failure(OPERATION, path_file_src, reason));
        }
    }
    Ok(builder_report.build())
}

/// Move a directory tree to `dir_destination`, which must not exist yet.
///
/// Tries a rename first, then falls back to [`copy_directory`] followed by
/// [`force_delete`] of the source. A failure in the fallback leaves both
/// trees as they are.
///
/// # Errors
/// - [`FsOpError::InvalidArgument`] if a path is empty.
/// - [`FsOpError::IoFailure`] if the source is missing or not a directory,
///   the destination exists or lies inside the source, or any step fails.
pub fn move_directory<P, Q>(dir_source: P, dir_destination: Q) -> Result<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    const OPERATION: EnumFsOperation = EnumFsOperation::MoveDirectory;
    let (path_dir_src, path_dir_dst) = (dir_source.as_ref(), dir_destination.as_ref());
    require_path(OPERATION, path_dir_src, "dir_source")?;
    require_path(OPERATION, path_dir_dst, "dir_destination")?;
    match classify(path_dir_src) {
        EnumPathKind::Missing => {
            return Err(FsOpError::io_failure(
                OPERATION,
                path_dir_src,
                "Source does not exist",
            ));
        }
        EnumPathKind::File => {
            return Err(FsOpError::io_failure(
                OPERATION,
                path_dir_src,
                "Source is not a directory",
            ));
        }
        EnumPathKind::Directory => {}
    }
    ensure_destination_free(path_dir_dst, OPERATION)?;
    if is_ancestor_of(path_dir_src, path_dir_dst) {
        return Err(FsOpError::io_failure(
            OPERATION,
            path_dir_dst,
            format!(
                "Destination lies inside source: {}",
                path_dir_src.display()
            ),
        ));
    }
    create_parent_dir(path_dir_dst, OPERATION)?;

    if let Err(e) = fs::rename(path_dir_src, path_dir_dst) {
        log::debug!(
            "Rename {} -> {} failed ({e}); copying instead",
            path_dir_src.display(),
            path_dir_dst.display()
        );
        return move_directory_by_copy(path_dir_src, path_dir_dst);
    }
    Ok(ReportFsOp::default())
}

/// Copy the tree, then force-delete the source; both trees stay on failure.
fn move_directory_by_copy(path_dir_src: &Path, path_dir_dst: &Path) -> Result<ReportFsOp> {
    const OPERATION: EnumFsOperation = EnumFsOperation::MoveDirectory;
    let mut builder_report = ReportFsOpBuilder::default();
    builder_report.merge(copy_directory(path_dir_src, path_dir_dst)?);
    let report_delete = force_delete(path_dir_src).map_err(|e| {
        FsOpError::io_failure(
            OPERATION,
            path_dir_src,
            format!("Failed to delete original after copy: {e}"),
        )
    })?;
    builder_report.merge(report_delete);
    Ok(builder_report.build())
}

fn ensure_destination_free(path_dst: &Path, operation: EnumFsOperation) -> Result<()> {
    if is_occupied(path_dst) {
        return Err(FsOpError::io_failure(
            operation,
            path_dst,
            "Destination already exists",
        ));
    }
    Ok(())
}

fn create_parent_dir(path_dst: &Path, operation: EnumFsOperation) -> Result<()> {
    if let Some(path_parent_dst) = path_dst.parent()
        && !path_parent_dst.as_os_str().is_empty()
    {
        fs::create_dir_all(path_parent_dst).map_err(|e| {
            FsOpError::io_source(
                operation,
                path_parent_dst,
                "Failed to create destination parent directory",
                e,
            )
        })?;
    }
    Ok(())
}

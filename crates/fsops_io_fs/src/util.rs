use std::fs::{self, File, Metadata};
use std::io;
use std::path::Path;

use filetime::FileTime;

use crate::report::ReportFsOpBuilder;
use crate::spec::{EnumFsOperation, FsOpError, Result};

////////////////////////////////////////////////////////////////////////////////
// #region Streaming

/// Stream all bytes of `path_file_src` into `path_file_dst`, truncating it.
///
/// Returns the source metadata captured from the open handle. Both handles are
/// closed on every exit path.
pub(crate) fn stream_file_contents(
    path_file_src: &Path,
    path_file_dst: &Path,
    operation: EnumFsOperation,
) -> Result<(Metadata, u64)> {
    let mut file_src = File::open(path_file_src).map_err(|e| {
        FsOpError::io_source(operation, path_file_src, "Failed to open source", e)
    })?;
    let stat_src = file_src.metadata().map_err(|e| {
        FsOpError::io_source(operation, path_file_src, "Failed to stat source", e)
    })?;
    let mut file_dst = File::create(path_file_dst).map_err(|e| {
        FsOpError::io_source(operation, path_file_dst, "Failed to open destination", e)
    })?;

    let n_bytes = io::copy(&mut file_src, &mut file_dst).map_err(|e| {
        FsOpError::io_source(operation, path_file_dst, "Failed to stream contents", e)
    })?;
    if n_bytes != stat_src.len() {
        return Err(FsOpError::io_failure(
            operation,
            path_file_dst,
            format!(
                "Failed to copy full contents from {}: expected {} bytes, wrote {n_bytes}",
                path_file_src.display(),
                stat_src.len()
            ),
        ));
    }
    Ok((stat_src, n_bytes))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Metadata

/// Best-effort: set the destination mtime from `stat_src`.
pub(crate) fn preserve_timestamp(
    stat_src: &Metadata,
    path_dst: &Path,
    builder_report: &mut ReportFsOpBuilder,
) {
    let file_time_modify = FileTime::from_last_modification_time(stat_src);
    if let Err(e) = filetime::set_file_mtime(path_dst, file_time_modify) {
        builder_report.add_warning(format!(
            "Failed to preserve timestamp on {} ({e})",
            path_dst.display()
        ));
    }
}

/// Best-effort: copy permission bits and, on Linux, extended attributes.
pub(crate) fn preserve_attributes(
    path_src: &Path,
    stat_src: &Metadata,
    path_dst: &Path,
    builder_report: &mut ReportFsOpBuilder,
) {
    if let Err(e) = fs::set_permissions(path_dst, stat_src.permissions()) {
        builder_report.add_warning(format!(
            "Failed to preserve permissions on {} ({e})",
            path_dst.display()
        ));
    }
    #[cfg(target_os = "linux")]
    {
        copy_xattrs_linux(path_src, path_dst, builder_report);
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = path_src;
    }
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_src: &Path, path_dst: &Path, builder_report: &mut ReportFsOpBuilder) {
    let iter_xattr_names = match xattr::list(path_src) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("Extended attributes unavailable on {} ({e})", path_src.display());
            return;
        }
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_dst, &name, &raw_value) {
            builder_report.add_warning(format!(
                "Failed to preserve xattr {} on {} ({e})",
                name.to_string_lossy(),
                path_dst.display()
            ));
        }
    }
}

/// `true` if anything, including a dangling symlink, occupies `path`.
pub(crate) fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

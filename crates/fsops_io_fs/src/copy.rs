//! Single-file copy and recursive directory-tree copy.
//!
//! Tree copies are not transactional: the first failure aborts the walk and
//! whatever was already written stays on disk. Callers that need
//! all-or-nothing semantics copy into a temporary sibling and rename it into
//! place themselves.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, FileType};
use std::path::{Path, PathBuf};

use crate::classify::{classify, is_ancestor_of, is_same_path, resolve_path};
use crate::filter::SpecCopyFilter;
use crate::report::{ReportFsOp, ReportFsOpBuilder};
use crate::spec::{
    EnumFsOperation, EnumPathKind, EnumSymlinkStrategy, FsOpError, Result, SpecCopyOptions,
    require_path,
};
use crate::util::{preserve_attributes, preserve_timestamp, stream_file_contents};

#[derive(Debug)]
struct SpecSourceEntry {
    path_src: PathBuf,
    name: OsString,
    file_type: FileType,
}

#[derive(Debug)]
struct SpecCopyContext {
    spec_cp_options: SpecCopyOptions,
    spec_filter: SpecCopyFilter,
    builder_report: ReportFsOpBuilder,
    /// Canonical source directories on the current recursion path.
    set_dirs_on_stack: HashSet<PathBuf>,
    path_dir_src_root_resolved: PathBuf,
    path_dir_dst_root_resolved: PathBuf,
}

////////////////////////////////////////////////////////////////////////////////
// #region SingleFile

/// Copy one file's bytes to `file_destination`, overwriting it.
///
/// The destination's parent directories are created as needed. With
/// `if_preserve_timestamp` the destination mtime is set to the source's;
/// failing to do so is recorded as a warning in the returned report.
///
/// # Errors
/// - [`FsOpError::InvalidArgument`] if either path is empty, or the source is
///   missing or a directory.
/// - [`FsOpError::IoFailure`] if source and destination are the same file,
///   the destination is a directory, or any read/write fails or comes up short.
pub fn copy_file<P, Q>(
    file_source: P,
    file_destination: Q,
    if_preserve_timestamp: bool,
) -> Result<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mut builder_report = ReportFsOpBuilder::default();
    copy_single_file(
        file_source.as_ref(),
        file_destination.as_ref(),
        EnumFsOperation::CopyFile,
        if_preserve_timestamp,
        false,
        &mut builder_report,
    )?;
    Ok(builder_report.build())
}

/// Copy `file_source` into `dir_destination` under the same file name,
/// preserving its timestamp.
pub fn copy_file_to_directory<P, Q>(file_source: P, dir_destination: Q) -> Result<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    const OPERATION: EnumFsOperation = EnumFsOperation::CopyFile;
    let (path_file_src, path_dir_dst) = (file_source.as_ref(), dir_destination.as_ref());
    require_path(OPERATION, path_file_src, "file_source")?;
    require_path(OPERATION, path_dir_dst, "dir_destination")?;

    if classify(path_dir_dst) == EnumPathKind::File {
        return Err(FsOpError::io_failure(
            OPERATION,
            path_dir_dst,
            "Destination is not a directory",
        ));
    }
    let Some(name_file) = path_file_src.file_name() else {
        return Err(FsOpError::invalid_argument(
            OPERATION,
            path_file_src,
            "Source has no file name",
        ));
    };
    copy_file(path_file_src, path_dir_dst.join(name_file), true)
}

pub(crate) fn copy_single_file(
    path_file_src: &Path,
    path_file_dst: &Path,
    operation: EnumFsOperation,
    if_preserve_timestamp: bool,
    if_preserve_attributes: bool,
    builder_report: &mut ReportFsOpBuilder,
) -> Result<()> {
    require_path(operation, path_file_src, "source")?;
    require_path(operation, path_file_dst, "destination")?;

    match classify(path_file_src) {
        EnumPathKind::Missing => {
            return Err(FsOpError::invalid_argument(
                operation,
                path_file_src,
                "Source does not exist",
            ));
        }
        EnumPathKind::Directory => {
            return Err(FsOpError::invalid_argument(
                operation,
                path_file_src,
                "Source is a directory",
            ));
        }
        EnumPathKind::File => {}
    }
    for path in [path_file_src, path_file_dst] {
        if let Err(e) = resolve_path(path) {
            return Err(FsOpError::io_source(
                operation,
                path,
                "Unable to resolve path, refusing to copy",
                e,
            ));
        }
    }
    if is_same_path(path_file_src, path_file_dst) {
        return Err(FsOpError::io_failure(
            operation,
            path_file_dst,
            format!(
                "Source and destination are the same file: {}",
                path_file_src.display()
            ),
        ));
    }

    if let Some(path_parent_dst) = path_file_dst.parent()
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
    if classify(path_file_dst) == EnumPathKind::Directory {
        return Err(FsOpError::io_failure(
            operation,
            path_file_dst,
            "Destination exists and is a directory",
        ));
    }

    let (stat_src, n_bytes) = stream_file_contents(path_file_src, path_file_dst, operation)?;
    if if_preserve_timestamp {
        preserve_timestamp(&stat_src, path_file_dst, builder_report);
    }
    if if_preserve_attributes {
        preserve_attributes(path_file_src, &stat_src, path_file_dst, builder_report);
    }
    builder_report.add_file_copied(n_bytes);
    log::debug!(
        "Copied {} -> {} ({n_bytes} bytes)",
        path_file_src.display(),
        path_file_dst.display()
    );
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DirectoryTree

/// Copy the directory tree `dir_source` to `dir_destination` with default
/// options (timestamps preserved, symlinks dereferenced, no filters).
pub fn copy_directory<P, Q>(dir_source: P, dir_destination: Q) -> Result<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    copy_directory_with_options(dir_source, dir_destination, SpecCopyOptions::default())
}

/// Copy a directory tree from `dir_source` to `dir_destination`.
///
/// The destination is created if missing and merged into if it exists; files
/// already present are overwritten. Siblings are visited in file-name order.
///
/// Behavior is controlled by [`SpecCopyOptions`]:
/// - timestamp and attribute preservation (best-effort, reported as warnings),
/// - symlink strategy for entries inside the source,
/// - basename include/exclude filters for files and directories.
///
/// # Errors
/// - [`FsOpError::InvalidArgument`] for empty paths or invalid patterns,
///   before anything is touched.
/// - [`FsOpError::IoFailure`] if the source is missing or not a directory, the
///   destination is a file, the destination is the source or lies inside it,
///   a symlink loop is found, or any copy step fails. Earlier copies remain.
pub fn copy_directory_with_options<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: SpecCopyOptions,
) -> Result<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    const OPERATION: EnumFsOperation = EnumFsOperation::CopyDirectory;
    let (path_dir_src, path_dir_dst) = (dir_source.as_ref(), dir_destination.as_ref());
    require_path(OPERATION, path_dir_src, "dir_source")?;
    require_path(OPERATION, path_dir_dst, "dir_destination")?;
    let spec_filter = SpecCopyFilter::from_options(&spec_cp_options)?;

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
    if classify(path_dir_dst) == EnumPathKind::File {
        return Err(FsOpError::io_failure(
            OPERATION,
            path_dir_dst,
            "Destination exists and is not a directory",
        ));
    }
    if is_ancestor_of(path_dir_src, path_dir_dst) {
        return Err(FsOpError::io_failure(
            OPERATION,
            path_dir_dst,
            format!(
                "Destination is the source or lies inside it: {}",
                path_dir_src.display()
            ),
        ));
    }

    log::debug!(
        "Copying directory {} -> {}",
        path_dir_src.display(),
        path_dir_dst.display()
    );
    let path_dir_src_root_resolved = resolve_path(path_dir_src).map_err(|e| {
        FsOpError::io_source(OPERATION, path_dir_src, "Failed to resolve source", e)
    })?;
    let path_dir_dst_root_resolved = resolve_path(path_dir_dst).map_err(|e| {
        FsOpError::io_source(OPERATION, path_dir_dst, "Failed to resolve destination", e)
    })?;
    let mut spec_cp_ctx = SpecCopyContext {
        spec_cp_options,
        spec_filter,
        builder_report: ReportFsOpBuilder::default(),
        set_dirs_on_stack: HashSet::new(),
        path_dir_src_root_resolved,
        path_dir_dst_root_resolved,
    };
    walk_directory(path_dir_src, path_dir_dst, &mut spec_cp_ctx)?;
    Ok(spec_cp_ctx.builder_report.build())
}

/// Copy `dir_source` to `dir_destination_parent/<name of dir_source>`.
pub fn copy_directory_to_directory<P, Q>(
    dir_source: P,
    dir_destination_parent: Q,
) -> Result<ReportFsOp>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    const OPERATION: EnumFsOperation = EnumFsOperation::CopyDirectory;
    let (path_dir_src, path_dir_parent) = (dir_source.as_ref(), dir_destination_parent.as_ref());
    require_path(OPERATION, path_dir_src, "dir_source")?;
    require_path(OPERATION, path_dir_parent, "dir_destination_parent")?;

    if classify(path_dir_src) != EnumPathKind::Directory {
        return Err(FsOpError::io_failure(
            OPERATION,
            path_dir_src,
            "Source is not an existing directory",
        ));
    }
    if classify(path_dir_parent) == EnumPathKind::File {
        return Err(FsOpError::io_failure(
            OPERATION,
            path_dir_parent,
            "Destination is not a directory",
        ));
    }
    let path_dir_src_resolved = resolve_path(path_dir_src).map_err(|e| {
        FsOpError::io_source(OPERATION, path_dir_src, "Failed to resolve source", e)
    })?;
    let Some(name_dir) = path_dir_src_resolved.file_name() else {
        return Err(FsOpError::invalid_argument(
            OPERATION,
            path_dir_src,
            "Source has no directory name",
        ));
    };
    copy_directory(path_dir_src, path_dir_parent.join(name_dir))
}

fn walk_directory(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Result<()> {
    const OPERATION: EnumFsOperation = EnumFsOperation::CopyDirectory;
    let path_dir_src_resolved = fs::canonicalize(path_dir_src).map_err(|e| {
        FsOpError::io_source(OPERATION, path_dir_src, "Failed to resolve directory", e)
    })?;
    // A link into the destination tree would list directories this walk creates.
    if path_dir_src_resolved.starts_with(&spec_cp_ctx.path_dir_dst_root_resolved)
        && !path_dir_src_resolved.starts_with(&spec_cp_ctx.path_dir_src_root_resolved)
    {
        return Err(FsOpError::io_failure(
            OPERATION,
            path_dir_src,
            format!(
                "Source directory resolves into the destination tree: {}",
                path_dir_src_resolved.display()
            ),
        ));
    }
    if !spec_cp_ctx
        .set_dirs_on_stack
        .insert(path_dir_src_resolved.clone())
    {
        return Err(FsOpError::io_failure(
            OPERATION,
            path_dir_src,
            format!(
                "Symlink loop detected (revisits {})",
                path_dir_src_resolved.display()
            ),
        ));
    }

    let res_walk = copy_directory_entries(path_dir_src, path_dir_dst, spec_cp_ctx);
    spec_cp_ctx.set_dirs_on_stack.remove(&path_dir_src_resolved);
    res_walk
}

fn copy_directory_entries(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Result<()> {
    const OPERATION: EnumFsOperation = EnumFsOperation::CopyDirectory;
    ensure_destination_dir(path_dir_dst, &mut spec_cp_ctx.builder_report)?;

    for spec_entry in list_source_entries(path_dir_src)? {
        let path_dst = path_dir_dst.join(&spec_entry.name);
        let name = spec_entry.name.to_string_lossy();

        let (b_is_dir, b_is_file) = if spec_entry.file_type.is_symlink() {
            match spec_cp_ctx.spec_cp_options.rule_symlink {
                EnumSymlinkStrategy::Skip => {
                    spec_cp_ctx.builder_report.add_warning(format!(
                        "Symlink skipped: {}",
                        spec_entry.path_src.display()
                    ));
                    spec_cp_ctx.builder_report.add_skipped();
                    continue;
                }
                EnumSymlinkStrategy::Reject => {
                    return Err(FsOpError::io_failure(
                        OPERATION,
                        &spec_entry.path_src,
                        "Symlink rejected by policy",
                    ));
                }
                EnumSymlinkStrategy::Dereference => {
                    let meta_target = fs::metadata(&spec_entry.path_src).map_err(|e| {
                        FsOpError::io_source(
                            OPERATION,
                            &spec_entry.path_src,
                            "Broken symlink",
                            e,
                        )
                    })?;
                    (meta_target.is_dir(), meta_target.is_file())
                }
            }
        } else {
            (spec_entry.file_type.is_dir(), spec_entry.file_type.is_file())
        };

        if b_is_dir {
            if !spec_cp_ctx.spec_filter.admits_dir(&name) {
                spec_cp_ctx.builder_report.add_skipped();
                continue;
            }
            walk_directory(&spec_entry.path_src, &path_dst, spec_cp_ctx)?;
        } else if b_is_file {
            if !spec_cp_ctx.spec_filter.admits_file(&name) {
                spec_cp_ctx.builder_report.add_skipped();
                continue;
            }
            copy_single_file(
                &spec_entry.path_src,
                &path_dst,
                OPERATION,
                spec_cp_ctx.spec_cp_options.if_preserve_timestamp,
                spec_cp_ctx.spec_cp_options.if_preserve_attributes,
                &mut spec_cp_ctx.builder_report,
            )?;
        } else {
            spec_cp_ctx.builder_report.add_warning(format!(
                "Special file skipped: {}",
                spec_entry.path_src.display()
            ));
            spec_cp_ctx.builder_report.add_skipped();
        }
    }

    let if_preserve_timestamp = spec_cp_ctx.spec_cp_options.if_preserve_timestamp;
    let if_preserve_attributes = spec_cp_ctx.spec_cp_options.if_preserve_attributes;
    if if_preserve_timestamp || if_preserve_attributes {
        match fs::metadata(path_dir_src) {
            Ok(stat_dir_src) => {
                if if_preserve_attributes {
                    preserve_attributes(
                        path_dir_src,
                        &stat_dir_src,
                        path_dir_dst,
                        &mut spec_cp_ctx.builder_report,
                    );
                }
                if if_preserve_timestamp {
                    preserve_timestamp(
                        &stat_dir_src,
                        path_dir_dst,
                        &mut spec_cp_ctx.builder_report,
                    );
                }
            }
            Err(e) => spec_cp_ctx.builder_report.add_warning(format!(
                "Failed to stat directory {} ({e})",
                path_dir_src.display()
            )),
        }
    }
    Ok(())
}

fn ensure_destination_dir(
    path_dir_dst: &Path,
    builder_report: &mut ReportFsOpBuilder,
) -> Result<()> {
    const OPERATION: EnumFsOperation = EnumFsOperation::CopyDirectory;
    match classify(path_dir_dst) {
        EnumPathKind::Directory => Ok(()),
        EnumPathKind::File => Err(FsOpError::io_failure(
            OPERATION,
            path_dir_dst,
            "Destination exists and is not a directory",
        )),
        EnumPathKind::Missing => {
            fs::create_dir_all(path_dir_dst).map_err(|e| {
                FsOpError::io_source(
                    OPERATION,
                    path_dir_dst,
                    "Failed to create destination directory",
                    e,
                )
            })?;
            builder_report.add_dir_created();
            Ok(())
        }
    }
}

/// Snapshot the immediate children of `path_dir_src`, sorted by name.
fn list_source_entries(path_dir_src: &Path) -> Result<Vec<SpecSourceEntry>> {
    const OPERATION: EnumFsOperation = EnumFsOperation::CopyDirectory;
    let iter_entries = fs::read_dir(path_dir_src).map_err(|e| {
        FsOpError::io_source(OPERATION, path_dir_src, "Failed to read directory", e)
    })?;

    let mut l_entries = Vec::new();
    for entry_res in iter_entries {
        let entry = entry_res.map_err(|e| {
            FsOpError::io_source(OPERATION, path_dir_src, "Failed to read directory entry", e)
        })?;
        let path_src = entry.path();
        let file_type = entry.file_type().map_err(|e| {
            FsOpError::io_source(OPERATION, &path_src, "Failed to inspect entry", e)
        })?;
        l_entries.push(SpecSourceEntry {
            path_src,
            name: entry.file_name(),
            file_type,
        });
    }
    l_entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(l_entries)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use filetime::FileTime;
    use tempfile::TempDir;

    use super::{
        copy_directory, copy_directory_to_directory, copy_directory_with_options, copy_file,
        copy_file_to_directory,
    };
    use crate::size::size_of_directory;
    use crate::spec::{EnumFsErrorKind, EnumSymlinkStrategy, SpecCopyOptions};

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, txt).expect("write text");
    }

    fn set_mtime(path: &Path, n_secs: i64) {
        filetime::set_file_mtime(path, FileTime::from_unix_time(n_secs, 0)).expect("set mtime");
    }

    fn mtime(path: &Path) -> FileTime {
        FileTime::from_last_modification_time(&fs::metadata(path).expect("metadata"))
    }

    #[test]
    fn copy_file_copies_content_and_timestamp() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("a.txt");
        let dst = tmp.path().join("out/nested/a.txt");
        write_text(&src, "hello world");
        set_mtime(&src, 1_700_000_020);

        let report = copy_file(&src, &dst, true).expect("copy file");
        assert_eq!(report.cnt_files_copied, 1);
        assert_eq!(report.cnt_bytes_copied, 11);
        assert_eq!(report.warning_count(), 0);
        assert_eq!(fs::read(&dst).expect("read"), b"hello world");
        assert_eq!(mtime(&dst), mtime(&src));
    }

    #[test]
    fn copy_file_without_timestamp_keeps_fresh_mtime() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("a.txt");
        let dst = tmp.path().join("b.txt");
        write_text(&src, "abc");
        set_mtime(&src, 1_000_000_000);

        copy_file(&src, &dst, false).expect("copy file");
        assert_eq!(fs::read(&dst).expect("read"), b"abc");
        assert_ne!(mtime(&dst), FileTime::from_unix_time(1_000_000_000, 0));
    }

    #[test]
    fn copy_file_overwrites_longer_destination() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("a.txt");
        let dst = tmp.path().join("b.txt");
        write_text(&src, "ab");
        write_text(&dst, "previous content");

        copy_file(&src, &dst, true).expect("copy file");
        assert_eq!(fs::read_to_string(&dst).expect("read"), "ab");
    }

    #[test]
    fn copy_file_to_self_fails_and_keeps_content() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("a.txt");
        write_text(&src, "keep me");

        let err = copy_file(&src, &src, true).expect_err("copy to self must fail");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
        let err = copy_file(&src, tmp.path().join("sub/../a.txt"), true)
            .expect_err("copy to self via alias must fail");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
        assert_eq!(fs::read_to_string(&src).expect("read"), "keep me");
    }

    #[cfg(unix)]
    #[test]
    fn copy_file_through_dangling_parent_reports_resolution() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("a.txt");
        write_text(&src, "a");
        symlink(tmp.path().join("nowhere"), tmp.path().join("dangling")).expect("symlink");

        let dst = tmp.path().join("dangling/a.txt");
        let err = copy_file(&src, &dst, true).expect_err("unresolvable destination");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
        assert_eq!(err.path(), dst);
        assert!(err.to_string().contains("Unable to resolve"), "{err}");
        assert!(!err.to_string().contains("same file"), "{err}");
    }

    #[test]
    fn copy_file_rejects_bad_arguments() {
        let tmp = TempDir::new().expect("tempdir");
        let dir = tmp.path().join("dir");
        fs::create_dir(&dir).expect("mkdir");

        let err = copy_file(tmp.path().join("missing"), tmp.path().join("x"), true)
            .expect_err("missing source");
        assert_eq!(err.kind(), EnumFsErrorKind::InvalidArgument);

        let err = copy_file(&dir, tmp.path().join("x"), true).expect_err("directory source");
        assert_eq!(err.kind(), EnumFsErrorKind::InvalidArgument);

        let err = copy_file("", tmp.path().join("x"), true).expect_err("empty source");
        assert_eq!(err.kind(), EnumFsErrorKind::InvalidArgument);
        assert!(!tmp.path().join("x").exists());
    }

    #[test]
    fn copy_file_onto_directory_fails() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("a.txt");
        let dir = tmp.path().join("dir");
        write_text(&src, "a");
        fs::create_dir(&dir).expect("mkdir");

        let err = copy_file(&src, &dir, true).expect_err("destination is a directory");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
        assert!(err.to_string().contains("copy_file"));
    }

    #[test]
    fn copy_file_to_directory_uses_source_name() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("a.txt");
        let dir = tmp.path().join("subdir");
        write_text(&src, "12345");
        fs::create_dir(&dir).expect("mkdir");

        copy_file_to_directory(&src, &dir).expect("copy to dir");
        assert_eq!(fs::metadata(dir.join("a.txt")).expect("stat").len(), 5);

        let err = copy_file_to_directory(dir.join("a.txt"), &dir)
            .expect_err("copy into own directory must fail");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
    }

    #[test]
    fn copy_directory_mirrors_tree() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("root.txt"), "root");
        write_text(&src.join("a/file1.txt"), "a");
        write_text(&src.join("b/sub/file2.txt"), "bb");
        fs::create_dir_all(src.join("empty")).expect("mkdir");

        let report = copy_directory(&src, &dst).expect("copy tree");
        assert_eq!(report.cnt_files_copied, 3);
        assert_eq!(report.cnt_bytes_copied, 7);
        assert_eq!(fs::read_to_string(dst.join("b/sub/file2.txt")).expect("read"), "bb");
        assert!(dst.join("empty").is_dir());
        assert_eq!(
            size_of_directory(&src).expect("size src"),
            size_of_directory(&dst).expect("size dst")
        );
    }

    #[test]
    fn copy_directory_merges_into_existing_destination() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("sub/A.txt"), "HELLO WORLD");
        write_text(&dst.join("keep.txt"), "kept");

        let report = copy_directory(&src, &dst).expect("copy tree");
        assert_eq!(report.cnt_files_copied, 1);
        assert!(dst.join("sub/A.txt").exists());
        assert!(dst.join("keep.txt").exists());
    }

    #[test]
    fn copy_directory_preserves_timestamps() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("sub/a.txt"), "a");
        set_mtime(&src.join("sub/a.txt"), 1_600_000_000);
        set_mtime(&src.join("sub"), 1_600_000_100);

        copy_directory(&src, &dst).expect("copy tree");
        assert_eq!(mtime(&dst.join("sub/a.txt")), mtime(&src.join("sub/a.txt")));
        assert_eq!(mtime(&dst.join("sub")), mtime(&src.join("sub")));
    }

    #[test]
    fn copy_directory_errors() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        let file = tmp.path().join("file.txt");
        write_text(&src.join("a.txt"), "a");
        write_text(&file, "f");

        let err = copy_directory("", "").expect_err("empty paths");
        assert_eq!(err.kind(), EnumFsErrorKind::InvalidArgument);
        let err = copy_directory(&src, "").expect_err("empty destination");
        assert_eq!(err.kind(), EnumFsErrorKind::InvalidArgument);

        for (path_src, path_dst) in [
            (tmp.path().join("doesnt-exist"), tmp.path().join("a")),
            (file.clone(), tmp.path().join("a")),
            (src.clone(), file.clone()),
            (src.clone(), src.clone()),
            (src.clone(), src.join("nested")),
        ] {
            let err = copy_directory(&path_src, &path_dst).expect_err("must fail");
            assert_eq!(err.kind(), EnumFsErrorKind::IoFailure, "{err}");
        }
        assert!(!tmp.path().join("a").exists());
        assert!(!src.join("nested").exists());
        assert_eq!(fs::read_to_string(&file).expect("read"), "f");
    }

    #[test]
    fn copy_directory_applies_filters() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("keep.txt"), "k");
        write_text(&src.join("drop.md"), "d");
        write_text(&src.join("target/out.txt"), "o");

        let spec_cp_options = SpecCopyOptions {
            patterns_include_files: Some(vec!["*.txt".to_string()]),
            patterns_exclude_dirs: Some(vec!["target".to_string()]),
            ..SpecCopyOptions::default()
        };
        let report = copy_directory_with_options(&src, &dst, spec_cp_options).expect("copy tree");
        assert_eq!(report.cnt_files_copied, 1);
        assert_eq!(report.cnt_skipped, 2);
        assert!(dst.join("keep.txt").exists());
        assert!(!dst.join("drop.md").exists());
        assert!(!dst.join("target").exists());
    }

    #[test]
    fn copy_directory_invalid_pattern_touches_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");

        let spec_cp_options = SpecCopyOptions {
            patterns_include_files: Some(vec!["[".to_string()]),
            ..SpecCopyOptions::default()
        };
        let err = copy_directory_with_options(&src, &dst, spec_cp_options)
            .expect_err("invalid glob must fail");
        assert_eq!(err.kind(), EnumFsErrorKind::InvalidArgument);
        assert!(!dst.exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_directory_symlink_policies() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        let outside = tmp.path().join("outside");
        write_text(&src.join("root.txt"), "root");
        write_text(&outside.join("data.txt"), "data");
        symlink(src.join("root.txt"), src.join("link_root.txt")).expect("file symlink");
        symlink(&outside, src.join("linked_dir")).expect("dir symlink");

        let dst = tmp.path().join("dst_deref");
        copy_directory(&src, &dst).expect("dereference copy");
        assert!(!dst.join("link_root.txt").is_symlink());
        assert_eq!(fs::read_to_string(dst.join("link_root.txt")).expect("read"), "root");
        assert_eq!(fs::read_to_string(dst.join("linked_dir/data.txt")).expect("read"), "data");

        let dst = tmp.path().join("dst_skip");
        let spec_cp_options = SpecCopyOptions {
            rule_symlink: EnumSymlinkStrategy::Skip,
            ..SpecCopyOptions::default()
        };
        let report = copy_directory_with_options(&src, &dst, spec_cp_options).expect("skip copy");
        assert_eq!(report.cnt_skipped, 2);
        assert_eq!(report.warning_count(), 2);
        assert!(dst.join("root.txt").exists());
        assert!(!dst.join("link_root.txt").exists());

        let dst = tmp.path().join("dst_reject");
        let spec_cp_options = SpecCopyOptions {
            rule_symlink: EnumSymlinkStrategy::Reject,
            ..SpecCopyOptions::default()
        };
        let err = copy_directory_with_options(&src, &dst, spec_cp_options).expect_err("reject");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
    }

    #[cfg(unix)]
    #[test]
    fn copy_directory_detects_symlink_loop() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        write_text(&src.join("a/file.txt"), "x");
        symlink(&src, src.join("a/back_to_root")).expect("loop symlink");

        let err = copy_directory(&src, tmp.path().join("dst")).expect_err("loop must fail");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
        assert!(err.to_string().contains("Symlink loop"));
    }

    #[cfg(unix)]
    #[test]
    fn copy_directory_refuses_symlink_into_destination() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");
        symlink(&dst, src.join("link")).expect("symlink to destination");

        let err = copy_directory(&src, &dst).expect_err("link into destination");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
        assert!(err.to_string().contains("destination tree"), "{err}");
        assert!(!dst.join("link/link").exists());

        let nested = tmp.path().join("out/nested");
        fs::remove_file(src.join("link")).expect("remove link");
        symlink(tmp.path().join("out"), src.join("up")).expect("symlink above destination");
        write_text(&nested.join("b.txt"), "b");
        let err = copy_directory(&src, &nested).expect_err("link above destination");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
    }

    #[test]
    fn copy_directory_into_parent_of_source_is_allowed() {
        let tmp = TempDir::new().expect("tempdir");
        let parent = tmp.path().join("parent");
        let src = parent.join("child");
        write_text(&src.join("a.txt"), "a");
        write_text(&src.join("sub/b.txt"), "b");

        copy_directory(&src, &parent).expect("merge child into parent");
        assert_eq!(fs::read_to_string(parent.join("a.txt")).expect("read"), "a");
        assert_eq!(fs::read_to_string(parent.join("sub/b.txt")).expect("read"), "b");
    }

    #[cfg(unix)]
    #[test]
    fn copy_directory_revisiting_sibling_target_is_not_a_loop() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        write_text(&src.join("shared/file.txt"), "x");
        symlink(src.join("shared"), src.join("alias")).expect("sibling symlink");

        copy_directory(&src, tmp.path().join("dst")).expect("copy tree");
        assert!(tmp.path().join("dst/alias/file.txt").exists());
        assert!(tmp.path().join("dst/shared/file.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_directory_broken_symlink_fails() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        fs::create_dir(&src).expect("mkdir");
        symlink(tmp.path().join("nowhere"), src.join("dangling")).expect("symlink");

        let err = copy_directory(&src, tmp.path().join("dst")).expect_err("broken symlink");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
    }

    #[cfg(unix)]
    #[test]
    fn copy_directory_preserves_permissions_when_asked() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("script.sh"), "#!/bin/sh");
        fs::set_permissions(src.join("script.sh"), fs::Permissions::from_mode(0o750))
            .expect("chmod");

        let spec_cp_options = SpecCopyOptions {
            if_preserve_attributes: true,
            ..SpecCopyOptions::default()
        };
        copy_directory_with_options(&src, &dst, spec_cp_options).expect("copy tree");
        let n_mode = fs::metadata(dst.join("script.sh")).expect("stat").permissions().mode();
        assert_eq!(n_mode & 0o777, 0o750);
    }

    #[test]
    fn copy_directory_to_directory_nests_by_name() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("project");
        let parent = tmp.path().join("backup");
        write_text(&src.join("a.txt"), "a");

        copy_directory_to_directory(&src, &parent).expect("copy into parent");
        assert!(parent.join("project/a.txt").exists());

        let err = copy_directory_to_directory(&src, &src).expect_err("into itself");
        assert_eq!(err.kind(), EnumFsErrorKind::IoFailure);
    }
}

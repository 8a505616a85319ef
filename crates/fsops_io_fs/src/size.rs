//! Byte-size aggregation over files and directory trees.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::classify;
use crate::spec::{
    EnumFsOperation, EnumPathKind, EnumSymlinkStrategy, FsOpError, Result, SpecSizeOptions,
    require_path,
};

#[derive(Debug)]
struct SpecSizeContext {
    rule_symlink: EnumSymlinkStrategy,
    set_dirs_on_stack: HashSet<PathBuf>,
    if_saturated: bool,
}

impl SpecSizeContext {
    /// Add with saturation at `u64::MAX`; warns once per call.
    fn accumulate(&mut self, n_total: u64, n_add: u64, path: &Path) -> u64 {
        match n_total.checked_add(n_add) {
            Some(v) => v,
            None => {
                if !self.if_saturated {
                    log::warn!(
                        "Size overflowed u64 under {}; saturating at u64::MAX",
                        path.display()
                    );
                    self.if_saturated = true;
                }
                u64::MAX
            }
        }
    }
}

/// Total size in bytes of every regular file under `directory`.
///
/// Directories contribute nothing. Symlinks are dereferenced; see
/// [`size_of_directory_with_options`].
pub fn size_of_directory<P: AsRef<Path>>(directory: P) -> Result<u64> {
    size_of_directory_with_options(directory, SpecSizeOptions::default())
}

/// Total size in bytes of every regular file under `directory`.
///
/// With [`EnumSymlinkStrategy::Dereference`] a link to a file counts the
/// target's size, a link to a directory is descended into, a dangling link
/// counts 0 and a link back into the current path is skipped; each of those
/// skips is logged as a warning. `Skip` ignores links, `Reject` fails on them.
/// The sum saturates at `u64::MAX`.
///
/// # Errors
/// - [`FsOpError::InvalidArgument`] if `directory` is empty, missing, or not a
///   directory.
/// - [`FsOpError::IoFailure`] if a directory cannot be listed, or a symlink is
///   met under `Reject`.
pub fn size_of_directory_with_options<P: AsRef<Path>>(
    directory: P,
    spec_size_options: SpecSizeOptions,
) -> Result<u64> {
    const OPERATION: EnumFsOperation = EnumFsOperation::SizeOfDirectory;
    let path_dir = directory.as_ref();
    require_path(OPERATION, path_dir, "directory")?;
    match classify(path_dir) {
        EnumPathKind::Missing => Err(FsOpError::invalid_argument(
            OPERATION,
            path_dir,
            "Directory does not exist",
        )),
        EnumPathKind::File => Err(FsOpError::invalid_argument(
            OPERATION,
            path_dir,
            "Path is not a directory",
        )),
        EnumPathKind::Directory => {
            let mut spec_size_ctx = SpecSizeContext {
                rule_symlink: spec_size_options.rule_symlink,
                set_dirs_on_stack: HashSet::new(),
                if_saturated: false,
            };
            walk_directory(path_dir, &mut spec_size_ctx)
        }
    }
}

/// Size of a file, or of a whole tree when `path` is a directory.
pub fn size_of<P: AsRef<Path>>(path: P) -> Result<u64> {
    const OPERATION: EnumFsOperation = EnumFsOperation::SizeOf;
    let path = path.as_ref();
    require_path(OPERATION, path, "path")?;
    match classify(path) {
        EnumPathKind::Missing => Err(FsOpError::invalid_argument(
            OPERATION,
            path,
            "Path does not exist",
        )),
        EnumPathKind::Directory => size_of_directory(path),
        EnumPathKind::File => fs::metadata(path)
            .map(|meta| meta.len())
            .map_err(|e| FsOpError::io_source(OPERATION, path, "Failed to stat file", e)),
    }
}

fn walk_directory(path_dir: &Path, spec_size_ctx: &mut SpecSizeContext) -> Result<u64> {
    const OPERATION: EnumFsOperation = EnumFsOperation::SizeOfDirectory;
    let path_dir_resolved = fs::canonicalize(path_dir).map_err(|e| {
        FsOpError::io_source(OPERATION, path_dir, "Failed to resolve directory", e)
    })?;
    if !spec_size_ctx
        .set_dirs_on_stack
        .insert(path_dir_resolved.clone())
    {
        log::warn!("Symlink loop skipped: {}", path_dir.display());
        return Ok(0);
    }

    let res_sum = sum_directory_entries(path_dir, spec_size_ctx);
    spec_size_ctx.set_dirs_on_stack.remove(&path_dir_resolved);
    res_sum
}

fn sum_directory_entries(path_dir: &Path, spec_size_ctx: &mut SpecSizeContext) -> Result<u64> {
    const OPERATION: EnumFsOperation = EnumFsOperation::SizeOfDirectory;
    let iter_entries = fs::read_dir(path_dir).map_err(|e| {
        FsOpError::io_source(OPERATION, path_dir, "Failed to read directory", e)
    })?;

    let mut n_total: u64 = 0;
    for entry_res in iter_entries {
        let entry = entry_res.map_err(|e| {
            FsOpError::io_source(OPERATION, path_dir, "Failed to read directory entry", e)
        })?;
        let path_entry = entry.path();
        let meta_entry = entry.metadata().map_err(|e| {
            FsOpError::io_source(OPERATION, &path_entry, "Failed to inspect entry", e)
        })?;

        let meta_effective = if meta_entry.file_type().is_symlink() {
            match spec_size_ctx.rule_symlink {
                EnumSymlinkStrategy::Skip => continue,
                EnumSymlinkStrategy::Reject => {
                    return Err(FsOpError::io_failure(
                        OPERATION,
                        &path_entry,
                        "Symlink rejected by policy",
                    ));
                }
                EnumSymlinkStrategy::Dereference => match fs::metadata(&path_entry) {
                    Ok(v) => v,
                    Err(e) => {
                        log::warn!(
                            "Broken symlink counted as 0 bytes: {} ({e})",
                            path_entry.display()
                        );
                        continue;
                    }
                },
            }
        } else {
            meta_entry
        };

        let n_entry = if meta_effective.is_dir() {
            walk_directory(&path_entry, spec_size_ctx)?
        } else if meta_effective.is_file() {
            meta_effective.len()
        } else {
            0
        };
        n_total = spec_size_ctx.accumulate(n_total, n_entry, path_dir);
    }
    Ok(n_total)
}

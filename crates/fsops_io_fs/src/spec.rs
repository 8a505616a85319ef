//! Operation options, enums and the error taxonomy.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// What a path denotes at the moment it is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPathKind {
    /// Nothing exists at the path (or a symlink points nowhere).
    Missing,
    /// Regular file (symlinks are followed).
    File,
    /// Directory (symlinks are followed).
    Directory,
}

/// Symlink handling policy while walking a source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSymlinkStrategy {
    /// Follow the link and copy/count the target bytes/entries.
    Dereference,
    /// Ignore symlink entries (recorded as skipped with a warning).
    Skip,
    /// Fail the operation on the first symlink entry.
    Reject,
}

/// Pattern matching mode for include/exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// Public operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFsOperation {
    CopyFile,
    CopyDirectory,
    ForceDelete,
    DeleteDirectory,
    CleanDirectory,
    SizeOfDirectory,
    SizeOf,
    MoveFile,
    MoveDirectory,
    ForceMkdir,
    Touch,
    ContentEquals,
    IsFileNewer,
    ReadFile,
    WriteFile,
}

impl EnumFsOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CopyFile => "copy_file",
            Self::CopyDirectory => "copy_directory",
            Self::ForceDelete => "force_delete",
            Self::DeleteDirectory => "delete_directory",
            Self::CleanDirectory => "clean_directory",
            Self::SizeOfDirectory => "size_of_directory",
            Self::SizeOf => "size_of",
            Self::MoveFile => "move_file",
            Self::MoveDirectory => "move_directory",
            Self::ForceMkdir => "force_mkdir",
            Self::Touch => "touch",
            Self::ContentEquals => "content_equals",
            Self::IsFileNewer => "is_file_newer",
            Self::ReadFile => "read_file_to_bytes",
            Self::WriteFile => "write_bytes_to_file",
        }
    }
}

impl fmt::Display for EnumFsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error category, see [`FsOpError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFsErrorKind {
    /// Caller-side problem, raised before any side effect.
    InvalidArgument,
    /// Filesystem failure or failed post-condition; side effects may remain.
    IoFailure,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Input options for directory-tree copies.
#[derive(Debug, Clone)]
pub struct SpecCopyOptions {
    /// Set each destination file's (and directory's) mtime to the source's.
    pub if_preserve_timestamp: bool,
    /// Also copy permission bits and, on Linux, extended attributes.
    pub if_preserve_attributes: bool,
    /// Symlink handling behavior inside the source tree.
    pub rule_symlink: EnumSymlinkStrategy,
    /// Include patterns applied to file basename.
    pub patterns_include_files: Option<Vec<String>>,
    /// Exclude patterns applied to file basename.
    pub patterns_exclude_files: Option<Vec<String>>,
    /// Include patterns applied to directory basename.
    pub patterns_include_dirs: Option<Vec<String>>,
    /// Exclude patterns applied to directory basename.
    pub patterns_exclude_dirs: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
}

impl Default for SpecCopyOptions {
    fn default() -> Self {
        Self {
            if_preserve_timestamp: true,
            if_preserve_attributes: false,
            rule_symlink: EnumSymlinkStrategy::Dereference,
            patterns_include_files: None,
            patterns_exclude_files: None,
            patterns_include_dirs: None,
            patterns_exclude_dirs: None,
            rule_pattern: EnumPatternMode::Glob,
        }
    }
}

/// Input options for tree sizing.
#[derive(Debug, Clone)]
pub struct SpecSizeOptions {
    /// Symlink handling behavior inside the measured tree.
    pub rule_symlink: EnumSymlinkStrategy,
}

impl Default for SpecSizeOptions {
    fn default() -> Self {
        Self {
            rule_symlink: EnumSymlinkStrategy::Dereference,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Error returned by every fallible operation of this crate.
#[derive(Debug, Error)]
pub enum FsOpError {
    /// Missing/empty path argument or a path of the wrong kind.
    #[error("{operation}: invalid argument {}: {reason}", path.display())]
    InvalidArgument {
        operation: EnumFsOperation,
        path: PathBuf,
        reason: String,
    },
    /// Underlying filesystem call or post-condition check failed.
    #[error("{operation}: I/O failure at {}: {reason}", path.display())]
    IoFailure {
        operation: EnumFsOperation,
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<io::Error>,
    },
}

impl FsOpError {
    pub(crate) fn invalid_argument(
        operation: EnumFsOperation,
        path: &Path,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            operation,
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io_failure(
        operation: EnumFsOperation,
        path: &Path,
        reason: impl Into<String>,
    ) -> Self {
        Self::IoFailure {
            operation,
            path: path.to_path_buf(),
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn io_source(
        operation: EnumFsOperation,
        path: &Path,
        reason: impl Into<String>,
        source: io::Error,
    ) -> Self {
        Self::IoFailure {
            operation,
            path: path.to_path_buf(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Error category.
    pub fn kind(&self) -> EnumFsErrorKind {
        match self {
            Self::InvalidArgument { .. } => EnumFsErrorKind::InvalidArgument,
            Self::IoFailure { .. } => EnumFsErrorKind::IoFailure,
        }
    }

    /// Path the error is about.
    pub fn path(&self) -> &Path {
        match self {
            Self::InvalidArgument { path, .. } | Self::IoFailure { path, .. } => path,
        }
    }

    /// Operation that failed.
    pub fn operation(&self) -> EnumFsOperation {
        match self {
            Self::InvalidArgument { operation, .. } | Self::IoFailure { operation, .. } => {
                *operation
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, FsOpError>;

/// Reject the empty path, which stands in for an unset argument.
pub(crate) fn require_path(operation: EnumFsOperation, path: &Path, name: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(FsOpError::invalid_argument(
            operation,
            path,
            format!("Arg `{name}` must not be empty."),
        ));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

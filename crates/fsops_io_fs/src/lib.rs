//! `fsops_io_fs` v1:
//! Synchronous filesystem operations with explicit failure reporting.
//!
//! Layout:
//! - `classify` : path kind probing and canonical identity checks
//! - `copy`     : single-file and directory-tree copy
//! - `delete`   : forced and quiet recursive deletion
//! - `file`     : mkdir, touch, byte I/O, comparison and polling
//! - `relocate` : file and directory moves
//! - `report`   : per-call counters and advisory warnings
//! - `size`     : byte-size aggregation
//! - `spec`     : enums/options/errors
//! - `filter`   : include/exclude pattern matching (internal)
//! - `util`     : shared helper functions (internal)

pub mod classify;
pub mod copy;
pub mod delete;
pub mod file;
mod filter;
pub mod relocate;
pub mod report;
pub mod size;
pub mod spec;
mod util;

pub use classify::{classify, is_ancestor_of, is_same_path, resolve_path};
pub use copy::{
    copy_directory, copy_directory_to_directory, copy_directory_with_options, copy_file,
    copy_file_to_directory,
};
pub use delete::{clean_directory, delete_directory, delete_quietly, force_delete};
pub use file::{
    content_equals, force_mkdir, is_file_newer, read_file_to_bytes, touch, wait_for,
    write_bytes_to_file,
};
pub use relocate::{move_directory, move_file};
pub use report::{ReportFsOp, ReportFsOpBuilder};
pub use size::{size_of, size_of_directory, size_of_directory_with_options};
pub use spec::{
    EnumFsErrorKind, EnumFsOperation, EnumPathKind, EnumPatternMode, EnumSymlinkStrategy,
    FsOpError, Result, SpecCopyOptions, SpecSizeOptions,
};

//! Basename include/exclude filters for tree copies.

use std::path::Path;

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{EnumFsOperation, EnumPatternMode, FsOpError, Result, SpecCopyOptions};

#[derive(Debug, Clone)]
pub(crate) enum TypePatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypePatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

/// Compiled filter set; an empty set admits everything.
#[derive(Debug, Clone, Default)]
pub(crate) struct SpecCopyFilter {
    patterns_include_files: Option<TypePatternSeq>,
    patterns_exclude_files: Option<TypePatternSeq>,
    patterns_include_dirs: Option<TypePatternSeq>,
    patterns_exclude_dirs: Option<TypePatternSeq>,
}

impl SpecCopyFilter {
    pub(crate) fn from_options(spec_cp_options: &SpecCopyOptions) -> Result<Self> {
        let rule_pattern = spec_cp_options.rule_pattern;
        Ok(Self {
            patterns_include_files: _compile(
                spec_cp_options.patterns_include_files.as_deref(),
                rule_pattern,
            )?,
            patterns_exclude_files: _compile(
                spec_cp_options.patterns_exclude_files.as_deref(),
                rule_pattern,
            )?,
            patterns_include_dirs: _compile(
                spec_cp_options.patterns_include_dirs.as_deref(),
                rule_pattern,
            )?,
            patterns_exclude_dirs: _compile(
                spec_cp_options.patterns_exclude_dirs.as_deref(),
                rule_pattern,
            )?,
        })
    }

    pub(crate) fn admits_file(&self, name: &str) -> bool {
        !_should_exclude(
            name,
            self.patterns_include_files.as_ref(),
            self.patterns_exclude_files.as_ref(),
        )
    }

    pub(crate) fn admits_dir(&self, name: &str) -> bool {
        !_should_exclude(
            name,
            self.patterns_include_dirs.as_ref(),
            self.patterns_exclude_dirs.as_ref(),
        )
    }
}

fn _compile(
    patterns: Option<&[String]>,
    rule_pattern: EnumPatternMode,
) -> Result<Option<TypePatternSeq>> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumPatternMode::Literal => Ok(Some(TypePatternSeq::Literal(patterns.to_vec()))),
        EnumPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| _invalid_pattern(pattern, e))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypePatternSeq::Glob(l_glob)))
        }
        EnumPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                l_regex.push(Regex::new(pattern).map_err(|e| _invalid_pattern(pattern, e))?);
            }
            Ok(Some(TypePatternSeq::Regex(l_regex)))
        }
    }
}

fn _invalid_pattern(pattern: &str, e: impl std::fmt::Display) -> FsOpError {
    FsOpError::invalid_argument(
        EnumFsOperation::CopyDirectory,
        Path::new(pattern),
        format!("Invalid pattern in include/exclude: {e}"),
    )
}

fn _should_exclude(
    value: &str,
    patterns_include: Option<&TypePatternSeq>,
    patterns_exclude: Option<&TypePatternSeq>,
) -> bool {
    let b_included = patterns_include.is_none_or(|p| p.is_match(value));
    let b_excluded = patterns_exclude.is_some_and(|p| p.is_match(value));
    !b_included || b_excluded
}

//! Protected region of an exercise directory.
//!
//! Files under the student source directory, or under any path listed in the
//! exercise's declaration file, belong to the student: a merge adds them when
//! missing but never overwrites them.
//!
//! The declaration file is YAML; only the `extra_student_files` key is read,
//! either as a block list or an inline `[a, b]` list.

use crate::env::exercise::EXTRA_STUDENT_FILES_KEY;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Names describing where an exercise keeps student-owned content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseLayout {
    pub student_source_dir: String,
    pub declaration_file: String,
}

impl Default for ExerciseLayout {
    fn default() -> Self {
        Self {
            student_source_dir: crate::env::exercise::STUDENT_SOURCE_DIR.to_string(),
            declaration_file: crate::env::exercise::DECLARATION_FILE_NAME.to_string(),
        }
    }
}

/// Relative paths a merge must not overwrite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedPaths {
    roots: Vec<PathBuf>,
}

impl ProtectedPaths {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths = Self::default();
        for root in roots {
            paths.insert(root.into());
        }
        paths
    }

    /// Student source directory plus everything declared in any of `dirs`
    pub fn for_exercise(layout: &ExerciseLayout, dirs: &[&Path]) -> Self {
        let mut paths = Self::new([layout.student_source_dir.as_str()]);

        for dir in dirs {
            let declaration = dir.join(&layout.declaration_file);
            let Ok(content) = fs::read_to_string(&declaration) else {
                continue;
            };
            for declared in parse_declaration(&content) {
                paths.insert(declared);
            }
        }

        debug!("Protected paths: {:?}", paths.roots);
        paths
    }

    fn insert(&mut self, path: PathBuf) {
        if !is_safe_relative(&path) {
            warn!("Ignoring protected path outside the exercise: {}", path.display());
            return;
        }
        if !self.roots.contains(&path) {
            self.roots.push(path);
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether `relative` equals or lies below a protected root
    pub fn is_protected(&self, relative: &Path) -> bool {
        self.roots.iter().any(|root| relative.starts_with(root))
    }
}

fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Paths listed under `extra_student_files` in a declaration file
pub fn parse_declaration(content: &str) -> Vec<PathBuf> {
    let mut declared = Vec::new();
    let mut in_list = false;

    for line in content.lines() {
        let without_comment = strip_comment(line);
        if without_comment.trim().is_empty() {
            continue;
        }

        let indented = without_comment.starts_with(char::is_whitespace);
        if !indented {
            in_list = false;
            if let Some(rest) = without_comment
                .strip_prefix(EXTRA_STUDENT_FILES_KEY)
                .and_then(|rest| rest.trim_start().strip_prefix(':'))
            {
                let rest = rest.trim();
                if let Some(inline) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
                    declared.extend(
                        inline
                            .split(',')
                            .map(unquote)
                            .filter(|item| !item.is_empty())
                            .map(PathBuf::from),
                    );
                } else {
                    in_list = rest.is_empty();
                }
            }
            continue;
        }

        if in_list {
            if let Some(item) = without_comment.trim().strip_prefix('-') {
                let item = unquote(item);
                if !item.is_empty() {
                    declared.push(PathBuf::from(item));
                }
            }
        }
    }

    declared
}

fn strip_comment(line: &str) -> &str {
    match line.find(" #") {
        Some(index) => &line[..index],
        None if line.trim_start().starts_with('#') => "",
        None => line,
    }
}

fn unquote(item: &str) -> &str {
    let item = item.trim();
    item.strip_prefix('"')
        .and_then(|i| i.strip_suffix('"'))
        .or_else(|| item.strip_prefix('\'').and_then(|i| i.strip_suffix('\'')))
        .unwrap_or(item)
}

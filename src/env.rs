//! Environment constants and path utilities for the exercise client core.
//!
//! This module centralizes the hardcoded directory and file names used by the
//! download, update-detection and configuration code.

use std::path::{Path, PathBuf};

/// Client directory name (hidden directory like .git, .vscode)
pub const TMC_DIR_NAME: &str = ".tmc";

/// Configuration file name inside the client directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "tmc-core.toml";

/// Default update cache file name
pub const UPDATE_CACHE_FILE_NAME: &str = "exercise-checksums.json";

/// Exercise-layout names shared by the merge download and the root locator
pub mod exercise {
    /// Directory holding student-written sources; never overwritten by a merge
    pub const STUDENT_SOURCE_DIR: &str = "src";

    /// Per-exercise file declaring extra protected paths
    pub const DECLARATION_FILE_NAME: &str = ".tmcproject.yml";

    /// Key of the protected-path list inside the declaration file
    pub const EXTRA_STUDENT_FILES_KEY: &str = "extra_student_files";

    /// Prefix of the staging directories created while merging
    pub const STAGING_PREFIX: &str = ".tmc-staging-";

    /// Build descriptors that mark an exercise root
    pub const DEFAULT_ROOT_MARKERS: &[&str] = &[
        "build.xml",
        "pom.xml",
        "Makefile",
        "Cargo.toml",
        "setup.py",
        "requirements.txt",
        DECLARATION_FILE_NAME,
    ];
}

/// Build the client directory path under a base directory
pub fn tmc_dir_path(base: &Path) -> PathBuf {
    base.join(TMC_DIR_NAME)
}

/// Build the default update cache path under a base directory
pub fn update_cache_file_path(base: &Path) -> PathBuf {
    tmc_dir_path(base).join(UPDATE_CACHE_FILE_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    tmc_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file paths in the current directory, in lookup order
pub fn local_config_file_paths(current_dir: &Path) -> [PathBuf; 2] {
    [
        current_dir.join(LOCAL_CONFIG_FILE_NAME),
        tmc_dir_path(current_dir).join(CONFIG_FILE_NAME),
    ]
}

/// Build the local directory of one exercise under a download target
pub fn exercise_dir_path(target: &Path, exercise_name: &str) -> PathBuf {
    target.join(exercise_name)
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::config::LoaderConfig;
use std::io;
use std::path::{Path, PathBuf};

/// Maps unit names to description files.
#[derive(Debug, Clone)]
pub struct DescriptionLocator {
    dir: PathBuf,
    extension: String,
}

impl DescriptionLocator {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(&config.descriptions_dir, &config.extension)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `unit` with the description extension appended, unless present.
    pub fn file_name(&self, unit: &str) -> String {
        let suffix = format!(".{}", self.extension);
        if unit.ends_with(&suffix) {
            unit.to_string()
        } else {
            format!("{}{}", unit, suffix)
        }
    }

    /// Find a unit: as given (relative to the working directory or
    /// absolute), then inside the descriptions directory.
    pub fn locate(&self, unit: &str) -> Option<PathBuf> {
        let file = self.file_name(unit);
        let direct = PathBuf::from(&file);
        if direct.is_file() {
            return Some(direct);
        }
        let in_dir = self.dir.join(&file);
        if in_dir.is_file() {
            return Some(in_dir);
        }
        log::debug!("description '{}' not found in {}", file, self.dir.display());
        None
    }

    /// Every description file in the directory, sorted by name.
    pub fn scan(&self) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .is_some_and(|ext| ext == self.extension.as_str());
            if matches && path.is_file() {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }
}

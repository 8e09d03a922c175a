//
// pairing/directory_index.rs
//
// Recursive file-name search over a project's conventional roots
//
// Walk order is deterministic: entries are visited sorted by file name and
// base directories are concatenated in the order given. Callers take the
// first result, so this order is the tie-break between same-named files.
//

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::{DirEntry, WalkDir};

use super::config::ResolverConfig;
use crate::perf::TimingGuard;

/// Scans slower than this are reported
const SCAN_BUDGET_MS: u64 = 250;

fn log_slow_scan(timer: &TimingGuard, base_dirs: &[PathBuf]) {
    if timer.over_budget() {
        log::debug!(
            "Slow scan of {:?} ({:?}); consider pruning large directories",
            base_dirs,
            timer.elapsed()
        );
    }
}

/// Searches base directories for files by name, skipping pruned subtrees
#[derive(Debug, Clone)]
pub struct DirectoryIndex {
    pruned_dirs: Vec<String>,
    grouped_test_suffix: String,
}

impl DirectoryIndex {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            pruned_dirs: config.pruned_dirs.clone(),
            grouped_test_suffix: config.grouped_test_suffix.clone(),
        }
    }

    /// All files named `filename` below `base_dirs`, narrowed by `namespace`.
    ///
    /// Results keep walk order and are not deduplicated. When `namespace` is
    /// non-empty and some result lies inside it, only those results remain.
    pub fn search(&self, base_dirs: &[PathBuf], filename: &str, namespace: &str) -> Vec<PathBuf> {
        let timer = TimingGuard::new("directory_index:search", SCAN_BUDGET_MS);
        let matches = self.walk_all(base_dirs, |entry| {
            entry.file_type().is_file() && entry.file_name().to_str() == Some(filename)
        });
        log::trace!(
            "Found {} candidate(s) named '{}' under {:?} in {:?}",
            matches.len(),
            filename,
            base_dirs,
            timer.elapsed()
        );
        log_slow_scan(&timer, base_dirs);
        narrow_by_namespace(matches, namespace)
    }

    /// Grouped test files (`*_tests.<ext>`) directly inside a directory named `dir_name`.
    ///
    /// This is how a source file finds its tests when they are split into
    /// several files instead of one `_test` file.
    pub fn search_grouped(
        &self,
        base_dirs: &[PathBuf],
        dir_name: &str,
        extension: &str,
        namespace: &str,
    ) -> Vec<PathBuf> {
        let timer = TimingGuard::new("directory_index:search_grouped", SCAN_BUDGET_MS);
        let suffix = format!("{}.{}", self.grouped_test_suffix, extension);
        let matches = self.walk_all(base_dirs, |entry| {
            if !entry.file_type().is_file() {
                return false;
            }
            let in_group_dir = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                == Some(dir_name);
            let name = entry.file_name().to_str().unwrap_or_default();
            in_group_dir && name.len() > suffix.len() && name.ends_with(&suffix)
        });
        log::trace!(
            "Found {} grouped test file(s) in directories named '{}' in {:?}",
            matches.len(),
            dir_name,
            timer.elapsed()
        );
        log_slow_scan(&timer, base_dirs);
        narrow_by_namespace(matches, namespace)
    }

    /// Walk every base directory in parallel and concatenate in input order
    fn walk_all<F>(&self, base_dirs: &[PathBuf], keep: F) -> Vec<PathBuf>
    where
        F: Fn(&DirEntry) -> bool + Sync,
    {
        base_dirs
            .par_iter()
            .map(|base| self.walk(base, &keep))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn walk<F>(&self, base: &Path, keep: &F) -> Vec<PathBuf>
    where
        F: Fn(&DirEntry) -> bool,
    {
        if !base.is_dir() {
            log::trace!("Skipping missing base directory '{}'", base.display());
            return Vec::new();
        }

        WalkDir::new(base)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_pruned(e))
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::debug!("Skipping unreadable entry under '{}': {}", base.display(), err);
                    None
                }
            })
            .filter(|e| keep(e))
            .map(|e| e.into_path())
            .collect()
    }

    /// The base directory itself is never pruned, only what lies below it
    fn is_pruned(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.pruned_dirs.iter().any(|d| d == name))
    }
}

impl Default for DirectoryIndex {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

/// Keep only matches inside `namespace` when at least one is; otherwise keep all
pub fn narrow_by_namespace(matches: Vec<PathBuf>, namespace: &str) -> Vec<PathBuf> {
    if namespace.is_empty() || matches.len() < 2 {
        return matches;
    }

    let needle = format!("{}/", namespace);
    let narrowed: Vec<PathBuf> = matches
        .iter()
        .filter(|p| p.to_string_lossy().replace('\\', "/").contains(&needle))
        .cloned()
        .collect();

    if narrowed.is_empty() {
        log::debug!(
            "No candidate inside namespace '{}', keeping all {}",
            namespace,
            matches.len()
        );
        matches
    } else {
        log::debug!(
            "Namespace '{}' narrowed {} candidate(s) to {}",
            namespace,
            matches.len(),
            narrowed.len()
        );
        narrowed
    }
}

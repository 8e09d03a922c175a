//
// pairing/resolve.rs
//
// Partner resolution: classify a file, then search for its partner
//

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::config::ResolverConfig;
use super::directory_index::DirectoryIndex;
use super::path_match::{Classification, FileKind, FileReference, PathMatcher};

/// Reasons an operation has nothing to do.
///
/// None of these are failures from the user's point of view; commands turn
/// them into no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no project root is configured")]
    NoProjectRoot,
    #[error("no file is active")]
    NoActiveFile,
    #[error("not a source file type: {}", .0.display())]
    UnsupportedFileType(PathBuf),
    #[error("no file named '{0}' found")]
    PartnerNotFound(String),
}

/// Outcome of a successful lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub classification: Classification,
    /// All candidates after namespace narrowing, best first
    pub candidates: Vec<PathBuf>,
}

impl Resolution {
    /// The chosen partner
    pub fn partner(&self) -> &Path {
        // `resolve` never builds a Resolution without candidates
        &self.candidates[0]
    }
}

/// Finds the partner of a file within one project
#[derive(Debug, Clone, Default)]
pub struct PartnerResolver {
    matcher: PathMatcher,
    index: DirectoryIndex,
}

impl PartnerResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let index = DirectoryIndex::new(&config);
        Self {
            matcher: PathMatcher::new(config),
            index,
        }
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    /// Find the partner of `path` (its test if it is a source file, its
    /// source if it is a test file).
    pub fn resolve(&self, path: &Path, project_root: &Path) -> Result<Resolution, ResolveError> {
        if project_root.as_os_str().is_empty() {
            return Err(ResolveError::NoProjectRoot);
        }
        if !self.matcher.is_supported(path) {
            return Err(ResolveError::UnsupportedFileType(path.to_path_buf()));
        }
        let Some(classification) = self.matcher.classify(path, project_root) else {
            return Err(ResolveError::PartnerNotFound(path.display().to_string()));
        };

        let base_dirs = classification.base_dirs(project_root);
        let mut candidates = self.index.search(
            &base_dirs,
            &classification.partner_name,
            &classification.hint.namespace,
        );

        if candidates.is_empty() && classification.kind == FileKind::Source {
            candidates = self.grouped_tests_for(path, &base_dirs, &classification);
        }

        if candidates.is_empty() {
            log::debug!(
                "No partner '{}' for '{}' under {:?}",
                classification.partner_name,
                path.display(),
                base_dirs
            );
            return Err(ResolveError::PartnerNotFound(classification.partner_name));
        }

        log::debug!(
            "Resolved '{}' -> '{}' ({} candidate(s))",
            path.display(),
            candidates[0].display(),
            candidates.len()
        );
        Ok(Resolution {
            classification,
            candidates,
        })
    }

    /// The partner path alone, if there is one
    pub fn resolve_partner(&self, path: &Path, project_root: &Path) -> Option<PathBuf> {
        self.resolve(path, project_root)
            .ok()
            .map(|r| r.partner().to_path_buf())
    }

    /// The test file to run for `path`: the file itself if it is a test,
    /// otherwise its resolved partner.
    pub fn test_file_for(
        &self,
        path: &Path,
        project_root: &Path,
    ) -> Result<(PathBuf, FileKind), ResolveError> {
        if project_root.as_os_str().is_empty() {
            return Err(ResolveError::NoProjectRoot);
        }
        if !self.matcher.is_supported(path) {
            return Err(ResolveError::UnsupportedFileType(path.to_path_buf()));
        }
        let file = FileReference::new(path)
            .ok_or_else(|| ResolveError::PartnerNotFound(path.display().to_string()))?;
        let kind = self.matcher.kind_of(&file);
        if kind.is_test() {
            return Ok((path.to_path_buf(), kind));
        }

        let resolution = self.resolve(path, project_root)?;
        let partner = resolution.partner().to_path_buf();
        let partner_kind = FileReference::new(&partner)
            .map(|f| self.matcher.kind_of(&f))
            .unwrap_or(FileKind::TestFile);
        Ok((partner, partner_kind))
    }

    /// Grouped test files for a source file with no single `_test` file
    fn grouped_tests_for(
        &self,
        path: &Path,
        base_dirs: &[PathBuf],
        classification: &Classification,
    ) -> Vec<PathBuf> {
        let Some(file) = FileReference::new(path) else {
            return Vec::new();
        };
        log::trace!(
            "No '{}' found, looking for grouped tests in directories named '{}'",
            classification.partner_name,
            file.stem
        );
        self.index.search_grouped(
            base_dirs,
            &file.stem,
            &file.extension,
            &classification.hint.namespace,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn test_source_resolves_to_nested_test() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let source = touch(root, "app/models/billing/invoice.rb");
        let test = touch(root, "test/unit/billing/invoice_test.rb");

        let resolver = PartnerResolver::default();
        let resolution = resolver.resolve(&source, root).unwrap();
        assert_eq!(resolution.partner(), test.as_path());
        assert_eq!(resolution.candidates.len(), 1);
    }

    #[test]
    fn test_namespace_disambiguates() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let source = touch(root, "app/models/billing/invoice.rb");
        touch(root, "test/unit/legacy/invoice_test.rb");
        let billing = touch(root, "test/unit/billing/invoice_test.rb");

        let resolver = PartnerResolver::default();
        assert_eq!(resolver.resolve_partner(&source, root), Some(billing));
    }

    #[test]
    fn test_test_resolves_to_source() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let source = touch(root, "app/services/billing/charge.rb");
        let test = touch(root, "test/unit/billing/charge_test.rb");

        let resolver = PartnerResolver::default();
        assert_eq!(resolver.resolve_partner(&test, root), Some(source));
    }

    #[test]
    fn test_grouped_test_resolves_to_directory_named_source() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let source = touch(root, "app/models/company.rb");
        touch(root, "app/models/roles.rb");
        let grouped = touch(root, "test/unit/company/roles_tests.rb");

        let resolver = PartnerResolver::default();
        assert_eq!(resolver.resolve_partner(&grouped, root), Some(source));
    }

    #[test]
    fn test_source_falls_back_to_grouped_tests() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let source = touch(root, "app/models/company.rb");
        let billing = touch(root, "test/unit/company/billing_tests.rb");
        touch(root, "test/unit/company/roles_tests.rb");

        let resolver = PartnerResolver::default();
        let resolution = resolver.resolve(&source, root).unwrap();
        assert_eq!(resolution.partner(), billing.as_path());
        assert_eq!(resolution.candidates.len(), 2);
    }

    #[test]
    fn test_engine_prefix_relocates_search() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let source = touch(root, "components/billing/app/models/invoice.rb");
        touch(root, "test/unit/invoice_test.rb");
        let engine_test = touch(root, "components/billing/test/unit/invoice_test.rb");

        let resolver = PartnerResolver::default();
        assert_eq!(resolver.resolve_partner(&source, root), Some(engine_test));
    }

    #[test]
    fn test_partner_not_found() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let source = touch(root, "app/models/orphan.rb");

        let resolver = PartnerResolver::default();
        assert_eq!(
            resolver.resolve(&source, root),
            Err(ResolveError::PartnerNotFound("orphan_test.rb".to_string()))
        );
    }

    #[test]
    fn test_no_project_root() {
        let resolver = PartnerResolver::default();
        assert_eq!(
            resolver.resolve(Path::new("/proj/app/models/invoice.rb"), Path::new("")),
            Err(ResolveError::NoProjectRoot)
        );
    }

    #[test]
    fn test_unsupported_file_type() {
        let resolver = PartnerResolver::default();
        let path = Path::new("/proj/app/assets/app.js");
        assert_eq!(
            resolver.resolve(path, Path::new("/proj")),
            Err(ResolveError::UnsupportedFileType(path.to_path_buf()))
        );
    }

    #[test]
    fn test_test_file_for_test_is_itself() {
        let resolver = PartnerResolver::default();
        let path = Path::new("/proj/test/unit/company/roles_tests.rb");
        assert_eq!(
            resolver.test_file_for(path, Path::new("/proj")),
            Ok((path.to_path_buf(), FileKind::GroupedTestFile))
        );
    }

    #[test]
    fn test_test_file_for_source_resolves() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let source = touch(root, "app/controllers/invoices_controller.rb");
        let test = touch(root, "test/functional/invoices_controller_test.rb");

        let resolver = PartnerResolver::default();
        assert_eq!(
            resolver.test_file_for(&source, root),
            Ok((test, FileKind::TestFile))
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ResolveError::PartnerNotFound("a_test.rb".to_string()).to_string(),
            "no file named 'a_test.rb' found"
        );
        assert_eq!(
            ResolveError::UnsupportedFileType(PathBuf::from("/p/x.js")).to_string(),
            "not a source file type: /p/x.js"
        );
    }
}

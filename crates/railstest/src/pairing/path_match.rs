//
// pairing/path_match.rs
//
// Classifies a file as source or test and derives what its partner is called
// and where to look for it.
//
// A file's partner is found by name, then narrowed by location. The location
// part comes from the first anchor directory (app/models, test/unit, lib, ...)
// on the file's project-relative path:
//
//   components/billing/app/models/payments/invoice.rb
//   \________________/\________/\_______/
//         prefix        anchor   namespace
//
// The prefix relocates the search roots for engines mounted below the project
// root. The namespace is only used when more than one candidate turns up.
//

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::config::ResolverConfig;

/// What a file is, judged by its name alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    /// Implementation file
    Source,
    /// `<name>_test.<ext>`, tests for exactly one source file
    TestFile,
    /// `<aspect>_tests.<ext>`, one of several test files for the source file
    /// named after the containing directory
    GroupedTestFile,
}

impl FileKind {
    pub fn is_test(self) -> bool {
        !matches!(self, FileKind::Source)
    }
}

/// A path and the name parts derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub path: PathBuf,
    pub file_name: String,
    /// File name up to the last `.`
    pub stem: String,
    /// Extension without the dot; empty when the name has none
    pub extension: String,
    pub directory: PathBuf,
}

impl FileReference {
    pub fn new(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let (stem, extension) = match file_name.rfind('.') {
            Some(idx) if idx > 0 => (
                file_name[..idx].to_string(),
                file_name[idx + 1..].to_string(),
            ),
            _ => (file_name.clone(), String::new()),
        };
        let directory = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        Some(Self {
            path: path.to_path_buf(),
            file_name,
            stem,
            extension,
            directory,
        })
    }

    /// Name of the directory holding the file
    pub fn directory_name(&self) -> Option<&str> {
        self.directory.file_name().and_then(|n| n.to_str())
    }
}

/// Location parts extracted relative to the first anchor directory
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NamespaceHint {
    /// Segments before the anchor, `/`-joined, no leading slash
    pub prefix: String,
    /// Segments after the anchor, each preceded by `/`
    pub namespace: String,
}

impl NamespaceHint {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.namespace.is_empty()
    }

    /// Drop the innermost namespace segment
    fn pop_segment(&mut self) {
        match self.namespace.rfind('/') {
            Some(idx) => self.namespace.truncate(idx),
            None => self.namespace.clear(),
        }
    }
}

/// Everything needed to look up a file's partner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: FileKind,
    /// File name the partner is expected to have
    pub partner_name: String,
    /// Roots (relative to the project root, or to the mount prefix) to search
    pub search_roots: Vec<String>,
    pub hint: NamespaceHint,
}

impl Classification {
    /// Absolute directories to scan for the partner
    pub fn base_dirs(&self, project_root: &Path) -> Vec<PathBuf> {
        let base = if self.hint.prefix.is_empty() {
            project_root.to_path_buf()
        } else {
            project_root.join(&self.hint.prefix)
        };
        self.search_roots.iter().map(|root| base.join(root)).collect()
    }
}

/// Name-pattern classifier bound to one set of conventions
#[derive(Debug, Clone)]
pub struct PathMatcher {
    config: ResolverConfig,
    anchors: Vec<Vec<String>>,
}

impl PathMatcher {
    pub fn new(config: ResolverConfig) -> Self {
        let anchors = config
            .anchors
            .iter()
            .map(|a| {
                a.split('/')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|segments| !segments.is_empty())
            .collect();
        Self { config, anchors }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Whether toggle/run act on this file at all
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == self.config.source_extension)
    }

    /// Kind of a file, judged by its name
    pub fn kind_of(&self, file: &FileReference) -> FileKind {
        if strip_name_suffix(&file.stem, &self.config.test_suffix).is_some() {
            FileKind::TestFile
        } else if strip_name_suffix(&file.stem, &self.config.grouped_test_suffix).is_some() {
            FileKind::GroupedTestFile
        } else {
            FileKind::Source
        }
    }

    /// Classify `path` and work out what its partner is called and where it lives.
    ///
    /// Returns `None` when the path has no file name, or for a grouped test
    /// file sitting in a directory without a name.
    pub fn classify(&self, path: &Path, project_root: &Path) -> Option<Classification> {
        let path = normalize_path(path)?;
        let file = FileReference::new(&path)?;
        let kind = self.kind_of(&file);
        let mut hint = self.namespace_hint(&file.directory, project_root);

        let (partner_stem, search_roots) = match kind {
            FileKind::TestFile => {
                let stem = strip_name_suffix(&file.stem, &self.config.test_suffix)?;
                (stem.to_string(), self.config.source_roots.clone())
            }
            FileKind::GroupedTestFile => {
                // The containing directory names the source file, so it is not
                // part of the namespace the source lives in.
                let dir_name = file.directory_name()?.to_string();
                if !hint.namespace.is_empty() {
                    hint.pop_segment();
                }
                (dir_name, self.config.source_roots.clone())
            }
            FileKind::Source => (
                format!("{}{}", file.stem, self.config.test_suffix),
                self.config.test_roots.clone(),
            ),
        };

        let classification = Classification {
            kind,
            partner_name: with_extension(&partner_stem, &file.extension),
            search_roots,
            hint,
        };
        log::trace!(
            "Classified '{}' as {:?}: partner='{}' prefix='{}' namespace='{}'",
            path.display(),
            classification.kind,
            classification.partner_name,
            classification.hint.prefix,
            classification.hint.namespace
        );
        Some(classification)
    }

    /// Split a directory's project-relative path around the first anchor.
    ///
    /// Never fails: a directory outside the project root, or one without any
    /// anchor on its path, yields an empty hint.
    pub fn namespace_hint(&self, dir: &Path, project_root: &Path) -> NamespaceHint {
        let (Some(dir), Some(root)) = (normalize_path(dir), normalize_path(project_root)) else {
            return NamespaceHint::default();
        };
        let Ok(relative) = dir.strip_prefix(&root) else {
            log::trace!(
                "Directory '{}' is outside project root '{}', no namespace hint",
                dir.display(),
                root.display()
            );
            return NamespaceHint::default();
        };

        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        for start in 0..segments.len() {
            for anchor in &self.anchors {
                let end = start + anchor.len();
                if end <= segments.len() && segments[start..end] == anchor[..] {
                    return NamespaceHint {
                        prefix: segments[..start].join("/"),
                        namespace: segments[end..]
                            .iter()
                            .map(|s| format!("/{}", s))
                            .collect(),
                    };
                }
            }
        }

        NamespaceHint::default()
    }

    /// Name of the method in the partner file that corresponds to `name`.
    ///
    /// Leaving a test file strips the test prefix; leaving a source file adds
    /// it. A test-file helper without the prefix has no counterpart.
    pub fn counterpart_method(&self, name: &str, from_test: bool) -> Option<String> {
        let prefix = &self.config.test_method_prefix;
        if from_test {
            name.strip_prefix(prefix.as_str())
                .filter(|rest| !rest.is_empty())
                .map(|rest| rest.to_string())
        } else {
            Some(format!("{}{}", prefix, name))
        }
    }
}

impl Default for PathMatcher {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

/// `stem` without `suffix`, provided something is left over
fn strip_name_suffix<'a>(stem: &'a str, suffix: &str) -> Option<&'a str> {
    stem.strip_suffix(suffix).filter(|rest| !rest.is_empty())
}

fn with_extension(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// Normalize a path by resolving `.` and `..` components lexically
pub(crate) fn normalize_path(path: &Path) -> Option<PathBuf> {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Only pop Normal segments so RootDir and Prefix survive
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }

    if components.is_empty() {
        return None;
    }
    Some(components.into_iter().collect())
}

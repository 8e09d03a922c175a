//! Deterministic fixture Rails projects for benchmarks and tests.
//!
//! Generates a project tree with controlled characteristics: number of
//! models, methods per model, namespace depth, how many models use grouped
//! test directories instead of a single test file, and decoy copies of test
//! files inside directories the resolver never descends into.
//!
//! No randomness, so benchmarks are reproducible.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Configuration for generating a fixture project.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub model_count: usize,
    pub methods_per_model: usize,
    /// Models are spread over namespaces `ns0/ns1/...` up to this depth
    pub namespace_depth: usize,
    /// Every n-th model gets a grouped test directory (0 disables)
    pub grouped_every: usize,
    /// Decoy test files written under `tmp/` and `fixtures/`
    pub decoys_per_model: usize,
}

impl FixtureConfig {
    /// 10 models, 3 methods each, one namespace level.
    pub fn small() -> Self {
        Self {
            model_count: 10,
            methods_per_model: 3,
            namespace_depth: 1,
            grouped_every: 5,
            decoys_per_model: 0,
        }
    }

    /// 100 models, 8 methods each, up to two namespace levels, some decoys.
    pub fn medium() -> Self {
        Self {
            model_count: 100,
            methods_per_model: 8,
            namespace_depth: 2,
            grouped_every: 10,
            decoys_per_model: 1,
        }
    }

    /// 1000 models, 12 methods each, up to three namespace levels.
    pub fn large() -> Self {
        Self {
            model_count: 1000,
            methods_per_model: 12,
            namespace_depth: 3,
            grouped_every: 20,
            decoys_per_model: 2,
        }
    }

    fn is_grouped(&self, index: usize) -> bool {
        self.grouped_every > 0 && index % self.grouped_every == self.grouped_every - 1
    }

    /// Namespace directory of model `index`, `""` or ending in `/`
    pub fn namespace(&self, index: usize) -> String {
        let depth = if self.namespace_depth == 0 {
            0
        } else {
            index % (self.namespace_depth + 1)
        };
        (0..depth).map(|level| format!("ns{}/", level)).collect()
    }

    /// Project-relative path of model `index`'s source file
    pub fn source_path(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("app/models/{}model_{}.rb", self.namespace(index), index))
    }

    /// Project-relative path of model `index`'s test file. For grouped
    /// models this is the first file in its group directory.
    pub fn test_path(&self, index: usize) -> PathBuf {
        let ns = self.namespace(index);
        if self.is_grouped(index) {
            PathBuf::from(format!("test/unit/{}model_{}/aspect_0_tests.rb", ns, index))
        } else {
            PathBuf::from(format!("test/unit/{}model_{}_test.rb", ns, index))
        }
    }
}

fn class_name(index: usize) -> String {
    format!("Model{}", index)
}

fn generate_source(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();
    writeln!(content, "class {} < ApplicationRecord", class_name(index)).unwrap();
    for m in 0..config.methods_per_model {
        writeln!(content, "  def method_{}", m).unwrap();
        writeln!(content, "    {} * {}", index, m + 1).unwrap();
        writeln!(content, "  end").unwrap();
        content.push('\n');
    }
    writeln!(content, "end").unwrap();
    content
}

fn generate_test(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();
    writeln!(
        content,
        "class {}Test < ActiveSupport::TestCase",
        class_name(index)
    )
    .unwrap();
    for m in 0..config.methods_per_model {
        writeln!(content, "  def test_method_{}", m).unwrap();
        writeln!(
            content,
            "    assert_equal {}, {}.new.method_{}",
            index * (m + 1),
            class_name(index),
            m
        )
        .unwrap();
        writeln!(content, "  end").unwrap();
        content.push('\n');
    }
    writeln!(content, "end").unwrap();
    content
}

fn write_file(root: &Path, relative: &Path, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("Failed to create {}: {}", parent.display(), e));
    }
    fs::write(&path, content)
        .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", path.display(), e));
}

/// Create a temporary fixture project from the given configuration.
///
/// The directory is cleaned up when the `TempDir` is dropped. Calling this
/// twice with the same `FixtureConfig` produces byte-identical trees.
pub fn create_fixture_workspace(config: &FixtureConfig) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    write_fixture_workspace(temp_dir.path(), config);
    temp_dir
}

/// Write fixture files into an existing directory.
pub fn write_fixture_workspace(dir: &Path, config: &FixtureConfig) {
    write_file(dir, Path::new("Gemfile"), "source 'https://rubygems.org'\n");

    for i in 0..config.model_count {
        write_file(dir, &config.source_path(i), &generate_source(i, config));

        let test = generate_test(i, config);
        if config.is_grouped(i) {
            let group = format!("test/unit/{}model_{}", config.namespace(i), i);
            for aspect in 0..2 {
                let rel = PathBuf::from(format!("{}/aspect_{}_tests.rb", group, aspect));
                write_file(dir, &rel, &test);
            }
        } else {
            write_file(dir, &config.test_path(i), &test);
        }

        let file_name = config
            .test_path(i)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for d in 0..config.decoys_per_model {
            let pruned = if d % 2 == 0 { "tmp" } else { "fixtures" };
            let rel = PathBuf::from(format!("test/{}/decoy_{}/{}", pruned, d, file_name));
            write_file(dir, &rel, &test);
        }
    }
}

//
// cli/fs_host.rs
//
// Editor host backed by files on disk
//
// Views are indices into the list of files the command has touched. Buffer
// text is read from disk each time it is asked for, every opened file counts
// as loaded at once, and opened files and cursor moves are recorded so the
// command can report them.
//

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::orchestrator::EditorHost;

const PROJECT_MARKERS: &[&str] = &["app", "test", "Gemfile"];

/// Nearest ancestor of `file` holding `app/`, `test/` or a `Gemfile`
pub fn discover_project_root(file: &Path) -> Option<PathBuf> {
    file.ancestors()
        .skip(1)
        .find(|dir| {
            PROJECT_MARKERS.iter().any(|marker| {
                let candidate = dir.join(marker);
                if *marker == "Gemfile" {
                    candidate.is_file()
                } else {
                    candidate.is_dir()
                }
            })
        })
        .map(Path::to_path_buf)
}

#[derive(Debug, Default)]
pub struct FsHost {
    root: Option<PathBuf>,
    views: Vec<PathBuf>,
    loaded: HashSet<usize>,
    cursors: HashMap<usize, usize>,
    active: Option<usize>,
    opened: Vec<PathBuf>,
    cursor_moves: Vec<(usize, usize)>,
}

impl FsHost {
    pub fn new(root: &Path) -> Self {
        Self {
            root: Some(root.to_path_buf()),
            ..Self::default()
        }
    }

    /// A host with no workspace folder
    pub fn without_root() -> Self {
        Self::default()
    }

    /// Make `path` the active file with the cursor at `offset`. Not recorded
    /// as an open.
    pub fn activate(&mut self, path: &Path, offset: usize) -> usize {
        let view = self.view_for(path);
        self.loaded.insert(view);
        self.cursors.insert(view, offset);
        self.active = Some(view);
        view
    }

    /// Treat the view showing `path` as still loading
    pub fn mark_unloaded(&mut self, path: &Path) {
        if let Some(view) = self.find_view(path) {
            self.loaded.remove(&view);
        }
    }

    /// Files opened through [`EditorHost::open_file`], in order
    pub fn opened(&self) -> &[PathBuf] {
        &self.opened
    }

    /// `(view, offset)` for every cursor move, in order
    pub fn cursor_moves(&self) -> &[(usize, usize)] {
        &self.cursor_moves
    }

    pub fn path_of(&self, view: usize) -> Option<&Path> {
        self.views.get(view).map(PathBuf::as_path)
    }

    fn find_view(&self, path: &Path) -> Option<usize> {
        self.views.iter().position(|p| p == path)
    }

    fn view_for(&mut self, path: &Path) -> usize {
        match self.find_view(path) {
            Some(view) => view,
            None => {
                self.views.push(path.to_path_buf());
                self.views.len() - 1
            }
        }
    }
}

impl EditorHost for FsHost {
    type View = usize;

    fn project_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }

    fn active_file_path(&self) -> Option<PathBuf> {
        self.active.and_then(|v| self.views.get(v).cloned())
    }

    fn active_view(&self) -> Option<usize> {
        self.active
    }

    fn buffer_text(&self, view: &usize) -> String {
        let Some(path) = self.views.get(*view) else {
            return String::new();
        };
        fs::read_to_string(path).unwrap_or_else(|err| {
            log::warn!("Failed to read {}: {}", path.display(), err);
            String::new()
        })
    }

    fn cursor_offset(&self, view: &usize) -> usize {
        self.cursors.get(view).copied().unwrap_or(0)
    }

    fn is_file_open(&self, path: &Path) -> bool {
        self.find_view(path)
            .is_some_and(|view| self.loaded.contains(&view))
    }

    fn open_file(&mut self, path: &Path) -> usize {
        self.opened.push(path.to_path_buf());
        let view = self.view_for(path);
        self.loaded.insert(view);
        view
    }

    fn set_cursor(&mut self, view: &usize, offset: usize) {
        self.cursors.insert(*view, offset);
        self.cursor_moves.push((*view, offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_root_from_nested_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("app/models/billing")).unwrap();
        fs::write(dir.path().join("Gemfile"), "").unwrap();
        let file = dir.path().join("app/models/billing/invoice.rb");
        assert_eq!(discover_project_root(&file).as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_discover_root_ignores_file_named_app() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("lib/tools");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("app"), "").unwrap();
        fs::create_dir_all(dir.path().join("test")).unwrap();
        let file = nested.join("runner.rb");
        assert_eq!(discover_project_root(&file).as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_open_file_is_loaded_and_recorded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.rb");
        fs::write(&path, "def a\nend\n").unwrap();
        let mut host = FsHost::new(dir.path());

        assert!(!host.is_file_open(&path));
        let view = host.open_file(&path);
        assert!(host.is_file_open(&path));
        assert_eq!(host.opened(), &[path.clone()]);
        assert_eq!(host.buffer_text(&view), "def a\nend\n");
        assert_eq!(host.open_file(&path), view);

        host.mark_unloaded(&path);
        assert!(!host.is_file_open(&path));
    }

    #[test]
    fn test_activate_sets_cursor() {
        let mut host = FsHost::without_root();
        let view = host.activate(Path::new("/nowhere/x.rb"), 7);
        assert_eq!(host.active_view(), Some(view));
        assert_eq!(host.cursor_offset(&view), 7);
        assert_eq!(host.buffer_text(&view), "");
        assert!(host.opened().is_empty());
        assert_eq!(host.project_root(), None);
    }
}

//
// orchestrator/host.rs
//
// What the orchestrator needs from the editor hosting it
//

use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// Editor operations used by the toggle and run commands.
///
/// Offsets are byte offsets into the buffer text.
pub trait EditorHost {
    /// Handle to an editor view; compared by identity
    type View: Clone + Eq + Hash + Debug;

    /// First workspace folder, if any
    fn project_root(&self) -> Option<PathBuf>;

    fn active_file_path(&self) -> Option<PathBuf>;

    fn active_view(&self) -> Option<Self::View>;

    fn buffer_text(&self, view: &Self::View) -> String;

    fn cursor_offset(&self, view: &Self::View) -> usize;

    /// Whether `path` is already loaded in some view
    fn is_file_open(&self, path: &Path) -> bool;

    /// Open (or focus) `path`. A file that was not already open finishes
    /// loading later; the host reports that through
    /// [`Orchestrator::buffer_loaded`](super::Orchestrator::buffer_loaded).
    fn open_file(&mut self, path: &Path) -> Self::View;

    /// Move the cursor and scroll it into view
    fn set_cursor(&mut self, view: &Self::View, offset: usize);
}

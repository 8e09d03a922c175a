//
// orchestrator/mod.rs
//
// The toggle and run commands
//
// Toggle opens the partner of the active file and tries to put the cursor on
// the method that corresponds to the one under the cursor now. When the
// partner is already open that happens immediately; otherwise it waits in
// `PendingCursors` until the host calls `buffer_loaded` for the new view.
//
// Run picks the test file for the active file (itself, or its partner),
// optionally narrows to the test method near the cursor, and launches the
// external runner.
//

pub mod host;
pub mod pending;

pub use host::*;
pub use pending::*;

use anyhow::Result;
use std::hash::Hash;
use std::path::PathBuf;

use crate::method_locator::{MethodLocation, MethodLocator};
use crate::pairing::{FileKind, PartnerResolver, ResolveError};
use crate::runner::{ProcessLauncher, RunTarget, RunnerInvocation};
use crate::settings::ProjectSettings;

/// What happened to the cursor after a toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    /// Moved onto the counterpart method
    Moved(MethodLocation),
    /// Waiting for the partner buffer to load
    Deferred,
    /// The partner has no counterpart method
    NotFound,
    /// No method near the cursor to begin with
    NoMethod,
}

/// Result of a toggle that opened a partner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleAction<V> {
    pub partner: PathBuf,
    pub view: V,
    /// Method under the cursor in the file toggled away from
    pub method: Option<String>,
    pub cursor: CursorState,
}

/// Toggle and run, over any editor host
pub struct Orchestrator<V: Clone + Eq + Hash, L: ProcessLauncher> {
    resolver: PartnerResolver,
    locator: MethodLocator,
    settings: ProjectSettings,
    pending: PendingCursors<V>,
    launcher: L,
}

impl<V: Clone + Eq + Hash + std::fmt::Debug, L: ProcessLauncher> Orchestrator<V, L> {
    pub fn new(settings: ProjectSettings, launcher: L) -> Self {
        let resolver = PartnerResolver::new(settings.resolver.clone());
        let locator = MethodLocator::new(&settings.resolver.test_method_prefix);
        Self {
            resolver,
            locator,
            settings,
            pending: PendingCursors::new(),
            launcher,
        }
    }

    pub fn resolver(&self) -> &PartnerResolver {
        &self.resolver
    }

    pub fn locator(&self) -> &MethodLocator {
        &self.locator
    }

    pub fn pending(&self) -> &PendingCursors<V> {
        &self.pending
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Open the partner of the active file. `None` means there was nothing to do.
    pub fn toggle<H>(&mut self, host: &mut H) -> Option<ToggleAction<V>>
    where
        H: EditorHost<View = V>,
    {
        match self.try_toggle(host) {
            Ok(action) => Some(action),
            Err(reason) => {
                log::info!("Toggle: nothing to do ({})", reason);
                None
            }
        }
    }

    fn try_toggle<H>(&mut self, host: &mut H) -> Result<ToggleAction<V>, ResolveError>
    where
        H: EditorHost<View = V>,
    {
        let root = project_root(host)?;
        let path = host.active_file_path().ok_or(ResolveError::NoActiveFile)?;
        let resolution = self.resolver.resolve(&path, &root)?;
        let was_test_file = resolution.classification.kind.is_test();

        let method = host.active_view().and_then(|view| {
            let text = host.buffer_text(&view);
            self.locator
                .locate_nearest(&text, host.cursor_offset(&view), false)
        });

        let partner = resolution.partner().to_path_buf();
        let already_open = host.is_file_open(&partner);
        let view = host.open_file(&partner);
        log::info!(
            "Toggle: '{}' -> '{}'{}",
            path.display(),
            partner.display(),
            if already_open { "" } else { " (loading)" }
        );

        let cursor = match &method {
            None => CursorState::NoMethod,
            Some(name) if already_open => self.relocate(host, &view, name, was_test_file),
            Some(name) => {
                self.pending.insert(PendingCursor {
                    view: view.clone(),
                    method: name.clone(),
                    was_test_file,
                });
                CursorState::Deferred
            }
        };

        Ok(ToggleAction {
            partner,
            view,
            method,
            cursor,
        })
    }

    /// The host finished loading `view`. Performs the cursor move waiting on
    /// it, if any; the move is discarded afterwards whether or not the method
    /// was found.
    pub fn buffer_loaded<H>(&mut self, host: &mut H, view: &V) -> Option<CursorState>
    where
        H: EditorHost<View = V>,
    {
        let pending = self.pending.take(view)?;
        Some(self.relocate(host, &pending.view, &pending.method, pending.was_test_file))
    }

    fn relocate<H>(&self, host: &mut H, view: &V, method: &str, was_test_file: bool) -> CursorState
    where
        H: EditorHost<View = V>,
    {
        let Some(target) = self
            .resolver
            .matcher()
            .counterpart_method(method, was_test_file)
        else {
            log::debug!("'{}' has no counterpart method", method);
            return CursorState::NotFound;
        };

        let text = host.buffer_text(view);
        match self.locator.find_definition(&text, &target) {
            Some(location) => {
                log::debug!("Moving cursor to '{}' on line {}", target, location.line + 1);
                host.set_cursor(view, location.offset);
                CursorState::Moved(location)
            }
            None => {
                log::debug!("No definition of '{}' in partner", target);
                CursorState::NotFound
            }
        }
    }

    /// Run the tests for the active file.
    ///
    /// With `run_all`, the whole test file runs; otherwise the test method
    /// nearest the cursor does, when there is one. `Ok(None)` means there was
    /// nothing to run.
    pub fn run<H>(&mut self, host: &mut H, run_all: bool) -> Result<Option<RunnerInvocation>>
    where
        H: EditorHost<View = V>,
    {
        let (root, test_file, kind, method) = match self.prepare_run(host, run_all) {
            Ok(prepared) => prepared,
            Err(reason) => {
                log::info!("Run: nothing to do ({})", reason);
                return Ok(None);
            }
        };

        let target = match (method, kind) {
            (Some(name), _) => RunTarget::Method(name),
            (None, FileKind::GroupedTestFile) => RunTarget::Group,
            (None, _) => RunTarget::File,
        };
        let invocation = RunnerInvocation::build(&self.settings, &root, &test_file, &target);
        self.launcher.launch(&invocation)?;
        Ok(Some(invocation))
    }

    fn prepare_run<H>(
        &self,
        host: &mut H,
        run_all: bool,
    ) -> Result<(PathBuf, PathBuf, FileKind, Option<String>), ResolveError>
    where
        H: EditorHost<View = V>,
    {
        let root = project_root(host)?;
        let path = host.active_file_path().ok_or(ResolveError::NoActiveFile)?;
        let (test_file, kind) = self.resolver.test_file_for(&path, &root)?;
        let active_is_test = test_file == path;

        let active = host.active_view();
        let test_view = if active_is_test {
            active.clone()
        } else {
            Some(host.open_file(&test_file))
        };

        let method = if run_all {
            None
        } else {
            active.and_then(|view| {
                let text = host.buffer_text(&view);
                let cursor = host.cursor_offset(&view);
                if active_is_test {
                    self.locator.locate_nearest(&text, cursor, true)
                } else {
                    // The counterpart only counts if the test file defines it
                    let name = self
                        .locator
                        .locate_nearest(&text, cursor, false)
                        .and_then(|name| self.resolver.matcher().counterpart_method(&name, false))?;
                    let test_text = host.buffer_text(test_view.as_ref()?);
                    if self.locator.find_definition(&test_text, &name).is_some() {
                        Some(name)
                    } else {
                        log::debug!("Run: '{}' is not defined in '{}'", name, test_file.display());
                        None
                    }
                }
            })
        };
        if method.is_none() {
            log::debug!("Run: no test method near the cursor, running the whole file");
        }

        Ok((root, test_file, kind, method))
    }
}

fn project_root<H: EditorHost>(host: &H) -> Result<PathBuf, ResolveError> {
    host.project_root()
        .filter(|root| !root.as_os_str().is_empty())
        .ok_or(ResolveError::NoProjectRoot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{relative_test_path as relative_path, GROUP_MARKER};
    use crate::cli::FsHost;
    use crate::test_utils::recording::RecordingLauncher;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const INVOICE_SOURCE: &str = "\
class Invoice
  def total
    10
  end

  def tax
    1
  end
end
";

    const INVOICE_TEST: &str = "\
class InvoiceTest < ActiveSupport::TestCase
  def test_total
    assert_equal 10, Invoice.new.total
  end

  def test_tax
    assert_equal 1, Invoice.new.tax
  end
end
";

    fn write(root: &Path, rel: &str, text: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn project() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let source = write(dir.path(), "app/models/invoice.rb", INVOICE_SOURCE);
        let test = write(dir.path(), "test/unit/invoice_test.rb", INVOICE_TEST);
        (dir, source, test)
    }

    fn orchestrator(root: &Path) -> Orchestrator<usize, RecordingLauncher> {
        let settings = ProjectSettings {
            base_dir: root.to_path_buf(),
            ..ProjectSettings::default()
        };
        Orchestrator::new(settings, RecordingLauncher::default())
    }

    fn offset_of(text: &str, needle: &str) -> usize {
        text.find(needle).unwrap()
    }

    #[test]
    fn test_toggle_opens_partner_and_defers_cursor() {
        let (dir, source, test) = project();
        let mut host = FsHost::new(dir.path());
        host.activate(&source, offset_of(INVOICE_SOURCE, "    1\n"));
        let mut orch = orchestrator(dir.path());

        let action = orch.toggle(&mut host).unwrap();
        assert_eq!(action.partner, test);
        assert_eq!(action.method.as_deref(), Some("tax"));
        assert_eq!(action.cursor, CursorState::Deferred);
        assert_eq!(orch.pending().len(), 1);
        assert!(host.cursor_moves().is_empty());

        // Loading some other view does nothing
        assert_eq!(orch.buffer_loaded(&mut host, &(action.view + 100)), None);
        assert_eq!(orch.pending().len(), 1);

        let state = orch.buffer_loaded(&mut host, &action.view).unwrap();
        let expected = offset_of(INVOICE_TEST, "def test_tax");
        assert!(matches!(state, CursorState::Moved(ref loc) if loc.offset == expected));
        assert_eq!(host.cursor_moves(), &[(action.view, expected)]);

        // Exactly once
        assert_eq!(orch.buffer_loaded(&mut host, &action.view), None);
        assert!(orch.pending().is_empty());
    }

    #[test]
    fn test_toggle_into_open_file_moves_now() {
        let (dir, source, test) = project();
        let mut host = FsHost::new(dir.path());
        let test_view = host.open_file(&test);
        host.activate(&source, offset_of(INVOICE_SOURCE, "    10"));
        let mut orch = orchestrator(dir.path());

        let action = orch.toggle(&mut host).unwrap();
        assert_eq!(action.view, test_view);
        let expected = offset_of(INVOICE_TEST, "def test_total");
        assert!(matches!(action.cursor, CursorState::Moved(ref loc) if loc.offset == expected));
        assert!(orch.pending().is_empty());
    }

    #[test]
    fn test_toggle_from_test_strips_prefix() {
        let (dir, source, test) = project();
        let mut host = FsHost::new(dir.path());
        host.open_file(&source);
        host.activate(&test, offset_of(INVOICE_TEST, "assert_equal 1,"));
        let mut orch = orchestrator(dir.path());

        let action = orch.toggle(&mut host).unwrap();
        assert_eq!(action.partner, source);
        assert_eq!(action.method.as_deref(), Some("test_tax"));
        let expected = offset_of(INVOICE_SOURCE, "def tax");
        assert!(matches!(action.cursor, CursorState::Moved(ref loc) if loc.offset == expected));
    }

    #[test]
    fn test_pending_cleared_when_method_missing() {
        let (dir, source, _test) = project();
        let text = "class Invoice\n  def discount\n  end\nend\n";
        fs::write(&source, text).unwrap();
        let mut host = FsHost::new(dir.path());
        host.activate(&source, text.len());
        let mut orch = orchestrator(dir.path());

        let action = orch.toggle(&mut host).unwrap();
        assert_eq!(action.cursor, CursorState::Deferred);
        assert_eq!(
            orch.buffer_loaded(&mut host, &action.view),
            Some(CursorState::NotFound)
        );
        assert!(orch.pending().is_empty());
        assert!(host.cursor_moves().is_empty());
    }

    #[test]
    fn test_second_toggle_supersedes_pending() {
        let (dir, source, _test) = project();
        let mut host = FsHost::new(dir.path());
        let mut orch = orchestrator(dir.path());

        host.activate(&source, offset_of(INVOICE_SOURCE, "    10"));
        let first = orch.toggle(&mut host).unwrap();
        // The test view exists but has not reported loaded yet
        host.mark_unloaded(&first.partner);
        host.activate(&source, offset_of(INVOICE_SOURCE, "    1\n"));
        let second = orch.toggle(&mut host).unwrap();

        assert_eq!(first.view, second.view);
        assert_eq!(orch.pending().len(), 1);
        let state = orch.buffer_loaded(&mut host, &second.view).unwrap();
        let expected = offset_of(INVOICE_TEST, "def test_tax");
        assert!(matches!(state, CursorState::Moved(ref loc) if loc.offset == expected));
    }

    #[test]
    fn test_toggle_no_project_root() {
        let (dir, source, _test) = project();
        let mut host = FsHost::without_root();
        host.activate(&source, 0);
        let mut orch = orchestrator(dir.path());
        assert!(orch.toggle(&mut host).is_none());
        assert!(host.opened().is_empty());
    }

    #[test]
    fn test_toggle_unsupported_file() {
        let dir = TempDir::new().unwrap();
        let view = write(dir.path(), "app/views/invoices/index.html.erb", "<h1></h1>");
        let mut host = FsHost::new(dir.path());
        host.activate(&view, 0);
        let mut orch = orchestrator(dir.path());
        assert!(orch.toggle(&mut host).is_none());
    }

    #[test]
    fn test_toggle_partner_missing() {
        let dir = TempDir::new().unwrap();
        let orphan = write(dir.path(), "app/models/orphan.rb", "class Orphan\nend\n");
        let mut host = FsHost::new(dir.path());
        host.activate(&orphan, 0);
        let mut orch = orchestrator(dir.path());
        assert!(orch.toggle(&mut host).is_none());
        assert!(host.opened().is_empty());
    }

    #[test]
    fn test_run_from_test_file_with_method() {
        let (dir, _source, test) = project();
        let mut host = FsHost::new(dir.path());
        host.activate(&test, offset_of(INVOICE_TEST, "assert_equal 10"));
        let mut orch = orchestrator(dir.path());

        let inv = orch.run(&mut host, false).unwrap().unwrap();
        assert_eq!(
            inv.args[1..].to_vec(),
            vec![
                crate::settings::RunnerSettings::default().rvm_initialization_script,
                dir.path().display().to_string(),
                "test/unit/invoice_test.rb".to_string(),
                "test_total".to_string(),
            ]
        );
        assert_eq!(orch.launcher().launched().len(), 1);
        // Already the active file, so nothing new is opened
        assert!(host.opened().is_empty());
        assert_eq!(inv.args[3], relative_path(dir.path(), &test));
    }

    #[test]
    fn test_run_from_source_maps_method_and_opens_test() {
        let (dir, source, test) = project();
        let mut host = FsHost::new(dir.path());
        host.activate(&source, offset_of(INVOICE_SOURCE, "    1\n"));
        let mut orch = orchestrator(dir.path());

        let inv = orch.run(&mut host, false).unwrap().unwrap();
        assert_eq!(inv.args.last().map(String::as_str), Some("test_tax"));
        assert!(host.opened().contains(&test));
    }

    #[test]
    fn test_run_all_skips_method() {
        let (dir, _source, test) = project();
        let mut host = FsHost::new(dir.path());
        host.activate(&test, offset_of(INVOICE_TEST, "assert_equal 10"));
        let mut orch = orchestrator(dir.path());

        let inv = orch.run(&mut host, true).unwrap().unwrap();
        assert_eq!(inv.args.last().map(String::as_str), Some("test/unit/invoice_test.rb"));
    }

    #[test]
    fn test_run_grouped_without_method_adds_marker() {
        let dir = TempDir::new().unwrap();
        let grouped = write(
            dir.path(),
            "test/unit/company/roles_tests.rb",
            "class Company::RolesTest < ActiveSupport::TestCase\nend\n",
        );
        let mut host = FsHost::new(dir.path());
        host.activate(&grouped, 0);
        let mut orch = orchestrator(dir.path());

        let inv = orch.run(&mut host, false).unwrap().unwrap();
        assert_eq!(inv.args[3], "test/unit/company/roles_tests.rb");
        assert_eq!(inv.args.last().map(String::as_str), Some(GROUP_MARKER));
    }

    #[test]
    fn test_run_source_without_test_is_noop() {
        let dir = TempDir::new().unwrap();
        let orphan = write(dir.path(), "app/models/orphan.rb", "class Orphan\nend\n");
        let mut host = FsHost::new(dir.path());
        host.activate(&orphan, 0);
        let mut orch = orchestrator(dir.path());

        assert_eq!(orch.run(&mut host, false).unwrap(), None);
        assert!(orch.launcher().launched().is_empty());
    }

    #[test]
    fn test_run_from_source_without_counterpart_runs_whole_file() {
        let (dir, source, test) = project();
        let text = "class Invoice\n  def total\n    10\n  end\n\n  def helper\n    2\n  end\nend\n";
        fs::write(&source, text).unwrap();
        let mut host = FsHost::new(dir.path());
        host.activate(&source, offset_of(text, "    2"));
        let mut orch = orchestrator(dir.path());

        let inv = orch.run(&mut host, false).unwrap().unwrap();
        assert_eq!(inv.args.len(), 4);
        assert_eq!(inv.args[3], relative_path(dir.path(), &test));
        assert_eq!(orch.launcher().launched(), &[inv]);
    }

    #[test]
    fn test_run_from_source_without_counterpart_runs_group() {
        let dir = TempDir::new().unwrap();
        let source = write(
            dir.path(),
            "app/models/company.rb",
            "class Company\n  def helper\n  end\nend\n",
        );
        write(
            dir.path(),
            "test/unit/company/roles_tests.rb",
            "class Company::RolesTest < ActiveSupport::TestCase\n  def test_roles\n  end\nend\n",
        );
        let mut host = FsHost::new(dir.path());
        host.activate(&source, offset_of("class Company\n  def helper\n", "  end"));
        let mut orch = orchestrator(dir.path());

        let inv = orch.run(&mut host, false).unwrap().unwrap();
        assert_eq!(inv.args[3], "test/unit/company/roles_tests.rb");
        assert_eq!(inv.args.last().map(String::as_str), Some(GROUP_MARKER));
    }

    #[test]
    fn test_no_active_file_is_noop() {
        let (dir, _source, _test) = project();
        let mut host = FsHost::new(dir.path());
        let mut orch = orchestrator(dir.path());

        assert!(orch.toggle(&mut host).is_none());
        assert_eq!(orch.run(&mut host, false).unwrap(), None);
        assert!(host.opened().is_empty());
        assert!(orch.launcher().launched().is_empty());
        assert!(orch.pending().is_empty());
    }

    #[test]
    fn test_run_launch_failure_is_an_error() {
        let (dir, _source, test) = project();
        let mut host = FsHost::new(dir.path());
        host.activate(&test, 0);
        let settings = ProjectSettings {
            base_dir: dir.path().to_path_buf(),
            ..ProjectSettings::default()
        };
        let mut orch: Orchestrator<usize, RecordingLauncher> =
            Orchestrator::new(settings, RecordingLauncher::failing());
        assert!(orch.run(&mut host, false).is_err());
    }
}

// runner.rs - Launching the external test runner
//
// Tests run in a terminal driven by an automation script. We only build the
// argument list and start the process; nothing waits for it or reads its
// output.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::settings::ProjectSettings;

/// Extra argument asking the script to run every test in a grouped test file
pub const GROUP_MARKER: &str = "--group";

/// What to run within the test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    /// Every test in the file
    File,
    /// One test method
    Method(String),
    /// Every test in a grouped test file
    Group,
}

/// A fully specified runner process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl RunnerInvocation {
    /// `[script, shell init, project root, relative test path, (method | group marker)?]`
    pub fn build(
        settings: &ProjectSettings,
        project_root: &Path,
        test_file: &Path,
        target: &RunTarget,
    ) -> Self {
        let mut args = vec![
            settings.script_path().display().to_string(),
            settings.runner.rvm_initialization_script.clone(),
            project_root.display().to_string(),
            relative_test_path(project_root, test_file),
        ];
        match target {
            RunTarget::File => {}
            RunTarget::Method(name) => args.push(name.clone()),
            RunTarget::Group => args.push(GROUP_MARKER.to_string()),
        }
        Self {
            program: settings.runner.osascript_path.clone(),
            args,
        }
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// `test_file` relative to `project_root`, `/`-separated; unchanged if it lies elsewhere
pub fn relative_test_path(project_root: &Path, test_file: &Path) -> String {
    match test_file.strip_prefix(project_root) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => test_file.display().to_string(),
    }
}

/// Starts runner processes
pub trait ProcessLauncher {
    fn launch(&mut self, invocation: &RunnerInvocation) -> Result<()>;
}

/// Spawns the runner detached from our stdio and never waits on it
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedLauncher;

impl ProcessLauncher for DetachedLauncher {
    fn launch(&mut self, invocation: &RunnerInvocation) -> Result<()> {
        log::info!("Launching test runner: {:?}", invocation.argv());
        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start '{}'", invocation.program))?;
        log::debug!("Test runner started with pid {}", child.id());
        Ok(())
    }
}

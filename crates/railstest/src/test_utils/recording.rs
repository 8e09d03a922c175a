//! Process launcher that records runner invocations instead of starting them.

use anyhow::{anyhow, Result};

use crate::runner::{ProcessLauncher, RunnerInvocation};

#[derive(Debug, Default)]
pub struct RecordingLauncher {
    launched: Vec<RunnerInvocation>,
    fail: bool,
}

impl RecordingLauncher {
    /// A launcher whose every launch fails
    pub fn failing() -> Self {
        Self {
            launched: Vec::new(),
            fail: true,
        }
    }

    pub fn launched(&self) -> &[RunnerInvocation] {
        &self.launched
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn launch(&mut self, invocation: &RunnerInvocation) -> Result<()> {
        if self.fail {
            return Err(anyhow!("failed to start '{}'", invocation.program));
        }
        self.launched.push(invocation.clone());
        Ok(())
    }
}

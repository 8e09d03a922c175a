// settings.rs - Runner settings stored in a project data file
//
// The project data file is a JSON object. Our settings live under the
// `rails_test_settings` key; any other keys belong to someone else and are
// written back untouched, in their original order. On load, missing settings
// are filled in from defaults (existing values always win) and the file is
// rewritten only if that changed anything.
//
// An optional `resolver` object overrides the pairing conventions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pairing::ResolverConfig;

/// Key of our settings object inside the project data file
pub const PROJECT_SETTINGS_KEY: &str = "rails_test_settings";

/// Key of the optional resolver overrides inside the project data file
pub const RESOLVER_SETTINGS_KEY: &str = "resolver";

/// Project data file name, relative to the project root
pub const DEFAULT_SETTINGS_FILE: &str = ".railstest.json";

const DEFAULT_RVM_INITIALIZATION: &str =
    r#"[[ -s "$HOME/.rvm/scripts/rvm" ]] && source "$HOME/.rvm/scripts/rvm"; rvm 1.9.3; ruby -v"#;

/// How the external test runner is launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Terminal application the script drives
    pub terminal: String,
    /// Interpreter for the terminal-automation script
    pub osascript_path: String,
    /// Shell snippet run before the tests to set up Ruby
    pub rvm_initialization_script: String,
    /// The terminal-automation script; relative paths are taken from the
    /// directory holding the project data file
    pub script_path: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            terminal: "Terminal".to_string(),
            osascript_path: "/usr/bin/osascript".to_string(),
            rvm_initialization_script: DEFAULT_RVM_INITIALIZATION.to_string(),
            script_path: "rails_test.applescript".to_string(),
        }
    }
}

/// Everything read from a project data file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSettings {
    pub runner: RunnerSettings,
    pub resolver: ResolverConfig,
    /// Directory relative runner paths are resolved against
    pub base_dir: PathBuf,
}

impl ProjectSettings {
    /// Absolute path of the terminal-automation script
    pub fn script_path(&self) -> PathBuf {
        let script = Path::new(&self.runner.script_path);
        if script.is_absolute() {
            script.to_path_buf()
        } else {
            self.base_dir.join(script)
        }
    }
}

/// Reads and maintains a project data file
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location inside `project_root`
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(DEFAULT_SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, filling and persisting any missing defaults first
    pub fn load(&self) -> Result<ProjectSettings> {
        let mut data = self.read_data()?;

        if merge_defaults(&mut data) {
            log::info!("Updated project settings in {}", self.path.display());
            self.write_data(&data)?;
        }

        let runner = match data.get(PROJECT_SETTINGS_KEY) {
            Some(value) => serde_json::from_value(value.clone()).with_context(|| {
                format!("invalid '{}' in {}", PROJECT_SETTINGS_KEY, self.path.display())
            })?,
            None => RunnerSettings::default(),
        };
        let resolver = match data.get(RESOLVER_SETTINGS_KEY) {
            Some(value) => serde_json::from_value(value.clone()).with_context(|| {
                format!("invalid '{}' in {}", RESOLVER_SETTINGS_KEY, self.path.display())
            })?,
            None => ResolverConfig::default(),
        };
        let base_dir = self
            .path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();

        Ok(ProjectSettings {
            runner,
            resolver,
            base_dir,
        })
    }

    fn read_data(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            log::debug!("No project data at {}, starting empty", self.path.display());
            return Ok(Map::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        match value {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!(
                "expected a JSON object in {}, found {}",
                self.path.display(),
                type_name(&other)
            ),
        }
    }

    fn write_data(&self, data: &Map<String, Value>) -> Result<()> {
        let mut text = serde_json::to_string_pretty(data)?;
        text.push('\n');
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// Fill in missing runner settings from defaults. Returns whether `data` changed.
pub fn merge_defaults(data: &mut Map<String, Value>) -> bool {
    let defaults = match serde_json::to_value(RunnerSettings::default()) {
        Ok(Value::Object(map)) => map,
        _ => return false,
    };

    match data.get_mut(PROJECT_SETTINGS_KEY) {
        Some(Value::Object(existing)) => {
            let mut changed = false;
            for (key, value) in defaults {
                if !existing.contains_key(&key) {
                    existing.insert(key, value);
                    changed = true;
                }
            }
            changed
        }
        Some(other) => {
            log::warn!(
                "'{}' is a {}, replacing it with defaults",
                PROJECT_SETTINGS_KEY,
                type_name(other)
            );
            *other = Value::Object(defaults);
            true
        }
        None => {
            data.insert(PROJECT_SETTINGS_KEY.to_string(), Value::Object(defaults));
            true
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//
// cli/mod.rs
//
// Command-line front end
//
//   railstest toggle   <file>  open the partner, report where the cursor lands
//   railstest run      <file>  launch the test runner for the file
//   railstest locate   <file>  print the method nearest the cursor
//   railstest classify <file>  print how the file is classified, as JSON
//
// The cursor is given with `--offset` (bytes) or `--line` (1-based).
//

pub mod fs_host;

pub use fs_host::*;

use anyhow::{Context, Result};
use serde_json::json;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::method_locator::{Direction, MethodLocator};
use crate::orchestrator::{CursorState, Orchestrator};
use crate::pairing::path_match::normalize_path;
use crate::pairing::PartnerResolver;
use crate::runner::{DetachedLauncher, ProcessLauncher, RunnerInvocation};
use crate::settings::{ProjectSettings, SettingsStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Run,
    Locate,
    Classify,
}

impl Command {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "toggle" => Some(Self::Toggle),
            "run" => Some(Self::Run),
            "locate" => Some(Self::Locate),
            "classify" => Some(Self::Classify),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    Offset(usize),
    /// 1-based
    Line(usize),
}

/// Parsed arguments for one subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub file: PathBuf,
    pub root: Option<PathBuf>,
    pub cursor: Option<CursorPosition>,
    pub settings: Option<PathBuf>,
    pub dry_run: bool,
    pub all: bool,
    pub test_only: bool,
}

fn parse_number(flag: &str, value: Option<String>) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("{} requires a number", flag))?;
    value
        .parse()
        .map_err(|_| format!("{} expects a non-negative number, got '{}'", flag, value))
}

fn parse_path(flag: &str, value: Option<String>) -> Result<PathBuf, String> {
    value
        .map(PathBuf::from)
        .ok_or_else(|| format!("{} requires a path", flag))
}

/// Parse `<command> <file> [options]`.
pub fn parse_args(command: &str, args: &mut impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let command =
        Command::from_name(command).ok_or_else(|| format!("Unknown command: '{}'", command))?;

    let mut file: Option<PathBuf> = None;
    let mut root = None;
    let mut cursor = None;
    let mut settings = None;
    let mut dry_run = false;
    let mut all = false;
    let mut test_only = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--root" => root = Some(parse_path("--root", args.next())?),
            "--settings" => settings = Some(parse_path("--settings", args.next())?),
            "--offset" => {
                cursor = Some(CursorPosition::Offset(parse_number("--offset", args.next())?))
            }
            "--line" => {
                let line = parse_number("--line", args.next())?;
                if line == 0 {
                    return Err("--line is 1-based".to_string());
                }
                cursor = Some(CursorPosition::Line(line));
            }
            "--dry-run" => dry_run = true,
            "--all" => all = true,
            "--test-only" => test_only = true,
            other if other.starts_with('-') => {
                return Err(format!("Unknown flag: '{}'", other));
            }
            _ => {
                if file.is_some() {
                    return Err("Multiple files provided; expected exactly one".to_string());
                }
                file = Some(PathBuf::from(arg));
            }
        }
    }

    let file = file.ok_or_else(|| "Missing required <file> argument".to_string())?;

    Ok(CliArgs {
        command,
        file,
        root,
        cursor,
        settings,
        dry_run,
        all,
        test_only,
    })
}

/// Launcher for `--dry-run`: starts nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunLauncher;

impl ProcessLauncher for DryRunLauncher {
    fn launch(&mut self, invocation: &RunnerInvocation) -> Result<()> {
        log::info!("Dry run, not launching: {}", shell_words(invocation));
        Ok(())
    }
}

/// The invocation as one line, single-quoting arguments that need it
pub fn shell_words(invocation: &RunnerInvocation) -> String {
    invocation
        .argv()
        .iter()
        .map(|arg| {
            let plain = !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "/._-=:,+@".contains(c));
            if plain {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Byte offset of the start of 1-based `line`, clamped to the end of `text`
pub fn line_start_offset(text: &str, line: usize) -> usize {
    if line <= 1 {
        return 0;
    }
    text.match_indices('\n')
        .nth(line - 2)
        .map(|(idx, _)| idx + 1)
        .unwrap_or(text.len())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .context("failed to read the current directory")?
            .join(path)
    };
    Ok(normalize_path(&joined).unwrap_or(joined))
}

/// Everything a command needs, with paths made absolute
struct Target {
    file: PathBuf,
    root: Option<PathBuf>,
    cursor: usize,
}

fn prepare(args: &CliArgs) -> Result<Target> {
    let file = absolute(&args.file)?;
    let root = match &args.root {
        Some(root) => Some(absolute(root)?),
        None => discover_project_root(&file),
    };
    if root.is_none() {
        log::info!("No project root found above {}", file.display());
    }

    let cursor = match args.cursor {
        None => 0,
        Some(CursorPosition::Offset(offset)) => offset,
        Some(CursorPosition::Line(line)) => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            line_start_offset(&text, line)
        }
    };

    Ok(Target { file, root, cursor })
}

fn host_for(ctx: &Target) -> FsHost {
    let mut host = match &ctx.root {
        Some(root) => FsHost::new(root),
        None => FsHost::without_root(),
    };
    host.activate(&ctx.file, ctx.cursor);
    host
}

fn load_settings(args: &CliArgs, root: Option<&Path>) -> Result<ProjectSettings> {
    let store = match (&args.settings, root) {
        (Some(path), _) => SettingsStore::new(absolute(path)?),
        (None, Some(root)) => SettingsStore::for_project(root),
        (None, None) => return Ok(ProjectSettings::default()),
    };
    store.load()
}

/// Run a parsed command, writing its report to `out`
pub fn run_command(args: &CliArgs, out: &mut impl Write) -> Result<()> {
    let ctx = prepare(args)?;
    match args.command {
        Command::Toggle => toggle(args, &ctx, out),
        Command::Run => run(args, &ctx, out),
        Command::Locate => locate(args, &ctx, out),
        Command::Classify => classify(args, &ctx, out),
    }
}

fn toggle(args: &CliArgs, ctx: &Target, out: &mut impl Write) -> Result<()> {
    let settings = load_settings(args, ctx.root.as_deref())?;
    let mut host = host_for(ctx);
    let mut orchestrator = Orchestrator::new(settings, DetachedLauncher);

    let Some(action) = orchestrator.toggle(&mut host) else {
        eprintln!("railstest: no partner for {}", ctx.file.display());
        return Ok(());
    };

    // Files open instantly here, so a deferred move can complete right away
    let cursor = match action.cursor {
        CursorState::Deferred => orchestrator
            .buffer_loaded(&mut host, &action.view)
            .unwrap_or(CursorState::NotFound),
        other => other,
    };

    match cursor {
        CursorState::Moved(location) => writeln!(
            out,
            "{}:{}: {}",
            action.partner.display(),
            location.line + 1,
            location.name
        )?,
        _ => writeln!(out, "{}", action.partner.display())?,
    }
    Ok(())
}

fn run(args: &CliArgs, ctx: &Target, out: &mut impl Write) -> Result<()> {
    let settings = load_settings(args, ctx.root.as_deref())?;
    let mut host = host_for(ctx);

    let invocation = if args.dry_run {
        let mut orchestrator = Orchestrator::new(settings, DryRunLauncher);
        orchestrator.run(&mut host, args.all)?
    } else {
        let mut orchestrator = Orchestrator::new(settings, DetachedLauncher);
        orchestrator.run(&mut host, args.all)?
    };

    match invocation {
        Some(invocation) => writeln!(out, "{}", shell_words(&invocation))?,
        None => eprintln!("railstest: nothing to run for {}", ctx.file.display()),
    }
    Ok(())
}

fn locate(args: &CliArgs, ctx: &Target, out: &mut impl Write) -> Result<()> {
    let settings = load_settings(args, ctx.root.as_deref())?;
    let text = fs::read_to_string(&ctx.file)
        .with_context(|| format!("failed to read {}", ctx.file.display()))?;
    let locator = MethodLocator::new(&settings.resolver.test_method_prefix);

    let found = locator
        .locate(&text, ctx.cursor, Direction::Backward, args.test_only)
        .or_else(|| locator.locate(&text, ctx.cursor, Direction::Forward, args.test_only));
    if let Some(location) = found {
        writeln!(out, "{}\t{}", location.name, location.line + 1)?;
    }
    Ok(())
}

fn classify(args: &CliArgs, ctx: &Target, out: &mut impl Write) -> Result<()> {
    let settings = load_settings(args, ctx.root.as_deref())?;
    let resolver = PartnerResolver::new(settings.resolver);
    let root = ctx.root.clone().unwrap_or_default();

    let classification = resolver.matcher().classify(&ctx.file, &root);
    let partner = resolver.resolve_partner(&ctx.file, &root);
    let report = json!({
        "file": ctx.file,
        "project_root": ctx.root,
        "supported": resolver.matcher().is_supported(&ctx.file),
        "classification": classification,
        "partner": partner,
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

//
// main.rs
//
// Entry point for the `railstest` command
//

use std::env;
use std::io;

use railstest::cli;

fn print_usage() {
    println!(
        "railstest {}, Rails source/test pairing and test runner.",
        env!("CARGO_PKG_VERSION")
    );
    print!(
        r#"
Usage: railstest <COMMAND> <FILE> [OPTIONS]

Commands:

toggle                       Open the partner of FILE and find the matching method
run                          Launch the tests for FILE
locate                       Print the method nearest the cursor in FILE
classify                     Print how FILE is classified, as JSON

Available options:

--root <DIR>                 Project root (default: nearest directory with app/, test/ or Gemfile)
--offset <N>                 Cursor byte offset
--line <N>                   Cursor line, 1-based
--settings <FILE>            Project data file (default: <root>/.railstest.json)
--dry-run                    Print the runner command instead of launching it
--all                        Run the whole test file, ignoring the cursor
--test-only                  locate: only consider test methods
--version                    Print the version
--help                       Print this help message

Set RUST_LOG=debug for diagnostics and RAILSTEST_PERF=1 for scan timings.

"#
    );
}

fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let Some(first) = argv.next() else {
        print_usage();
        return Ok(());
    };

    match first.as_str() {
        "--version" => {
            println!("railstest {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        "--help" => {
            print_usage();
            return Ok(());
        }
        _ => {}
    }

    env_logger::init();

    let args = cli::parse_args(&first, &mut argv).map_err(|msg| anyhow::anyhow!(msg))?;
    let stdout = io::stdout();
    cli::run_command(&args, &mut stdout.lock())
}

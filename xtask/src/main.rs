use std::fs;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgMatches, Command};

const BIN_NAME: &str = "projclone";
const SMOKE_DIR: &str = "target/xtask-smoke";

fn main() -> Result<()> {
    let args = clap::command!()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("install").about("Install the projclone binary locally"))
        .subcommand(
            Command::new("run")
                .about("Build and run projclone with arguments")
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .arg(
                    clap::Arg::new("args")
                        .help("Arguments to pass to projclone")
                        .action(clap::ArgAction::Append)
                        .num_args(0..),
                ),
        )
        .subcommand(
            Command::new("test")
                .about("Test Operations")
                .subcommand(Command::new("all").about("Run every test suite"))
                .subcommand(Command::new("core").about("Run tests for projclone-core"))
                .subcommand(Command::new("bin").about("Run tests for projclone-bin"))
                .subcommand(
                    Command::new("integration").about("Clone a fixture tree with the built binary"),
                ),
        )
        .get_matches();

    match args.subcommand() {
        Some(("install", _args)) => cargo(&["install", "--path", "crates/projclone-bin"], "install"),
        Some(("run", args)) => handle_run_command(args),
        Some(("test", args)) => handle_test_commands(args),
        Some((command, _)) => anyhow::bail!("Unexpected command: {command}"),
        None => anyhow::bail!("Expected subcommand"),
    }
}

fn handle_run_command(args: &ArgMatches) -> Result<()> {
    let mut cargo_args = vec!["run", "--bin", BIN_NAME, "--"];
    if let Some(values) = args.get_many::<String>("args") {
        cargo_args.extend(values.map(String::as_str));
    }
    cargo(&cargo_args, "run")
}

fn handle_test_commands(args: &ArgMatches) -> Result<()> {
    match args.subcommand() {
        Some(("all", _args)) => test_all(),
        Some(("core", _args)) => cargo(&["test", "--package", "projclone-core"], "core tests"),
        Some(("bin", _args)) => cargo(&["test", "--package", "projclone-bin"], "bin tests"),
        Some(("integration", _args)) => test_integration(),
        _ => {
            println!("Available test commands:");
            println!("  all          - Run every test suite");
            println!("  core         - Run tests for projclone-core");
            println!("  bin          - Run tests for projclone-bin");
            println!("  integration  - Clone a fixture tree with the built binary");
            Ok(())
        }
    }
}

fn test_all() -> Result<()> {
    let suites: [(&str, fn() -> Result<()>); 4] = [
        ("workspace", || cargo(&["test", "--workspace"], "workspace tests")),
        ("doc", || cargo(&["test", "--doc", "--package", "projclone-core"], "doc tests")),
        ("integration", test_integration),
        ("cli", || cargo(&["run", "--bin", BIN_NAME, "--", "--version"], "version check")),
    ];

    let mut failed = Vec::new();
    for (name, suite) in suites {
        println!("Running {name} suite...");
        match suite() {
            Ok(()) => println!("  {name}: ok\n"),
            Err(e) => {
                println!("  {name}: FAILED ({e:#})\n");
                failed.push(name);
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("Failed suites: {}", failed.join(", "));
    }
    println!("All suites passed.");
    Ok(())
}

fn test_integration() -> Result<()> {
    let root = Path::new(SMOKE_DIR);
    if root.exists() {
        fs::remove_dir_all(root).with_context(|| format!("Failed to clean {SMOKE_DIR}"))?;
    }
    let source = root.join("old_proj");
    let dest = root.join("out");
    fs::create_dir_all(source.join("old_proj_lib"))?;
    fs::write(source.join("README.md"), "# old_proj\n")?;
    fs::write(source.join("old_proj_lib").join("old_proj.rs"), "mod old_proj;\n")?;

    let source_arg = source.to_string_lossy().into_owned();
    let dest_arg = dest.to_string_lossy().into_owned();
    cargo(
        &[
            "run",
            "--bin",
            BIN_NAME,
            "--",
            source_arg.as_str(),
            dest_arg.as_str(),
            "old_proj",
            "new_proj",
            "--yes",
        ],
        "smoke clone",
    )?;

    let cloned = dest.join("new_proj").join("new_proj_lib").join("new_proj.rs");
    let contents = fs::read_to_string(&cloned)
        .with_context(|| format!("Expected cloned file at {}", cloned.display()))?;
    if contents != "mod new_proj;\n" {
        anyhow::bail!("Unexpected contents in {}: {contents:?}", cloned.display());
    }

    Ok(())
}

fn cargo(args: &[&str], what: &str) -> Result<()> {
    let status = process::Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {what} failed");
    }
    Ok(())
}

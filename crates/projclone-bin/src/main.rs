mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use inquire::Confirm;
use projclone_core::{
    EntryKind, LogLevel, LogSink, PlannedEntry, ReplacementPlan, RunStatistics, TracingSink,
};
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            e.print()?;
            process::exit(1);
        }
        Err(e) => e.exit(),
    };

    setup_logging(&cli)?;

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let source_dir = absolutize(&cli.source_dir)?;
    let dest_dir = absolutize(&cli.dest_dir)?;
    let source_names = projclone_core::parse_name_list(&cli.source_names);
    let dest_names = projclone_core::parse_name_list(&cli.dest_names);

    let log = TracingSink;
    projclone_core::validate_inputs(&source_dir, &dest_dir, &source_names, &dest_names, &log)?;

    let plan = ReplacementPlan::new(&source_names, &dest_names)?;
    log_plan(&plan, &log);

    let root = projclone_core::resolve_destination_root(&source_dir, &dest_dir, &plan);
    info!("Source directory: {:?}", source_dir);
    info!("Destination root: {:?}", root.path);

    if cli.preview {
        return print_preview(&source_dir, &dest_dir, &plan);
    }

    if root.path.exists() {
        if source_dir.starts_with(&root.path) || root.path.starts_with(&source_dir) {
            anyhow::bail!(
                "Destination '{}' overlaps the source directory and cannot be overwritten.",
                root.path.display()
            );
        }
        if !confirm_overwrite(&root.path, cli.yes)? {
            println!("Operation cancelled.");
            return Ok(());
        }
        warn!(
            "Destination directory '{}' already exists. Overwriting...",
            root.path.display()
        );
        fs::remove_dir_all(&root.path)
            .with_context(|| format!("Failed to remove {}", root.path.display()))?;
    }

    log.emit("Starting clone operation...", LogLevel::Normal);
    let mut progress = |unit: &str, current: usize, total: usize| {
        debug!(
            "Copied {} {}/{} ({:.0}%)",
            unit,
            current,
            total,
            current as f64 * 100.0 / total as f64
        );
    };
    let stats = projclone_core::copy_and_replace(
        &source_dir,
        &dest_dir,
        &plan,
        &log,
        Some(&mut progress as &mut dyn FnMut(&str, usize, usize)),
    )?;

    print_summary(&plan, &stats, &root.path);
    log.emit(
        &format!(
            "Operation completed successfully. New project location: {}",
            root.path.display()
        ),
        LogLevel::Success,
    );

    Ok(())
}

/// Empty arguments stay empty so validation reports them as missing.
fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Ok(PathBuf::new());
    }
    std::path::absolute(path).with_context(|| format!("Cannot resolve {:?}", path))
}

fn log_plan(plan: &ReplacementPlan, log: &impl LogSink) {
    log.emit("Replacement plan:", LogLevel::Info);
    for (i, pair) in plan.pairs().iter().enumerate() {
        log.emit(&format!("  {}. {}", i + 1, pair), LogLevel::Info);
    }
    if plan.len() > 1 {
        log.emit(
            "Note: Replacements are processed in order. Be careful with overlapping patterns.",
            LogLevel::Info,
        );
    }
}

fn confirm_overwrite(path: &Path, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    let overwrite = Confirm::new(&format!(
        "Destination '{}' already exists. Overwrite?",
        path.display()
    ))
    .with_default(false)
    .prompt()?;

    Ok(overwrite)
}

fn print_preview(source_dir: &Path, dest_dir: &Path, plan: &ReplacementPlan) -> Result<()> {
    let entries = projclone_core::preview_tree(source_dir, dest_dir, plan)?;
    print!("{}", render_preview(&entries));
    Ok(())
}

fn render_preview(entries: &[PlannedEntry]) -> String {
    let mut out = String::from("Clone preview:\n");
    for entry in entries {
        let kind = match entry.kind {
            EntryKind::Directory => "dir ",
            EntryKind::File => "file",
        };
        let marker = if entry.renamed { "*" } else { " " };
        let source = if entry.source.as_os_str().is_empty() {
            Path::new(".")
        } else {
            entry.source.as_path()
        };
        let _ = writeln!(
            out,
            "  {} {} {} -> {}",
            kind,
            marker,
            source.display(),
            entry.destination.display()
        );
    }

    let directories = entries
        .iter()
        .filter(|e| e.kind == EntryKind::Directory)
        .count();
    let _ = writeln!(out, "  Directories: {}", directories);
    let _ = writeln!(out, "  Files: {}", entries.len() - directories);
    out
}

fn print_summary(plan: &ReplacementPlan, stats: &RunStatistics, root: &Path) {
    println!("Clone complete!");
    println!("  Directories created: {}", stats.directories);
    println!("  Files copied: {}", stats.files);
    println!("  Directories renamed: {}", stats.directories_renamed);
    println!("  Files renamed: {}", stats.files_renamed);
    println!("  Names replaced: {}", stats.total_replacements());
    if plan.len() > 1 {
        for (pair, count) in plan.pairs().iter().zip(&stats.replacements) {
            println!("    {}: {}", pair, count);
        }
    }
    println!("  Location: {}", root.display());
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .with(filter)
        .init();

    Ok(())
}

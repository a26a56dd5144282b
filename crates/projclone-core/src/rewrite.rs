use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::log::{LogLevel, LogSink};
use crate::plan::ReplacementPlan;

/// Per-file verdict deciding whether contents are rewritten.
#[derive(Debug, PartialEq, Eq)]
pub enum FileClassification {
    /// Contains a NUL byte.
    Binary,
    NotUtf8,
    Text(String),
}

impl FileClassification {
    pub fn classify(bytes: Vec<u8>) -> Self {
        if bytes.contains(&0) {
            return FileClassification::Binary;
        }
        match String::from_utf8(bytes) {
            Ok(text) => FileClassification::Text(text),
            Err(_) => FileClassification::NotUtf8,
        }
    }
}

/// Rewrites a file in place with every pair of the plan.
///
/// Binary files, undecodable files and I/O failures are reported on the sink
/// at `Skipped` level and leave the file untouched. The file is only written
/// when at least one replacement happened. Returns one count per pair.
pub fn rewrite_file_content<S: LogSink + ?Sized>(
    file_path: &Path,
    plan: &ReplacementPlan,
    log: &S,
) -> Vec<usize> {
    match try_rewrite(file_path, plan, log) {
        Ok(counts) => counts,
        Err(e) => {
            debug!("I/O error rewriting {:?}: {}", file_path, e);
            log.emit(
                &format!("Skipped file (IO Error): {}", file_path.display()),
                LogLevel::Skipped,
            );
            vec![0; plan.len()]
        }
    }
}

fn try_rewrite<S: LogSink + ?Sized>(
    file_path: &Path,
    plan: &ReplacementPlan,
    log: &S,
) -> io::Result<Vec<usize>> {
    let content = match FileClassification::classify(fs::read(file_path)?) {
        FileClassification::Text(text) => text,
        FileClassification::Binary => {
            log.emit(
                &format!("Skipped file (likely binary): {}", file_path.display()),
                LogLevel::Skipped,
            );
            return Ok(vec![0; plan.len()]);
        }
        FileClassification::NotUtf8 => {
            log.emit(
                &format!("Skipped file (not UTF-8 decodable): {}", file_path.display()),
                LogLevel::Skipped,
            );
            return Ok(vec![0; plan.len()]);
        }
    };

    let (updated, counts) = plan.apply_counted(&content);
    let total: usize = counts.iter().sum();
    if total == 0 {
        return Ok(counts);
    }

    fs::write(file_path, updated)?;

    log.emit(
        &format!(
            "Updated contents of: {} ({} replacements)",
            normalize(file_path).display(),
            total
        ),
        LogLevel::Normal,
    );

    let breakdown: Vec<String> = plan
        .pairs()
        .iter()
        .zip(&counts)
        .filter(|(_, count)| **count > 0)
        .map(|(pair, count)| format!("'{}'→'{}':{}", pair.source(), pair.destination(), count))
        .collect();
    if breakdown.len() > 1 {
        log.emit(&format!("  Breakdown: {}", breakdown.join(", ")), LogLevel::Normal);
    }

    Ok(counts)
}

/// Lexically drops `.` segments and folds `..` into its parent.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

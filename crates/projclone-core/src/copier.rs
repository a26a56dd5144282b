use std::fs::{self, FileTimes, FileType};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::log::LogSink;
use crate::plan::ReplacementPlan;
use crate::resolve::resolve_destination_root;
use crate::rewrite::rewrite_file_content;
use crate::CloneError;

/// Unit name passed to progress callbacks for each copied file.
pub const PROGRESS_UNIT_FILE: &str = "file";

/// Totals accumulated over one clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub directories: usize,
    pub files: usize,
    pub directories_renamed: usize,
    pub files_renamed: usize,
    /// Content replacements per plan pair, in plan order.
    pub replacements: Vec<usize>,
}

impl RunStatistics {
    pub fn total_replacements(&self) -> usize {
        self.replacements.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeCounts {
    pub directories: usize,
    pub files: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One entry of a clone that has not happened yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub kind: EntryKind,
    /// Path relative to the source root.
    pub source: PathBuf,
    pub destination: PathBuf,
    pub renamed: bool,
}

/// Copies `source_dir` under its resolved destination root, renaming
/// directories and files and rewriting text contents with `plan`.
///
/// The walk is depth-first: each directory's files are copied before its
/// subdirectories are entered. A failed copy aborts the run, while content
/// rewrite failures only skip the affected file. When `progress` is given the
/// source is counted up front and the callback receives
/// `("file", copied, total)` after every copy.
pub fn copy_and_replace<S: LogSink + ?Sized>(
    source_dir: &Path,
    dest_dir: &Path,
    plan: &ReplacementPlan,
    log: &S,
    progress: Option<&mut dyn FnMut(&str, usize, usize)>,
) -> Result<RunStatistics, CloneError> {
    let root = resolve_destination_root(source_dir, dest_dir, plan);
    if root.path.starts_with(source_dir) {
        return Err(CloneError::DestinationInsideSource {
            source_dir: source_dir.to_path_buf(),
            destination: root.path,
        });
    }

    let total_files = if progress.is_some() {
        count_tree(source_dir)?.files
    } else {
        0
    };

    info!("Starting clone: {:?} -> {:?}", source_dir, root.path);

    fs::create_dir_all(&root.path).map_err(CloneError::io(&root.path))?;

    let mut walker = TreeWalker {
        source_root: source_dir,
        dest_root: &root.path,
        plan,
        log,
        progress,
        total_files,
        stats: RunStatistics {
            directories: 1,
            directories_renamed: root.renamed_count(),
            replacements: vec![0; plan.len()],
            ..RunStatistics::default()
        },
    };
    walker.visit_directory(source_dir)?;
    let stats = walker.stats;

    info!(
        "Clone complete: {} directories, {} files, {} directories renamed, {} files renamed, {} replacements",
        stats.directories,
        stats.files,
        stats.directories_renamed,
        stats.files_renamed,
        stats.total_replacements()
    );

    Ok(stats)
}

struct TreeWalker<'a, 'p, S: LogSink + ?Sized> {
    source_root: &'a Path,
    dest_root: &'a Path,
    plan: &'a ReplacementPlan,
    log: &'a S,
    progress: Option<&'p mut dyn FnMut(&str, usize, usize)>,
    total_files: usize,
    stats: RunStatistics,
}

impl<S: LogSink + ?Sized> TreeWalker<'_, '_, S> {
    fn visit_directory(&mut self, dir: &Path) -> Result<(), CloneError> {
        debug!("Processing directory: {:?}", dir);

        let dest_dir = self.destination_for(dir);
        if !dest_dir.exists() {
            fs::create_dir_all(&dest_dir).map_err(CloneError::io(&dest_dir))?;
            self.stats.directories += 1;
        }

        let (subdirs, files) = list_children(dir)?;

        // Every listed child directory is counted here, before it is walked.
        for subdir in &subdirs {
            if let Some(name) = subdir.file_name() {
                if self.plan.apply_os(name) != name {
                    self.stats.directories_renamed += 1;
                }
            }
        }

        for file in &files {
            self.copy_file(file, &dest_dir)?;
        }

        for subdir in &subdirs {
            self.visit_directory(subdir)?;
        }

        Ok(())
    }

    fn copy_file(&mut self, file: &Path, dest_dir: &Path) -> Result<(), CloneError> {
        let Some(name) = file.file_name() else {
            return Ok(());
        };
        let dest_name = self.plan.apply_os(name);
        let dest_file = dest_dir.join(&dest_name);
        debug!("Copying file: {:?} -> {:?}", file, dest_file);

        copy_with_metadata(file, &dest_file).map_err(|source| CloneError::Copy {
            from: file.to_path_buf(),
            to: dest_file.clone(),
            source,
        })?;

        self.stats.files += 1;
        if dest_name != name {
            self.stats.files_renamed += 1;
        }

        if self.total_files > 0 {
            if let Some(progress) = self.progress.as_deref_mut() {
                progress(PROGRESS_UNIT_FILE, self.stats.files, self.total_files);
            }
        }

        let counts = rewrite_file_content(&dest_file, self.plan, self.log);
        for (slot, count) in self.stats.replacements.iter_mut().zip(counts) {
            *slot += count;
        }

        Ok(())
    }

    fn destination_for(&self, dir: &Path) -> PathBuf {
        match dir.strip_prefix(self.source_root) {
            Ok(rel) if rel.as_os_str().is_empty() => self.dest_root.to_path_buf(),
            Ok(rel) => self.dest_root.join(rename_relative(self.plan, rel)),
            Err(_) => self.dest_root.to_path_buf(),
        }
    }
}

/// Counts directories (root included) and files below `source_dir` without
/// touching anything.
pub fn count_tree(source_dir: &Path) -> Result<TreeCounts, CloneError> {
    let mut counts = TreeCounts::default();
    for entry in WalkDir::new(source_dir).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            counts.directories += 1;
        } else if is_copyable_file(entry.path(), entry.file_type()) {
            counts.files += 1;
        }
    }
    Ok(counts)
}

/// Lists where every directory and file of `source_dir` would land, without
/// creating anything.
pub fn preview_tree(
    source_dir: &Path,
    dest_dir: &Path,
    plan: &ReplacementPlan,
) -> Result<Vec<PlannedEntry>, CloneError> {
    let root = resolve_destination_root(source_dir, dest_dir, plan);
    let mut entries = Vec::new();

    for entry in WalkDir::new(source_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(source_dir)
            .unwrap_or(entry.path())
            .to_path_buf();

        if entry.file_type().is_dir() {
            let (destination, renamed) = if entry.depth() == 0 {
                (root.path.clone(), root.renamed)
            } else {
                let name = entry.file_name();
                (
                    root.path.join(rename_relative(plan, &rel)),
                    plan.apply_os(name) != name,
                )
            };
            entries.push(PlannedEntry {
                kind: EntryKind::Directory,
                source: rel,
                destination,
                renamed,
            });
        } else if is_copyable_file(entry.path(), entry.file_type()) {
            let parent = rel.parent().unwrap_or(Path::new(""));
            let parent_dest = if parent.as_os_str().is_empty() {
                root.path.clone()
            } else {
                root.path.join(rename_relative(plan, parent))
            };
            let name = entry.file_name();
            let dest_name = plan.apply_os(name);
            entries.push(PlannedEntry {
                kind: EntryKind::File,
                renamed: dest_name != name,
                destination: parent_dest.join(dest_name),
                source: rel,
            });
        }
    }

    Ok(entries)
}

fn list_children(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), CloneError> {
    let mut entries = fs::read_dir(dir)
        .map_err(CloneError::io(dir))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(CloneError::io(dir))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(CloneError::io(&path))?;
        if file_type.is_dir() {
            subdirs.push(path);
        } else if is_copyable_file(&path, file_type) {
            files.push(path);
        } else {
            debug!("Skipping non-file entry: {:?}", path);
        }
    }
    Ok((subdirs, files))
}

/// Regular files, plus symlinks that resolve to one.
fn is_copyable_file(path: &Path, file_type: FileType) -> bool {
    file_type.is_file() || (file_type.is_symlink() && path.is_file())
}

/// A UTF-8 relative path is rewritten as one string. Otherwise each component
/// is renamed on its own and non-UTF-8 components are kept verbatim.
fn rename_relative(plan: &ReplacementPlan, rel: &Path) -> PathBuf {
    match rel.to_str() {
        Some(rel) => PathBuf::from(plan.apply(rel)),
        None => rel
            .components()
            .map(|component| plan.apply_os(component.as_os_str()))
            .collect(),
    }
}

/// Copies bytes and permissions, then carries over access and modification
/// times where the platform reports them.
fn copy_with_metadata(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;

    let metadata = fs::metadata(src)?;
    let mut times = FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Err(e) = fs::File::open(dst).and_then(|file| file.set_times(times)) {
        debug!("Could not preserve timestamps on {:?}: {}", dst, e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::testing::RecordingSink;
    use crate::log::LogLevel;
    use tempfile::TempDir;

    fn plan(sources: &[&str], destinations: &[&str]) -> ReplacementPlan {
        ReplacementPlan::new(sources, destinations).unwrap()
    }

    /// `old_proj/{file1.txt, sub_old/file2.txt}` under a fresh temp dir.
    fn sample_tree() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("old_proj");
        fs::create_dir_all(src.join("sub_old")).unwrap();
        fs::write(src.join("file1.txt"), "Content with old_proj.").unwrap();
        fs::write(src.join("sub_old").join("file2.txt"), "old_proj here").unwrap();
        (temp, src)
    }

    #[test]
    fn test_clone_into_parent_directory() {
        let (temp, src) = sample_tree();
        let dest = temp.path().join("dest");
        let log = RecordingSink::default();

        let stats =
            copy_and_replace(&src, &dest, &plan(&["old_proj"], &["new_proj"]), &log, None).unwrap();

        let root = dest.join("new_proj");
        assert_eq!(
            fs::read_to_string(root.join("file1.txt")).unwrap(),
            "Content with new_proj."
        );
        assert_eq!(
            fs::read_to_string(root.join("sub_old").join("file2.txt")).unwrap(),
            "new_proj here"
        );
        assert_eq!(
            stats,
            RunStatistics {
                directories: 2,
                files: 2,
                directories_renamed: 1,
                files_renamed: 0,
                replacements: vec![2],
            }
        );
    }

    #[test]
    fn test_renames_directories_and_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src_old_project");
        let nested = src.join("old_project_name_dir");
        fs::create_dir_all(&nested).unwrap();
        fs::write(src.join("old_project_name.cfg"), "name=old_project_name").unwrap();
        fs::write(nested.join("file2.txt"), "Another old_project_name file.").unwrap();
        let dest = temp.path().join("dst");
        let log = RecordingSink::default();

        let stats = copy_and_replace(
            &src,
            &dest,
            &plan(&["old_project_name"], &["new_project_name"]),
            &log,
            None,
        )
        .unwrap();

        let root = dest.join("src_old_project");
        assert!(root.join("new_project_name_dir").is_dir());
        assert_eq!(
            fs::read_to_string(root.join("new_project_name.cfg")).unwrap(),
            "name=new_project_name"
        );
        assert_eq!(
            fs::read_to_string(root.join("new_project_name_dir").join("file2.txt")).unwrap(),
            "Another new_project_name file."
        );
        assert_eq!(stats.directories, 2);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.directories_renamed, 1);
        assert_eq!(stats.files_renamed, 1);
        assert_eq!(stats.replacements, vec![2]);
    }

    #[test]
    fn test_destination_named_after_project() {
        let (temp, src) = sample_tree();
        let dest = temp.path().join("new_proj");
        let log = RecordingSink::default();

        copy_and_replace(&src, &dest, &plan(&["old_proj"], &["new_proj"]), &log, None).unwrap();

        assert!(dest.join("file1.txt").is_file());
        assert!(!dest.join("new_proj").exists());
    }

    #[test]
    fn test_progress_reports_every_file() {
        let (temp, src) = sample_tree();
        let dest = temp.path().join("dest");
        let log = RecordingSink::default();
        let mut ticks = Vec::new();
        let mut record = |unit: &str, current: usize, total: usize| {
            ticks.push((unit.to_string(), current, total));
        };
        let progress: &mut dyn FnMut(&str, usize, usize) = &mut record;

        copy_and_replace(
            &src,
            &dest,
            &plan(&["old_proj"], &["new_proj"]),
            &log,
            Some(progress),
        )
        .unwrap();

        assert_eq!(
            ticks,
            vec![("file".to_string(), 1, 2), ("file".to_string(), 2, 2)]
        );
    }

    #[test]
    fn test_binary_files_copied_verbatim() {
        let (temp, src) = sample_tree();
        let bytes = b"old_proj\x00\xffold_proj".to_vec();
        fs::write(src.join("image.bin"), &bytes).unwrap();
        let dest = temp.path().join("dest");
        let log = RecordingSink::default();

        let stats =
            copy_and_replace(&src, &dest, &plan(&["old_proj"], &["new_proj"]), &log, None).unwrap();

        assert_eq!(fs::read(dest.join("new_proj").join("image.bin")).unwrap(), bytes);
        assert_eq!(stats.files, 3);
        assert_eq!(stats.replacements, vec![2]);
    }

    #[test]
    fn test_nested_directory_rename_counted_per_listing() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("app");
        fs::create_dir_all(src.join("foo_a").join("foo_b")).unwrap();
        fs::write(src.join("foo_a").join("foo_b").join("x.txt"), "foo").unwrap();
        let dest = temp.path().join("out");
        let log = RecordingSink::default();

        let stats = copy_and_replace(&src, &dest, &plan(&["foo"], &["bar"]), &log, None).unwrap();

        assert!(dest.join("app").join("bar_a").join("bar_b").join("x.txt").is_file());
        assert_eq!(stats.directories, 3);
        assert_eq!(stats.directories_renamed, 2);
        assert_eq!(stats.replacements, vec![1]);
    }

    #[test]
    fn test_existing_destination_directories_not_counted() {
        let (temp, src) = sample_tree();
        let dest = temp.path().join("dest");
        fs::create_dir_all(dest.join("new_proj").join("sub_old")).unwrap();
        let log = RecordingSink::default();

        let stats =
            copy_and_replace(&src, &dest, &plan(&["old_proj"], &["new_proj"]), &log, None).unwrap();

        assert_eq!(stats.directories, 1);
    }

    #[test]
    fn test_rejects_destination_inside_source() {
        let (_temp, src) = sample_tree();
        let log = RecordingSink::default();

        let err = copy_and_replace(
            &src,
            &src.join("sub_old"),
            &plan(&["old_proj"], &["new_proj"]),
            &log,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, CloneError::DestinationInsideSource { .. }));
    }

    #[test]
    fn test_copy_failure_aborts_with_destination_path() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("old_proj");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "old_proj").unwrap();
        fs::write(src.join("b.txt"), "old_proj").unwrap();
        let dest = temp.path().join("dest");
        let blocked = dest.join("new_proj").join("a.txt");
        fs::create_dir_all(&blocked).unwrap();
        let log = RecordingSink::default();

        let err = copy_and_replace(&src, &dest, &plan(&["old_proj"], &["new_proj"]), &log, None)
            .unwrap_err();

        match err {
            CloneError::Copy { from, to, .. } => {
                assert_eq!(from, src.join("a.txt"));
                assert_eq!(to, blocked);
            }
            other => panic!("expected a copy error, got {other:?}"),
        }
        assert!(!dest.join("new_proj").join("b.txt").exists());
    }

    #[test]
    fn test_unwritable_copy_is_skipped_and_walk_continues() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("old_proj");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "old_proj").unwrap();
        fs::write(src.join("b.txt"), "old_proj").unwrap();
        let mut permissions = fs::metadata(src.join("a.txt")).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(src.join("a.txt"), permissions).unwrap();

        // Privileged users can write read-only files, so there is nothing to observe.
        if fs::OpenOptions::new().write(true).open(src.join("a.txt")).is_ok() {
            return;
        }

        let dest = temp.path().join("dest");
        let log = RecordingSink::default();

        let stats =
            copy_and_replace(&src, &dest, &plan(&["old_proj"], &["new_proj"]), &log, None).unwrap();

        let root = dest.join("new_proj");
        assert!(log.contains(
            &format!("Skipped file (IO Error): {}", root.join("a.txt").display()),
            LogLevel::Skipped
        ));
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "old_proj");
        assert_eq!(fs::read_to_string(root.join("b.txt")).unwrap(), "new_proj");
        assert_eq!(stats.files, 2);
        assert_eq!(stats.replacements, vec![1]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_directory_keeps_renaming_descendants() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("proj");
        let odd = OsStr::from_bytes(b"w\xe9");
        fs::create_dir_all(src.join(odd).join("old_dir")).unwrap();
        fs::write(src.join(odd).join("old_dir").join("f.txt"), "old").unwrap();
        let dest = temp.path().join("dest");
        let log = RecordingSink::default();

        let stats = copy_and_replace(&src, &dest, &plan(&["old"], &["new"]), &log, None).unwrap();

        let renamed = dest.join("proj").join(odd).join("new_dir");
        assert_eq!(fs::read_to_string(renamed.join("f.txt")).unwrap(), "new");
        assert!(!dest.join("proj").join(odd).join("old_dir").exists());
        assert_eq!(stats.directories_renamed, 1);
        assert_eq!(stats.directories, 3);

        let entries = preview_tree(&src, &dest, &plan(&["old"], &["new"])).unwrap();
        assert!(entries.iter().any(|e| e.destination == renamed && e.renamed));
    }

    #[test]
    fn test_count_tree() {
        let (_temp, src) = sample_tree();

        let counts = count_tree(&src).unwrap();

        assert_eq!(counts, TreeCounts { directories: 2, files: 2 });
    }

    #[test]
    fn test_preview_matches_clone() {
        let (temp, src) = sample_tree();
        fs::write(src.join("sub_old").join("old_proj.md"), "# old_proj").unwrap();
        let dest = temp.path().join("dest");
        let plan = plan(&["old_proj"], &["new_proj"]);

        let entries = preview_tree(&src, &dest, &plan).unwrap();

        let root = dest.join("new_proj");
        let destinations: Vec<_> = entries.iter().map(|e| e.destination.clone()).collect();
        assert_eq!(
            destinations,
            vec![
                root.clone(),
                root.join("file1.txt"),
                root.join("sub_old"),
                root.join("sub_old").join("file2.txt"),
                root.join("sub_old").join("new_proj.md"),
            ]
        );
        assert!(entries[0].renamed);
        assert!(entries[4].renamed);
        assert!(!dest.exists());
    }
}

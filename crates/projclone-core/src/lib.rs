use std::io;
use std::path::{Path, PathBuf};

pub mod copier;
pub mod log;
pub mod names;
pub mod plan;
pub mod resolve;
pub mod rewrite;
pub mod validate;

pub use copier::{
    copy_and_replace, count_tree, preview_tree, EntryKind, PlannedEntry, RunStatistics,
    TreeCounts, PROGRESS_UNIT_FILE,
};
pub use log::{LogLevel, LogSink, TracingSink};
pub use names::parse_name_list;
pub use plan::{PlanError, Replacement, ReplacementPlan};
pub use resolve::{resolve_destination_root, ResolvedRoot};
pub use rewrite::{rewrite_file_content, FileClassification};
pub use validate::{validate_inputs, ValidationError};

#[derive(thiserror::Error, Debug)]
pub enum CloneError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Destination '{}' lies inside source directory '{}'.", destination.display(), source_dir.display())]
    DestinationInsideSource {
        source_dir: PathBuf,
        destination: PathBuf,
    },
}

impl CloneError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> CloneError + '_ {
        move |source| CloneError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

use regex::{NoExpand, Regex};
use std::ffi::{OsStr, OsString};
use std::fmt;
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("Number of source names ({sources}) must match number of destination names ({destinations}).")]
    LengthMismatch { sources: usize, destinations: usize },
    #[error("Replacement pair #{index} has an empty name.")]
    EmptyToken { index: usize },
    #[error("Cannot build matcher for '{token}': {source}")]
    Pattern {
        token: String,
        #[source]
        source: regex::Error,
    },
}

/// A single literal `source -> destination` substitution.
#[derive(Debug, Clone)]
pub struct Replacement {
    source: String,
    destination: String,
    matcher: Regex,
}

impl Replacement {
    fn new(source: &str, destination: &str) -> Result<Self, PlanError> {
        // Names are literals, never patterns.
        let matcher = Regex::new(&regex::escape(source)).map_err(|e| PlanError::Pattern {
            token: source.to_string(),
            source: e,
        })?;

        Ok(Self {
            source: source.to_string(),
            destination: destination.to_string(),
            matcher,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.destination
    }

    /// Replaces every non-overlapping occurrence, returning the new text and
    /// the number of matches.
    fn replace_counted(&self, text: &str) -> (String, usize) {
        let count = self.matcher.find_iter(text).count();
        if count == 0 {
            return (text.to_string(), 0);
        }
        let replaced = self
            .matcher
            .replace_all(text, NoExpand(&self.destination))
            .into_owned();
        (replaced, count)
    }
}

impl fmt::Display for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' → '{}'", self.source, self.destination)
    }
}

/// Ordered list of replacements applied one after another.
///
/// Each pair runs on the output of the pair before it, so a token introduced
/// by an earlier pair can be matched by a later one.
#[derive(Debug, Clone)]
pub struct ReplacementPlan {
    pairs: Vec<Replacement>,
}

impl ReplacementPlan {
    pub fn new<S, D>(sources: &[S], destinations: &[D]) -> Result<Self, PlanError>
    where
        S: AsRef<str>,
        D: AsRef<str>,
    {
        if sources.len() != destinations.len() {
            return Err(PlanError::LengthMismatch {
                sources: sources.len(),
                destinations: destinations.len(),
            });
        }

        let pairs = sources
            .iter()
            .zip(destinations)
            .enumerate()
            .map(|(i, (source, destination))| {
                let (source, destination) = (source.as_ref(), destination.as_ref());
                if source.is_empty() || destination.is_empty() {
                    return Err(PlanError::EmptyToken { index: i + 1 });
                }
                Replacement::new(source, destination)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { pairs })
    }

    pub fn pairs(&self) -> &[Replacement] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Runs every pair in order over `text`.
    pub fn apply(&self, text: &str) -> String {
        self.apply_counted(text).0
    }

    /// Like [`apply`](Self::apply), also returning one match count per pair in
    /// plan order.
    pub fn apply_counted(&self, text: &str) -> (String, Vec<usize>) {
        self.pairs.iter().fold(
            (text.to_string(), Vec::with_capacity(self.pairs.len())),
            |(current, mut counts), pair| {
                let (next, count) = pair.replace_counted(&current);
                if count > 0 {
                    debug!("Replacement {}: {} occurrences", pair, count);
                }
                counts.push(count);
                (next, counts)
            },
        )
    }

    /// Applies the plan to an OS string. Names that are not valid UTF-8 are
    /// returned unchanged.
    pub fn apply_os(&self, name: &OsStr) -> OsString {
        match name.to_str() {
            Some(name) => self.apply(name).into(),
            None => name.to_os_string(),
        }
    }

    /// Returns the renamed form of a single path component, or `None` when no
    /// pair changes it.
    pub fn rename(&self, name: &str) -> Option<String> {
        let renamed = self.apply(name);
        if renamed != name {
            debug!("Name replacement: '{}' -> '{}'", name, renamed);
            Some(renamed)
        } else {
            None
        }
    }
}

//! Classifiers for short yes/no style model answers.
//!
//! Models are asked to open their answer with a keyword; these functions
//! look only at the opening characters, case-insensitively.

/// First `n` characters of `s`, lowercased.
fn lower_prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect::<String>().to_lowercase()
}

/// Whether a task can be acted on as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NeedsRefinement,
}

impl Readiness {
    /// `Ready` iff "ready" appears within the first 10 characters.
    pub fn classify(response: &str) -> Self {
        if lower_prefix(response, 10).contains("ready") {
            Readiness::Ready
        } else {
            Readiness::NeedsRefinement
        }
    }
}

/// Answer to "should the artifact be rewritten?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactVerdict {
    /// Leave the artifact as is.
    Keep,
    /// Replace the artifact with this text.
    Rewrite(String),
    /// Neither a clear yes nor a clear no; carries the raw response.
    Unrecognized(String),
}

impl ArtifactVerdict {
    /// `no...` keeps, `yes...` rewrites with the remainder after an optional
    /// `.` and an optional `Rewritten:` marker. A `yes` with nothing after it
    /// is treated as unrecognized rather than blanking the artifact.
    pub fn classify(response: &str) -> Self {
        if lower_prefix(response, 2) == "no" {
            return ArtifactVerdict::Keep;
        }
        if lower_prefix(response, 3) != "yes" {
            return ArtifactVerdict::Unrecognized(response.to_string());
        }

        let mut rest = response.get(3..).unwrap_or_default().trim();
        if let Some(stripped) = rest.strip_prefix('.') {
            rest = stripped.trim();
        }
        if lower_prefix(rest, 10) == "rewritten:" {
            rest = rest.get(10..).unwrap_or_default().trim();
        }

        if rest.is_empty() {
            ArtifactVerdict::Unrecognized(response.to_string())
        } else {
            ArtifactVerdict::Rewrite(rest.to_string())
        }
    }
}

/// Answer to "is the objective complete?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoneVerdict {
    Done,
    /// Not done; carries the model's list of unmet criteria.
    NotDone(String),
}

impl DoneVerdict {
    pub fn classify(response: &str) -> Self {
        if lower_prefix(response, 3) == "yes" {
            DoneVerdict::Done
        } else {
            DoneVerdict::NotDone(response.to_string())
        }
    }
}

//! Deploy document rewriting.
//!
//! The verified address lands in the same document the deploy step reads.
//! The rewrite replaces only the quoted value of the address assignment
//! and leaves every other byte of the document alone, comments and
//! formatting included. A rewrite that would turn a valid TOML document
//! into an invalid one is refused.

use std::ops::Range;
use std::path::{Path, PathBuf};

use easel_core::types::HostAddr;

use crate::error::{LocateError, Result};

/// What a rewrite did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The assignment's value was replaced.
    Updated,
    /// The assignment already held this value.
    Unchanged,
    /// No assignment with the configured key exists in the document.
    KeyMissing,
}

/// Byte range of the quoted value in `key = "value"`, when the line is
/// that assignment. Leading whitespace and spacing around `=` are
/// tolerated; anything after the closing quote is untouched.
fn assignment_span(line: &str, key: &str) -> Option<Range<usize>> {
    let indent = line.len() - line.trim_start().len();
    let rest = &line[indent..];
    let rest = rest.strip_prefix(key)?;
    let after_key = line.len() - rest.len();

    let rest = rest.trim_start();
    let after_ws = line.len() - rest.len();
    if after_ws == after_key && !rest.starts_with('=') {
        // Key must be a whole token, not a prefix of a longer key.
        return None;
    }
    let rest = rest.strip_prefix('=')?;
    let rest = rest.trim_start();
    let open = line.len() - rest.len();
    let rest = rest.strip_prefix('"')?;
    let close = rest.find('"')?;
    Some(open + 1..open + 1 + close)
}

/// Current value of the assignment, when the line carries one.
fn assignment_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    assignment_span(line, key).map(|span| &line[span])
}

/// Replace the first `key = "..."` assignment in `text` with `value`,
/// preserving every other byte.
fn replace_assignment(text: &str, key: &str, value: &str) -> (String, RewriteOutcome) {
    let mut out = String::with_capacity(text.len());
    let mut outcome = RewriteOutcome::KeyMissing;

    for line in text.split_inclusive('\n') {
        if outcome == RewriteOutcome::KeyMissing {
            if let Some(span) = assignment_span(line, key) {
                if &line[span.clone()] == value {
                    outcome = RewriteOutcome::Unchanged;
                } else {
                    outcome = RewriteOutcome::Updated;
                    out.push_str(&line[..span.start]);
                    out.push_str(value);
                    out.push_str(&line[span.end..]);
                    continue;
                }
            }
        }
        out.push_str(line);
    }

    (out, outcome)
}

/// Handle on the deploy document.
pub struct TargetRegistry {
    path: PathBuf,
    key: String,
}

impl TargetRegistry {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| {
            LocateError::Registry(format!("cannot read {}: {e}", self.path.display()))
        })
    }

    /// The address currently recorded in the document, if any.
    pub fn current_address(&self) -> Result<Option<String>> {
        let text = self.read()?;
        Ok(text
            .lines()
            .find_map(|line| assignment_value(line, &self.key))
            .map(|v| v.to_string()))
    }

    /// Record `addr` as the unit's address.
    ///
    /// Only the assignment's value changes; a missing key leaves the
    /// document alone and warns the operator instead of failing the run.
    pub fn write_address(&self, addr: &HostAddr) -> Result<RewriteOutcome> {
        let text = self.read()?;
        let value = addr.to_string();
        let (rewritten, outcome) = replace_assignment(&text, &self.key, &value);

        match outcome {
            RewriteOutcome::KeyMissing => {
                tracing::warn!(
                    path = %self.path.display(),
                    key = %self.key,
                    "Deploy document has no address assignment; nothing recorded"
                );
                return Ok(outcome);
            }
            RewriteOutcome::Unchanged => return Ok(outcome),
            RewriteOutcome::Updated => {}
        }

        // A document that parsed before the rewrite must still parse after.
        if toml::from_str::<toml::Value>(&text).is_ok()
            && toml::from_str::<toml::Value>(&rewritten).is_err()
        {
            return Err(LocateError::Registry(format!(
                "rewriting {} = \"{value}\" would corrupt {}",
                self.key,
                self.path.display()
            )));
        }

        std::fs::write(&self.path, rewritten).map_err(|e| {
            LocateError::Registry(format!("cannot write {}: {e}", self.path.display()))
        })?;

        tracing::info!(
            path = %self.path.display(),
            addr = %value,
            "Recorded verified address in deploy document"
        );
        Ok(outcome)
    }
}

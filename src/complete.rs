//! Tab completion against a fixed snapshot of command names.
//!
//! The candidate set is taken once at session start: builtin names plus every
//! executable-bit file across the `PATH` directories, deduplicated with the
//! first occurrence winning, then sorted. The engine owns the last-tab
//! timestamp; the clock is passed in explicitly so the double-tap window can
//! be tested with synthetic instants.

use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Window in which a repeated tab on an ambiguous word prints the match list
/// instead of ringing the bell again.
const DOUBLE_TAB_WINDOW: Duration = Duration::from_millis(500);

/// What the line editor should do in response to one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Insert `text` immediately after the current word and advance the
    /// cursor past it.
    Insert { text: String },
    /// No match, or an ambiguous word seen for the first time: alert only.
    Bell,
    /// Print every match, double-space separated, on a fresh line.
    Listing(Vec<String>),
}

/// Per-session completion state: the candidate snapshot and the last-tab
/// timestamp.
pub struct CompletionEngine {
    candidates: Vec<String>,
    last_tab: Option<Instant>,
}

impl CompletionEngine {
    /// Build an engine from an iterator of names. Duplicates are dropped
    /// (first seen wins) and the survivors sorted lexicographically.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut candidates: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|name| seen.insert(name.clone()))
            .collect();
        candidates.sort();
        CompletionEngine {
            candidates,
            last_tab: None,
        }
    }

    /// Snapshot the completable names: builtins first, then every file with
    /// an executable bit in each `search_paths` directory, in order.
    /// Unreadable directories are skipped. The snapshot is never refreshed.
    pub fn from_search_path(builtins: &[&str], search_paths: Option<&str>) -> Self {
        let mut names: Vec<String> = builtins.iter().map(|s| s.to_string()).collect();
        if let Some(paths) = search_paths {
            for dir in std::env::split_paths(paths) {
                let Ok(entries) = std::fs::read_dir(&dir) else {
                    continue;
                };
                for entry in entries.flatten() {
                    if !crate::external::is_executable(&entry.path()) {
                        continue;
                    }
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_string());
                    }
                }
            }
        }
        Self::new(names)
    }

    /// Bounds of the word around `pos`: scan left while the previous byte is
    /// not a space, then right while the current byte is not a space.
    pub fn current_word(line: &str, pos: usize) -> (usize, usize) {
        let bytes = line.as_bytes();
        let mut start = pos.min(bytes.len());
        while start > 0 && bytes[start - 1] != b' ' {
            start -= 1;
        }
        let mut end = pos.min(bytes.len());
        while end < bytes.len() && bytes[end] != b' ' {
            end += 1;
        }
        (start, end)
    }

    /// Decide what one completion request does. The request timestamp is
    /// recorded on every call.
    pub fn on_tab(&mut self, line: &str, pos: usize, now: Instant) -> Completion {
        let (start, end) = Self::current_word(line, pos);
        let word = &line[start..end];

        let matches: Vec<&String> = self
            .candidates
            .iter()
            .filter(|candidate| candidate.starts_with(word))
            .collect();
        let previous = self.last_tab.replace(now);

        if matches.is_empty() {
            return Completion::Bell;
        }

        if matches.len() == 1 {
            // The trailing space is appended even when the candidate already
            // equals the word.
            let mut text = matches[0][word.len()..].to_string();
            text.push(' ');
            return Completion::Insert { text };
        }

        let lcp = longest_common_prefix(&matches);
        if lcp.len() > word.len() {
            // Partial completion applies immediately, no timer involved.
            return Completion::Insert {
                text: lcp[word.len()..].to_string(),
            };
        }

        match previous {
            Some(prev) if now.duration_since(prev) < DOUBLE_TAB_WINDOW => {
                Completion::Listing(matches.into_iter().cloned().collect())
            }
            _ => Completion::Bell,
        }
    }
}

/// Byte-wise longest common leading run across a non-empty set of names,
/// truncated back to a character boundary.
fn longest_common_prefix(names: &[&String]) -> String {
    let first = names[0];
    let mut len = first.len();
    for name in &names[1..] {
        let common = first
            .as_bytes()
            .iter()
            .zip(name.as_bytes())
            .take_while(|(a, b)| a == b)
            .count();
        len = len.min(common);
        if len == 0 {
            break;
        }
    }
    // The common run can end inside a multibyte character; back off so the
    // prefix stays insertable text.
    while !first.is_char_boundary(len) {
        len -= 1;
    }
    first[..len].to_string()
}

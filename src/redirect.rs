//! Output redirection: operator scanning and target file handling.
//!
//! A command line carries at most one redirection. The first operator found
//! wins and everything after it is discarded, a deliberate simplification
//! carried over from the shell's original behavior.

use crate::lexer::Token;
use std::fs::{File, OpenOptions};
use std::io;

/// Which of the two output streams a redirection diverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Stdout,
    Stderr,
}

/// How the target file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// Create or overwrite (`>`, `1>`, `2>`).
    Truncate,
    /// Create or extend (`>>`, `1>>`, `2>>`).
    Append,
}

/// A recognized redirection: stream, open mode and target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSpec {
    pub target: RedirectTarget,
    pub mode: RedirectMode,
    pub path: String,
}

impl RedirectSpec {
    fn from_operator(op: &str, path: &str) -> Option<Self> {
        let (target, mode) = match op {
            ">" | "1>" => (RedirectTarget::Stdout, RedirectMode::Truncate),
            ">>" | "1>>" => (RedirectTarget::Stdout, RedirectMode::Append),
            "2>" => (RedirectTarget::Stderr, RedirectMode::Truncate),
            "2>>" => (RedirectTarget::Stderr, RedirectMode::Append),
            _ => return None,
        };
        Some(RedirectSpec {
            target,
            mode,
            path: path.to_string(),
        })
    }

    /// Open or create the target file in the resolved mode.
    ///
    /// Newly created files get mode 0644. The returned handle serves as the
    /// command's stdout or stderr sink for exactly one command invocation.
    pub fn open(&self) -> io::Result<File> {
        let mut opts = OpenOptions::new();
        opts.write(true).create(true);
        match self.mode {
            RedirectMode::Truncate => opts.truncate(true),
            RedirectMode::Append => opts.append(true),
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o644);
        }
        opts.open(&self.path)
    }
}

/// Split the token list at the first redirection operator.
///
/// The command name (`tokens[0]`) is never treated as an operator. An
/// operator only counts when a filename token follows it; a trailing bare
/// operator passes through as an ordinary argument. On a match, the returned
/// argv is truncated to everything before the operator and all later tokens,
/// including further operators, are discarded. An operator-free list comes
/// back unchanged with no redirection.
pub fn resolve(tokens: &[Token]) -> (Vec<String>, Option<RedirectSpec>) {
    for at in 1..tokens.len() {
        let Some(path) = tokens.get(at + 1) else {
            break;
        };
        if let Some(spec) = RedirectSpec::from_operator(&tokens[at].text, &path.text) {
            let argv = tokens[..at].iter().map(|t| t.text.clone()).collect();
            return (argv, Some(spec));
        }
    }
    (tokens.iter().map(|t| t.text.clone()).collect(), None)
}

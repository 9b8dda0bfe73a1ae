//! Traits at the seam between the interpreter and the commands it runs.

use crate::env::Environment;
use anyhow::Result;
use std::io::{Read, Write};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure,
/// mirroring the convention used by POSIX shells.
pub type ExitCode = i32;

/// A readable input stream that can also be converted into a [`Stdio`]
/// handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Read` and
/// `Into<Stdio>`.
pub trait Stdin: Read {
    /// Convert this input into a [`Stdio`] handle for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Read + Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// A writable output sink that can also be converted into a [`Stdio`] handle.
///
/// Both the stdout and the stderr sink of a command use this trait: when a
/// line carries a redirection, exactly one of the two sinks is an opened file
/// while the other stays on the inherited stream. Sinks are scoped to one
/// command invocation and dropped when it finishes, so the streams are
/// restored on every path without touching process-global state.
pub trait Stdout: Write {
    /// Convert this sink into a [`Stdio`] handle for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Object-safe trait for any command the shell can execute.
///
/// Implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command against the provided streams.
    fn execute(
        self: Box<Self>,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
/// Implementations can use the environment to resolve executables (e.g.
/// using PATH).
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and
    /// arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}

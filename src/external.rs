//! Discovery and launching of external programs.

use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::Result;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Command that is not a builtin: resolved on PATH and run as a child
/// process with the active sinks as its output streams.
pub struct ExternalCommand {
    name: OsString,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: OsString, args: Vec<OsString>) -> Self {
        Self { name, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = env.get_var("PATH")?;
        let executable = find_command_path(OsStr::new(&search_paths), Path::new(name))?;
        Some(Box::new(ExternalCommand::new(
            executable.into_os_string(),
            args.iter().map(|x| x.into()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        // The file may have changed since resolution; report it like any
        // other missing command instead of failing the prompt cycle.
        if !is_executable(Path::new(&self.name)) {
            writeln!(
                stderr,
                "{}: command not found",
                Path::new(&self.name).display()
            )?;
            return Ok(127);
        }
        let mut child = std::process::Command::new(&self.name)
            .args(&self.args)
            .stdin(stdin.stdio())
            .stdout(stdout.stdio())
            .stderr(stderr.stdio())
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .spawn()
            .map_err(|err| anyhow::anyhow!("{}: {err}", Path::new(&self.name).display()))?;
        let exit_status = child.wait()?;
        match exit_status.code() {
            Some(code) => Ok(code),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Absolute paths and paths with several components resolve directly if they
/// name an executable file. A single bare component is searched in each
/// `search_paths` (PATH) directory in order; the first existing file carrying
/// an executable bit wins. An empty path resolves to nothing.
pub fn find_command_path(search_paths: &OsStr, path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    if path.is_absolute() || path.components().count() > 1 {
        return is_executable(path).then(|| path.to_path_buf());
    }
    for dir in std::env::split_paths(search_paths) {
        let candidate = dir.join(path);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Whether `path` is a regular file with an executable permission bit.
#[cfg(unix)]
pub(crate) fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub(crate) fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn make_tool(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    fn paths_var(dirs: &[&Path]) -> OsString {
        std::env::join_paths(dirs.iter().copied()).unwrap()
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_search_path() {
        let temp = tempfile::tempdir().unwrap();
        let tool = make_tool(temp.path(), "mytool");
        let search = paths_var(&[temp.path()]);

        let found = find_command_path(&search, Path::new("mytool")).unwrap();
        assert_eq!(found, tool);
    }

    #[test]
    #[cfg(unix)]
    fn search_honors_directory_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let expected = make_tool(first.path(), "dup");
        make_tool(second.path(), "dup");
        let search = paths_var(&[first.path(), second.path()]);

        let found = find_command_path(&search, Path::new("dup")).unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    #[cfg(unix)]
    fn file_without_executable_bit_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("plain"), "data").unwrap();
        let search = paths_var(&[temp.path()]);

        assert!(find_command_path(&search, Path::new("plain")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn absolute_path_resolves_directly() {
        let temp = tempfile::tempdir().unwrap();
        let tool = make_tool(temp.path(), "abs_tool");
        let search = paths_var(&[Path::new("/nonexistent_dir")]);

        let found = find_command_path(&search, &tool).unwrap();
        assert_eq!(found, tool);
        assert!(find_command_path(&search, Path::new("/no/such/binary")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn absolute_path_without_executable_bit_is_not_resolved() {
        let temp = tempfile::tempdir().unwrap();
        let plain = temp.path().join("plain");
        fs::write(&plain, "data").unwrap();
        let search = paths_var(&[temp.path()]);

        assert!(find_command_path(&search, &plain).is_none());
    }

    #[test]
    fn empty_path_resolves_to_nothing() {
        assert!(find_command_path(OsStr::new("/bin"), Path::new("")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let search = paths_var(&[temp.path()]);
        assert!(find_command_path(&search, Path::new("nonexisting")).is_none());
    }
}

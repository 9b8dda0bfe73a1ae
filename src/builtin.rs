//! Built-in commands known to the shell at compile time.
//!
//! Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
//! directly in-process against the active output sinks, without spawning a
//! child process.

use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::external::find_command_path;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::ffi::OsStr;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Every command implemented in-process. Shared by `type` and the
/// completion snapshot.
pub(crate) const BUILTIN_NAMES: &[&str] = &["echo", "type", "pwd", "cd", "history", "exit"];

pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using the provided streams and environment.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for
    /// error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        mut stdin: Box<dyn Stdin>,
        mut stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, &mut stdin, &mut stdout, &mut stderr, env) {
            Ok(code) => Ok(code),
            Err(e) => {
                // Builtin failures go to the active (possibly redirected)
                // error sink and are never fatal to the loop.
                writeln!(stderr, "{e}")?;
                Ok(1)
            }
        }
    }
}

/// Fallback command produced when argh rejects the arguments (or handles
/// `--help`): prints argh's output on the matching sink.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: Box<dyn Stdin>,
        mut stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            stderr.write_all(self.output.as_bytes())?;
            Ok(1)
        } else {
            stdout.write_all(self.output.as_bytes())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Write the arguments to standard output, separated by spaces.
/// By default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Report how each name would be interpreted if used as a command.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to look up.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let mut status = 0;
        for name in &self.names {
            if BUILTIN_NAMES.contains(&name.as_str()) {
                writeln!(stdout, "{name} is a shell builtin")?;
                continue;
            }
            let found = env
                .get_var("PATH")
                .and_then(|paths| find_command_path(OsStr::new(&paths), Path::new(name)));
            match found {
                Some(path) => writeln!(stdout, "{name} is {}", path.display())?,
                None => {
                    writeln!(stdout, "{name}: not found")?;
                    status = 1;
                }
            }
        }
        Ok(status)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME
/// environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    /// Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let requested = match self.target {
            Some(t) if !t.is_empty() => t,
            _ => env
                .get_var("HOME")
                .context("cd: no target and HOME not set")?,
        };

        let target = PathBuf::from(&requested);
        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .map_err(|_| anyhow::anyhow!("cd: {requested}: No such file or directory"))?;
        std::env::set_current_dir(&canonical)
            .map_err(|_| anyhow::anyhow!("cd: {requested}: No such file or directory"))?;
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List every line submitted this session, oldest first.
pub struct History {}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        for (index, line) in env.history.iter().enumerate() {
            writeln!(stdout, "{index}  {line}")?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the shell, optionally with an explicit exit code.
pub struct Exit {
    #[argh(positional)]
    /// exit code to report; defaults to 0.
    pub code: Option<i32>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(self.code.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env as stdenv;
    use std::io::Cursor;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    // cd mutates the process working directory; serialize those tests.
    fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX.get_or_init(|| Mutex::new(())).lock().unwrap()
    }

    fn run<T: BuiltinCommand>(cmd: T, env: &mut Environment) -> (Result<ExitCode>, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let res = cmd.execute(&mut Cursor::new(Vec::new()), &mut out, &mut err, env);
        (
            res,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn echo_with_and_without_newline() {
        let mut env = Environment::new();

        let echo = Echo {
            no_newline: false,
            args: vec!["hello".to_string(), "world".to_string()],
        };
        let (res, out, _) = run(echo, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "hello world\n");

        let echo = Echo {
            no_newline: true,
            args: vec!["foo".to_string(), "bar".to_string()],
        };
        let (_, out, _) = run(echo, &mut env);
        assert_eq!(out, "foo bar");
    }

    #[test]
    fn pwd_prints_current_dir() {
        let mut env = Environment::new();
        let expected = format!("{}\n", env.current_dir.to_string_lossy());
        let (res, out, _) = run(Pwd {}, &mut env);
        assert!(res.is_ok());
        assert_eq!(out, expected);
    }

    #[test]
    fn cd_to_absolute_path_updates_env() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let canonical = fs::canonicalize(temp.path()).unwrap();

        let mut env = Environment::new();
        let cmd = Cd {
            target: Some(canonical.to_string_lossy().into_owned()),
        };
        let (res, _, _) = run(cmd, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(env.current_dir, canonical);

        stdenv::set_current_dir(orig).unwrap();
    }

    #[test]
    fn cd_without_target_uses_home() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let canonical = fs::canonicalize(temp.path()).unwrap();

        let mut env = Environment::new();
        env.set_var("HOME", canonical.to_string_lossy().into_owned());
        let (res, _, _) = run(Cd { target: None }, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(env.current_dir, canonical);

        stdenv::set_current_dir(orig).unwrap();
    }

    #[test]
    fn cd_to_missing_path_reports_no_such_directory() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();

        let mut env = Environment::new();
        let cmd = Cd {
            target: Some("/no/such/dir/for/minish".to_string()),
        };
        let (res, _, _) = run(cmd, &mut env);
        let err = res.unwrap_err();
        assert_eq!(
            err.to_string(),
            "cd: /no/such/dir/for/minish: No such file or directory"
        );
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn type_reports_builtins_and_missing_names() {
        let temp = tempfile::tempdir().unwrap();
        let mut env = Environment::new();
        env.set_var("PATH", temp.path().to_string_lossy().into_owned());

        let cmd = Type {
            names: vec!["echo".to_string(), "definitely_missing".to_string()],
        };
        let (res, out, _) = run(cmd, &mut env);
        assert_eq!(res.unwrap(), 1);
        assert_eq!(
            out,
            "echo is a shell builtin\ndefinitely_missing: not found\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn type_reports_path_for_external_commands() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let tool = temp.path().join("sometool");
        fs::write(&tool, "").unwrap();
        let mut perms = fs::metadata(&tool).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&tool, perms).unwrap();

        let mut env = Environment::new();
        env.set_var("PATH", temp.path().to_string_lossy().into_owned());

        let cmd = Type {
            names: vec!["sometool".to_string()],
        };
        let (res, out, _) = run(cmd, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, format!("sometool is {}\n", tool.display()));
    }

    #[test]
    fn history_prints_zero_indexed_display_lines() {
        let mut env = Environment::new();
        env.record_history("echo one");
        env.record_history("pwd");
        env.record_history("echo hello   world");

        let (res, out, _) = run(History {}, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "0  echo one\n1  pwd\n2  echo hello   world\n");
    }

    #[test]
    fn exit_sets_the_flag_and_returns_the_code() {
        let mut env = Environment::new();
        let (res, _, _) = run(Exit { code: Some(3) }, &mut env);
        assert_eq!(res.unwrap(), 3);
        assert!(env.should_exit);

        let mut env = Environment::new();
        let (res, _, _) = run(Exit { code: None }, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert!(env.should_exit);
    }
}

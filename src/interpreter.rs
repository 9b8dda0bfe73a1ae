//! The interpreter: per-line processing and the interactive prompt loop.

use crate::builtin::BUILTIN_NAMES;
use crate::command::{CommandFactory, ExitCode, Stdin, Stdout};
use crate::complete::{Completion, CompletionEngine};
use crate::env::Environment;
use crate::lexer;
use crate::redirect::{self, RedirectTarget};
use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::line_buffer::{ChangeListener, LineBuffer};
use rustyline::validate::Validator;
use rustyline::{Changeset, Context, Helper};
use std::cell::RefCell;
use std::io::{Read, Write};
use std::process::Stdio;
use std::time::Instant;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate — BuiltinCommand and
/// ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal shell-like interpreter that can execute built-in and external
/// commands.
///
/// The interpreter maintains an [`Environment`] and a list of
/// [`CommandFactory`] objects that are queried to create commands by name.
/// See [`Default`] for the built-in factories included out of the box.
///
/// Example
/// ```
/// use minish::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run("echo", &["hello", "world"]).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
        }
    }

    /// The session environment, including the history log.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run a single already-split command invocation with inherited streams.
    ///
    /// Returns the command's exit code; a name that no factory recognizes
    /// reports `command not found` and yields 127.
    pub fn run(&mut self, name: &str, args: &[&str]) -> Result<ExitCode> {
        self.dispatch(
            name,
            args,
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
        )
    }

    /// Process one submitted line: tokenize, record history, resolve any
    /// redirection and dispatch with the resulting sinks.
    ///
    /// The sinks live exactly as long as this call, so a redirected file is
    /// closed and the streams are back to the terminal before the next
    /// prompt, on success and failure alike.
    pub fn run_line(&mut self, line: &str) -> Result<ExitCode> {
        let parsed = lexer::tokenize(line);
        self.env.record_history(parsed.display.clone());
        if parsed.tokens.is_empty() {
            return Ok(0);
        }
        log::debug!("tokens: {:?}", parsed.tokens);

        let (argv, redirect) = redirect::resolve(&parsed.tokens);

        let mut opened = None;
        if let Some(spec) = redirect {
            log::debug!("redirect: {:?}", spec);
            match spec.open() {
                Ok(file) => opened = Some((spec.target, file)),
                Err(err) => {
                    // Reported on the original stderr; the command still
                    // runs without the requested redirection.
                    log::warn!("cannot redirect to {}: {err}", spec.path);
                    eprintln!("{}: {err}", spec.path);
                }
            }
        }

        let (stdout, stderr): (Box<dyn Stdout>, Box<dyn Stdout>) = match opened {
            Some((RedirectTarget::Stdout, file)) => (Box::new(file), Box::new(std::io::stderr())),
            Some((RedirectTarget::Stderr, file)) => (Box::new(std::io::stdout()), Box::new(file)),
            None => (Box::new(std::io::stdout()), Box::new(std::io::stderr())),
        };

        let args: Vec<&str> = argv[1..].iter().map(|s| s.as_str()).collect();
        self.dispatch(&argv[0], &args, stdout, stderr)
    }

    fn dispatch(
        &mut self,
        name: &str,
        args: &[&str],
        stdout: Box<dyn Stdout>,
        stderr: Box<dyn Stdout>,
    ) -> Result<ExitCode> {
        let stdin = InheritedStdin(std::io::stdin().lock());
        let mut stdout = stdout;
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                return cmd.execute(Box::new(stdin), stdout, stderr, &mut self.env);
            }
        }
        writeln!(stdout, "{name}: command not found")?;
        Ok(127)
    }

    /// The interactive Read-Eval-Print Loop.
    ///
    /// The line editor owns echoing, cursor movement and arrow-key history;
    /// tab requests are routed to the [`CompletionEngine`] snapshot taken
    /// here, before the first prompt. End of input ends the session; any
    /// other read error is fatal.
    pub fn repl(&mut self) -> Result<()> {
        let engine =
            CompletionEngine::from_search_path(BUILTIN_NAMES, self.env.get_var("PATH").as_deref());
        let mut rl: rustyline::Editor<ShellHelper, DefaultHistory> = rustyline::Editor::new()?;
        rl.set_helper(Some(ShellHelper {
            engine: RefCell::new(engine),
        }));

        while !self.env.should_exit {
            match rl.readline("$ ") {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    if let Err(err) = self.run_line(&line) {
                        eprintln!("{err}");
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("error reading input: {err}");
                    std::process::exit(1);
                }
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `echo`, `type`, `pwd`, `cd`, `history`, `exit`
    /// - external command launcher
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Type>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<History>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}

struct InheritedStdin<'a>(std::io::StdinLock<'a>);

impl Read for InheritedStdin<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl Stdin for InheritedStdin<'_> {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// Rustyline glue: translates [`Completion`] decisions into the editor's
/// completion protocol.
struct ShellHelper {
    engine: RefCell<CompletionEngine>,
}

impl Helper for ShellHelper {}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellHelper {}
impl Validator for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, end) = CompletionEngine::current_word(line, pos);
        let word = &line[start..end];
        match self.engine.borrow_mut().on_tab(line, pos, Instant::now()) {
            Completion::Insert { text } => {
                let replacement = format!("{word}{text}");
                Ok((
                    start,
                    vec![Pair {
                        display: replacement.clone(),
                        replacement,
                    }],
                ))
            }
            Completion::Bell => {
                ring_bell();
                Ok((pos, Vec::new()))
            }
            Completion::Listing(names) => {
                print!("\n{}\n", names.join("  "));
                let _ = std::io::stdout().flush();
                // Hand the word back unchanged so the editor redraws the
                // prompt line under the listing.
                Ok((
                    start,
                    vec![Pair {
                        display: word.to_string(),
                        replacement: word.to_string(),
                    }],
                ))
            }
        }
    }

    fn update(&self, line: &mut LineBuffer, start: usize, elected: &str, cl: &mut Changeset) {
        replace_current_word(line, start, elected, cl);
    }
}

/// Swap the whole word around the cursor for `elected`.
///
/// The current word extends on both sides of the cursor, while the editor's
/// stock update only replaces the part left of it and would duplicate the
/// word's tail.
fn replace_current_word<C: ChangeListener>(
    line: &mut LineBuffer,
    start: usize,
    elected: &str,
    cl: &mut C,
) {
    let end = CompletionEngine::current_word(line.as_str(), line.pos()).1;
    line.replace(start..end, elected, cl);
}

fn ring_bell() {
    print!("\x07");
    let _ = std::io::stdout().flush();
}

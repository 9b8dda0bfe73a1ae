//! A small interactive command-line shell.
//!
//! The crate reads one line per prompt cycle, splits it into argument tokens
//! honoring quoting and escaping, rewires stdout or stderr to a file when the
//! line carries a redirection operator, and then runs either a built-in
//! command in-process or an external program found on `PATH`. During line
//! editing, a tab-completion engine reacts to every completion keystroke
//! against a snapshot of builtin and executable names.
//!
//! The main entry point is [`Interpreter`], which owns the prompt loop and a
//! set of pluggable command factories. The core line-processing pieces are
//! exposed as public modules: [`lexer`] (tokenization), [`redirect`]
//! (redirection resolution) and [`complete`] (tab completion), alongside
//! [`command`] and [`env`] for implementing your own commands.

mod builtin;
pub mod command;
pub mod complete;
pub mod env;
mod external;
mod interpreter;
pub mod lexer;
pub mod redirect;

/// Re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

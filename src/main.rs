use anyhow::Result;
use argh::FromArgs;
use minish::Interpreter;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

#[derive(FromArgs)]
/// An interactive command shell with quoting, output redirection and
/// tab completion.
struct Options {
    #[argh(switch, short = 'v')]
    /// log token streams and resolved redirections to stderr
    verbose: bool,
}

fn main() -> Result<()> {
    let options: Options = argh::from_env();
    let level = if options.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    Interpreter::default().repl()
}

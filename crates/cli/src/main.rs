//! Entry point: picks shell / REPL / pipe mode and wires up the
//! embedded engine.

mod commands;
mod format;
mod parse;
mod repl;
mod state;

use std::io::IsTerminal;

use format::{format_reply, OutputMode};
use state::SessionState;

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let matches = commands::build_cli().get_matches();

    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else if matches.get_flag("raw") {
        OutputMode::Raw
    } else {
        OutputMode::Human
    };

    let mut state = match matches.get_one::<String>("dir") {
        Some(dir) => match SessionState::open(dir) {
            Ok(state) => state,
            Err(err) => {
                eprintln!("(error) failed to open {dir}: {err}");
                std::process::exit(1);
            }
        },
        None => SessionState::in_memory(),
    };

    let shell_args: Vec<String> = matches.get_many::<String>("args").map(|vals| vals.cloned().collect()).unwrap_or_default();

    let exit_code = if !shell_args.is_empty() {
        run_shell_mode(&shell_args, &mut state, mode)
    } else if std::io::stdin().is_terminal() {
        repl::run_repl(&mut state, mode);
        0
    } else {
        repl::run_pipe(&mut state, mode)
    };

    std::process::exit(exit_code);
}

fn run_shell_mode(args: &[String], state: &mut SessionState, mode: OutputMode) -> i32 {
    match state.execute(args) {
        Ok(reply) => {
            println!("{}", format_reply(&reply, mode));
            0
        }
        Err(err) => {
            eprintln!("(error) {err}");
            1
        }
    }
}

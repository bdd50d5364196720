//! REPL loop with rustyline: prompt, meta-commands, history.
//! Pipe mode reads lines from stdin directly, one dispatch per line.

use std::io::{self, BufRead};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use crate::format::{format_reply, OutputMode};
use crate::parse::{check_meta_command, MetaCommand};
use crate::state::SessionState;

pub fn run_repl(state: &mut SessionState, mode: OutputMode) {
    let config = Config::builder().history_ignore_space(true).completion_type(CompletionType::List).build();

    let mut rl: Editor<EmberHelper, _> = Editor::with_config(config).unwrap();
    rl.set_helper(Some(EmberHelper));

    let history_path = history_file();
    if let Some(path) = &history_path {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = state.prompt();
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                if let Some(meta) = check_meta_command(trimmed) {
                    match meta {
                        MetaCommand::Quit => break,
                        MetaCommand::Clear => print!("\x1B[2J\x1B[1;1H"),
                        MetaCommand::Help { command } => print_help(command.as_deref()),
                    }
                    continue;
                }

                run_line(trimmed, state, mode);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("(error) {err:?}");
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        let _ = rl.save_history(path);
    }
}

pub fn run_pipe(state: &mut SessionState, mode: OutputMode) -> i32 {
    let stdin = io::stdin();
    let mut exit_code = 0;
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !run_line(trimmed, state, mode) {
            exit_code = 1;
        }
    }
    exit_code
}

/// Tokenizes and dispatches one line. Returns `true` on success.
fn run_line(line: &str, state: &mut SessionState, mode: OutputMode) -> bool {
    let Some(tokens) = shlex::split(line) else {
        eprintln!("(error) invalid quoting: {line}");
        return false;
    };
    if tokens.is_empty() {
        return true;
    }
    match state.execute(&tokens) {
        Ok(reply) => {
            println!("{}", format_reply(&reply, mode));
            true
        }
        Err(err) => {
            eprintln!("(error) {err}");
            false
        }
    }
}

fn history_file() -> Option<String> {
    std::env::var("HOME").ok().map(|h| format!("{h}/.ember_cli_history"))
}

fn print_help(command: Option<&str>) {
    match command {
        Some(name) => println!("no per-command help text; try `{} ...` directly", name.to_ascii_uppercase()),
        None => {
            println!("Redis-style commands are forwarded directly to the engine, e.g.:");
            println!("  SET k v / GET k / LPUSH list a b / ZADD z 1 a / HSET h f v");
            println!();
            println!("Meta-commands:");
            println!("  help [command]   Show this message");
            println!("  quit / exit      Exit the REPL");
            println!("  clear            Clear the screen");
        }
    }
}

struct EmberHelper;

impl Helper for EmberHelper {}
impl Validator for EmberHelper {}
impl Highlighter for EmberHelper {}
impl Hinter for EmberHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for EmberHelper {
    type Candidate = Pair;

    fn complete(&self, _line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok((pos, Vec::new()))
    }
}

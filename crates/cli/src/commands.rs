//! Clap command-line definition.
//!
//! Unlike a typed command tree per data primitive, the keyspace engine
//! exposes a flat `NAME arg arg ...` command registry, so there is a
//! single trailing variadic `ARGS` rather than one clap subcommand per
//! Redis command — the engine's own dispatcher does that resolution.

use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("ember-cli")
        .about("Interactive client for the embedded keyspace engine")
        .arg(Arg::new("dir").long("dir").help("Data directory; opens an on-disk engine instead of in-memory"))
        .arg(Arg::new("json").long("json").help("JSON output mode").action(ArgAction::SetTrue).conflicts_with("raw"))
        .arg(Arg::new("raw").long("raw").help("Raw output mode: bare values, no type prefixes").action(ArgAction::SetTrue))
        .arg(Arg::new("args").help("A single command to run, then exit").num_args(0..).trailing_var_arg(true))
}

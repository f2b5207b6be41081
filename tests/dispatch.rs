//! End-to-end dispatch behavior: token classification against a declared
//! command tree, boundary handling, and the error paths that stop an
//! invocation before any binding or hook runs.

use std::cell::Cell;
use std::rc::Rc;

use caucus::{Command, InvokeError, ParseError, Tags};

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|arg| (*arg).to_owned()).collect()
}

fn parse_error(result: Result<(), InvokeError>) -> ParseError {
    match result.unwrap_err() {
        InvokeError::Parse(error) => error,
        InvokeError::Handler(error) => panic!("expected a parse error, got {error}"),
    }
}

/// A flag that tells us whether a command's hook ran.
fn probe(command: Command) -> (Command, Rc<Cell<bool>>) {
    let ran = Rc::new(Cell::new(false));
    let command = command.on_invoke({
        let ran = ran.clone();
        move || {
            ran.set(true);
            Ok(())
        }
    });
    (command, ran)
}

#[test]
fn vector_without_option_markers_binds_from_the_first_token() {
    let cmd = Command::new("tool");
    cmd.flag(Tags::both('v', "verbose"));
    let input = cmd.param::<String>("input").required();
    let rest = cmd.array_param::<String>("rest");

    // the leading token is positional, so everything after it is never
    // re-scanned as options
    cmd.invoke(&args(&["first", "-v", "--verbose"])).unwrap();

    assert_eq!(input.value().unwrap(), "first");
    assert_eq!(rest.values().unwrap(), ["-v", "--verbose"]);
}

#[test]
fn unknown_long_option_aborts_without_consuming_more_tokens() {
    let (cmd, ran) = probe(Command::new("tool"));
    let verbose = cmd.flag(Tags::long("verbose"));

    let error = parse_error(cmd.invoke(&args(&["--nope", "--verbose"])));

    assert!(matches!(error, ParseError::UnknownLong(name) if name == "nope"));
    assert!(!verbose.supplied());
    assert!(!ran.get());
}

#[test]
fn duplicate_across_short_and_long_forms_is_rejected() {
    let cmd = Command::new("tool");
    cmd.flag(Tags::both('f', "force"));

    let error = parse_error(cmd.invoke(&args(&["-f", "--force"])));
    assert!(matches!(error, ParseError::Repeated(name) if name == "--force"));
}

#[test]
fn multi_flag_accepts_repeats_in_any_form() {
    let cmd = Command::new("tool");
    let verbose = cmd.flag(Tags::both('v', "verbose")).multi();

    cmd.invoke(&args(&["-vv", "--verbose"])).unwrap();
    assert_eq!(verbose.count(), 3);
}

#[test]
fn cluster_with_trailing_valued_option_claims_the_next_token() {
    let cmd = Command::new("tool");
    let all = cmd.flag(Tags::short('a'));
    let brief = cmd.flag(Tags::short('b'));
    let output = cmd.option::<String>(Tags::short('c'));

    cmd.invoke(&args(&["-abc", "out.txt"])).unwrap();

    assert!(all.supplied());
    assert!(brief.supplied());
    assert_eq!(output.value().unwrap(), "out.txt");
}

#[test]
fn valued_option_in_cluster_interior_is_a_missing_value() {
    let cmd = Command::new("tool");
    cmd.option::<String>(Tags::short('a'));
    cmd.flag(Tags::short('b'));
    cmd.flag(Tags::short('c'));

    let error = parse_error(cmd.invoke(&args(&["-abc"])));
    assert!(matches!(error, ParseError::MissingValue(name) if name == "-a"));
}

#[test]
fn valued_option_as_last_token_is_a_missing_value() {
    let cmd = Command::new("tool");
    cmd.option::<String>(Tags::long("level"));

    let error = parse_error(cmd.invoke(&args(&["--level"])));
    assert!(matches!(error, ParseError::MissingValue(name) if name == "--level"));
}

#[test]
fn attached_value_binds_and_flags_reject_it() {
    let cmd = Command::new("tool");
    let level = cmd.option::<u32>(Tags::long("level"));
    cmd.flag(Tags::long("verbose"));

    cmd.invoke(&args(&["--level=7"])).unwrap();
    assert_eq!(level.value().unwrap(), 7);

    let error = parse_error(cmd.invoke(&args(&["--verbose=yes"])));
    assert!(matches!(error, ParseError::UnexpectedValue(name, _) if name == "--verbose"));
}

#[test]
fn option_value_may_start_with_dashes() {
    let cmd = Command::new("tool");
    let pattern = cmd.option::<String>(Tags::long("pattern"));

    cmd.invoke(&args(&["--pattern", "--not-an-option"])).unwrap();
    assert_eq!(pattern.value().unwrap(), "--not-an-option");
}

#[test]
fn parent_flag_applies_and_dispatch_reaches_the_child_with_empty_slice() {
    let (parent, parent_ran) = probe(Command::new("tool"));
    let force = parent.flag(Tags::short('f'));

    let (child, child_ran) = probe(parent.subcommand("child"));
    let leftover = child.array_param::<String>("leftover");

    parent.invoke(&args(&["-f", "child"])).unwrap();

    assert!(force.supplied());
    assert!(!parent_ran.get(), "parent hook must not run when dispatching");
    assert!(child_ran.get());
    assert_eq!(leftover.values().unwrap(), Vec::<String>::new());
}

#[test]
fn options_are_scoped_per_command_level() {
    let parent = Command::new("tool");
    parent.flag(Tags::long("verbose"));

    let child = parent.subcommand("build");
    let target = child.option::<String>(Tags::long("target"));

    // the parent scans only its own slice; --target belongs to the child
    parent
        .invoke(&args(&["--verbose", "build", "--target", "x86"]))
        .unwrap();
    assert_eq!(target.value().unwrap(), "x86");

    // and the child does not know the parent's options
    let error = parse_error(parent.invoke(&args(&["build", "--verbose"])));
    assert!(matches!(error, ParseError::UnknownLong(name) if name == "verbose"));
}

#[test]
fn subcommands_match_by_exact_name_only() {
    let parent = Command::new("tool").accept_extra_args();
    let (_child, child_ran) = probe(parent.subcommand("build"));

    // no prefix matching: "bui" is an ordinary positional
    parent.invoke(&args(&["bui"])).unwrap();
    assert!(!child_ran.get());
    assert_eq!(parent.extra_args(), ["bui"]);
}

#[test]
fn missing_required_option_is_reported_before_parameter_binding() {
    let cmd = Command::new("tool");
    cmd.option::<String>(Tags::both('n', "name")).required();
    let input = cmd.param::<String>("input").required();

    let error = parse_error(cmd.invoke(&args(&["would-be-input"])));

    assert!(matches!(error, ParseError::MissingOption(name) if name == "--name"));
    assert!(!input.supplied(), "binding must not have been attempted");
}

#[test]
fn scalar_and_trailing_array_split_through_invoke() {
    let cmd = Command::new("tool");
    let input = cmd.param::<String>("input").required();
    let rest = cmd.array_param::<String>("rest");

    cmd.invoke(&args(&["x"])).unwrap();
    assert_eq!(input.value().unwrap(), "x");
    assert!(!rest.supplied());

    cmd.invoke(&args(&["x", "y", "z"])).unwrap();
    assert_eq!(rest.values().unwrap(), ["y", "z"]);
}

#[test]
fn reinvocation_refreshes_previously_cached_arrays() {
    let cmd = Command::new("tool");
    let nums = cmd.array_param::<u32>("nums");

    cmd.invoke(&args(&["1", "2"])).unwrap();
    assert_eq!(nums.values().unwrap(), [1, 2]);

    cmd.invoke(&args(&["9"])).unwrap();
    assert_eq!(nums.values().unwrap(), [9]);
}

#[test]
fn surplus_positionals_are_rejected_without_extra_args_mode() {
    let cmd = Command::new("tool");
    cmd.param::<String>("input");

    let error = parse_error(cmd.invoke(&args(&["a", "b"])));
    assert!(matches!(error, ParseError::UnexpectedArgument(token) if token == "b"));
}

#[test]
fn extra_args_mode_collects_the_surplus() {
    let cmd = Command::new("tool").accept_extra_args();
    cmd.param::<String>("input");

    cmd.invoke(&args(&["a", "b", "c"])).unwrap();
    assert_eq!(cmd.extra_args(), ["b", "c"]);
}

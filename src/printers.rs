/*!
A basic terminal renderer over the [`help`][crate::help] contracts.

Layout is deliberately simple: wrapped description, a synopsis line, then
aligned rows for options (group children indented under a combinator note),
positional arguments, and subcommands.
*/

use std::io::{self, Write as _};

use indent_write::io::IndentWriter;

use crate::errors::ParseError;
use crate::help::{CommandSummary, GroupSummary, HelpEntry, OptionSummary, ParameterSummary};
use crate::option::Combinator;

const WRAP_WIDTH: usize = 76;

/// Render a parse failure the way a hosting CLI is expected to: one line on
/// the error stream, message verbatim.
pub fn write_parse_error(out: &mut impl io::Write, error: &ParseError) -> io::Result<()> {
    writeln!(out, "error: {error}")
}

/// Render a usage message for one command.
pub fn write_help(out: &mut impl io::Write, summary: &CommandSummary) -> io::Result<()> {
    if let Some(description) = &summary.description {
        writeln!(out, "{}", textwrap::fill(description, WRAP_WIDTH))?;
        writeln!(out)?;
    }

    writeln!(out, "USAGE:")?;
    writeln!(out, "  {}", synopsis(summary))?;
    if !summary.subcommands.is_empty() {
        writeln!(out, "  {} <COMMAND>", summary.name)?;
    }

    if !summary.options.is_empty() {
        writeln!(out)?;
        writeln!(out, "OPTIONS:")?;
        write_entries(out, &summary.options)?;
    }

    if !summary.parameters.is_empty() {
        writeln!(out)?;
        writeln!(out, "ARGS:")?;
        let width = column_width(summary.parameters.iter().map(param_token));
        for param in &summary.parameters {
            write_row(out, &param_token(param), param.description.as_deref(), width)?;
        }
    }

    if !summary.subcommands.is_empty() {
        writeln!(out)?;
        writeln!(out, "COMMANDS:")?;
        let width = column_width(summary.subcommands.iter().map(|(name, _)| name.clone()));
        for (name, description) in &summary.subcommands {
            write_row(out, name, description.as_deref(), width)?;
        }
    }

    Ok(())
}

fn synopsis(summary: &CommandSummary) -> String {
    let mut line = summary.name.clone();
    if !summary.options.is_empty() {
        line.push_str(" [OPTIONS]");
    }
    for param in &summary.parameters {
        line.push(' ');
        line.push_str(&param_token(param));
    }
    line
}

fn write_entries(out: &mut impl io::Write, entries: &[HelpEntry]) -> io::Result<()> {
    // one column width across top-level options and group children keeps
    // the rows aligned through the indentation
    let width = column_width(entries.iter().flat_map(|entry| match entry {
        HelpEntry::Option(option) => vec![option_label(option)],
        HelpEntry::Group(group) => group.options.iter().map(option_label).collect(),
    }));

    for entry in entries {
        match entry {
            HelpEntry::Option(option) => {
                write_row(out, &option_label(option), option.description.as_deref(), width)?;
            }
            HelpEntry::Group(group) => {
                writeln!(
                    out,
                    "  {label} ({note}):",
                    label = group.label.as_deref().unwrap_or("options"),
                    note = group_note(group),
                )?;

                let mut indented = IndentWriter::new("  ", &mut *out);
                for option in &group.options {
                    write_row(
                        &mut indented,
                        &option_label(option),
                        option.description.as_deref(),
                        width.saturating_sub(2),
                    )?;
                }
            }
        }
    }

    Ok(())
}

fn write_row(
    out: &mut impl io::Write,
    label: &str,
    description: Option<&str>,
    width: usize,
) -> io::Result<()> {
    match description {
        Some(text) => writeln!(out, "  {label:<width$}  {text}"),
        None => writeln!(out, "  {label}"),
    }
}

fn column_width(labels: impl IntoIterator<Item = String>) -> usize {
    labels.into_iter().map(|label| label.len()).max().unwrap_or(0)
}

fn option_label(option: &OptionSummary) -> String {
    let mut label = match (option.tags.short_tag(), option.tags.long_name()) {
        (Some(short), Some(long)) => format!("-{short}, --{long}"),
        (None, Some(long)) => format!("    --{long}"),
        (Some(short), None) => format!("-{short}"),
        // Tags guarantees at least one form
        (None, None) => String::new(),
    };

    if option.takes_value {
        label.push_str(&format!(" <{}>", placeholder(option)));
    }
    if option.multi {
        label.push_str("...");
    }
    label
}

/// Metavariable for a valued option: the long name uppercased, or the short
/// tag when that's all there is.
fn placeholder(option: &OptionSummary) -> String {
    match option.tags.long_name() {
        Some(long) => long.replace('-', "_").to_uppercase(),
        None => option
            .tags
            .short_tag()
            .map(|short| short.to_uppercase().to_string())
            .unwrap_or_default(),
    }
}

fn param_token(param: &ParameterSummary) -> String {
    let suffix = match param.is_array {
        true => "...",
        false => "",
    };
    match param.required {
        true => format!("<{}{suffix}>", param.name),
        false => format!("[{}{suffix}]", param.name),
    }
}

fn group_note(group: &GroupSummary) -> &'static str {
    match (group.combinator, group.required) {
        (Combinator::All, _) => "all together",
        (Combinator::Any, true) => "at least one",
        (Combinator::Any, false) => "any",
        (Combinator::One, true) => "exactly one",
        (Combinator::One, false) => "at most one",
    }
}

/*!
Read-only description of a command's declared surface, for help rendering.

These types are plain data snapshots taken from the registries in
declaration order; renderers (see [`printers`][crate::printers]) consume
them without touching the live tree.
*/

use crate::option::{Combinator, OptionNode, Tags};

/// One named option as the help renderer sees it.
#[derive(Debug, Clone)]
pub struct OptionSummary {
    pub tags: Tags,
    pub description: Option<String>,
    pub required: bool,
    pub takes_value: bool,
    pub multi: bool,
}

impl OptionSummary {
    pub(crate) fn of(node: &dyn OptionNode) -> Self {
        Self {
            tags: node.tags().clone(),
            description: node.description().map(str::to_owned),
            required: node.required(),
            takes_value: node.is_valued(),
            multi: node.multi(),
        }
    }
}

/// An option group and its children, in declaration order.
#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub label: Option<String>,
    pub combinator: Combinator,
    pub required: bool,
    pub options: Vec<OptionSummary>,
}

/// One top-level entry in a command's option registry.
#[derive(Debug, Clone)]
pub enum HelpEntry {
    Option(OptionSummary),
    Group(GroupSummary),
}

/// One positional parameter as the help renderer sees it.
#[derive(Debug, Clone)]
pub struct ParameterSummary {
    pub name: String,
    pub description: Option<String>,
    pub index: usize,
    pub required: bool,
    pub is_array: bool,
}

/// A whole command: name, description, and its three registries snapshot in
/// declaration order.
#[derive(Debug, Clone)]
pub struct CommandSummary {
    pub name: String,
    pub description: Option<String>,
    pub options: Vec<HelpEntry>,
    pub parameters: Vec<ParameterSummary>,
    /// Child command names and descriptions, in declaration order.
    pub subcommands: Vec<(String, Option<String>)>,
}

impl CommandSummary {
    /// Every distinct option display name, in declaration order (groups
    /// contribute their children in place). Deterministic, so renderers can
    /// use it for alignment.
    pub fn option_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for entry in &self.options {
            match entry {
                HelpEntry::Option(option) => names.push(option.tags.to_string()),
                HelpEntry::Group(group) => {
                    names.extend(group.options.iter().map(|option| option.tags.to_string()));
                }
            }
        }
        names
    }
}

/*!
The named-option model: single flags and valued options, combinator groups,
and the per-command registry that resolves tokens to them.

Options are declared through [`Command`][crate::command::Command] (or
[`Group`]) and observed through the cheap-clone handles returned at
declaration time; the registry keeps an untyped view of the same nodes for
scanning and help iteration. Raw values are stored as strings during
scanning and only turned into typed values when a handle is read.
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::rc::Rc;

use joinery::JoinableIterator;
use tracing::trace;

use crate::check::{Check, CheckSet};
use crate::convert::{BoxConvert, Convert, FromArg, Standard};
use crate::errors::ParseError;
use crate::help::{GroupSummary, HelpEntry, OptionSummary};
use crate::value::ValueCell;

/**
The set of tags that identify a particular option (`-short`, `--long`).

Every option carries at least one tag; the variants make a tagless option
unrepresentable.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tags {
    /// This option uses only a long tag.
    Long { long: String },

    /// This option uses only a short tag.
    Short { short: char },

    /// This option uses both a long and short tag.
    LongShort { long: String, short: char },
}

impl Tags {
    /// A long-only identity.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty, starts with `-`, or contains `=` or
    /// whitespace.
    pub fn long(long: impl Into<String>) -> Self {
        Self::Long {
            long: checked_long(long.into()),
        }
    }

    /// A short-only identity.
    ///
    /// # Panics
    ///
    /// Panics if the tag is `-`.
    pub fn short(short: char) -> Self {
        Self::Short {
            short: checked_short(short),
        }
    }

    /// An identity with both forms.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`Tags::long`] and
    /// [`Tags::short`].
    pub fn both(short: char, long: impl Into<String>) -> Self {
        Self::LongShort {
            long: checked_long(long.into()),
            short: checked_short(short),
        }
    }

    /// Get the long tag, if any.
    #[inline]
    #[must_use]
    pub fn long_name(&self) -> Option<&str> {
        match self {
            Self::Long { long } | Self::LongShort { long, .. } => Some(long),
            Self::Short { .. } => None,
        }
    }

    /// Get the short tag, if any.
    #[inline]
    #[must_use]
    pub fn short_tag(&self) -> Option<char> {
        match self {
            Self::Short { short } | Self::LongShort { short, .. } => Some(*short),
            Self::Long { .. } => None,
        }
    }
}

/// Displays the long form when there is one (`--verbose`), the short form
/// otherwise (`-v`).
impl Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long { long } | Self::LongShort { long, .. } => write!(f, "--{long}"),
            Self::Short { short } => write!(f, "-{short}"),
        }
    }
}

fn checked_long(long: String) -> String {
    if long.is_empty() {
        panic!("long option name must not be empty");
    }
    if long.starts_with('-') {
        panic!("long option name {long:?} must not start with '-'");
    }
    if long.contains('=') || long.contains(char::is_whitespace) {
        panic!("long option name {long:?} must not contain '=' or whitespace");
    }
    long
}

fn checked_short(short: char) -> char {
    if short == '-' {
        panic!("short option tag must not be '-'");
    }
    short
}

/// Untyped scan and iteration surface shared by every named option.
pub(crate) trait OptionNode {
    fn tags(&self) -> &Tags;
    fn description(&self) -> Option<&str>;
    fn required(&self) -> bool;
    fn is_valued(&self) -> bool;
    fn multi(&self) -> bool;
    fn supplied(&self) -> bool;

    /// Store one raw application. Flags receive the empty string.
    fn apply(&mut self, raw: &str);

    /// Clear applied state ahead of a fresh invocation.
    fn reset(&mut self);
}

pub(crate) type SharedOption = Rc<RefCell<dyn OptionNode>>;

struct FlagNode {
    tags: Tags,
    description: Option<String>,
    required: bool,
    multi: bool,
    count: usize,
}

impl OptionNode for FlagNode {
    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn required(&self) -> bool {
        self.required
    }

    fn is_valued(&self) -> bool {
        false
    }

    fn multi(&self) -> bool {
        self.multi
    }

    fn supplied(&self) -> bool {
        self.count > 0
    }

    fn apply(&mut self, _raw: &str) {
        self.count += 1;
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

struct ValuedNode<T> {
    tags: Tags,
    description: Option<String>,
    required: bool,
    multi: bool,
    raws: Vec<String>,
    converter: BoxConvert<T>,
    checks: CheckSet<T>,
    default: Option<T>,
    cache: ValueCell<Vec<T>>,
}

impl<T: Clone> ValuedNode<T> {
    /// Convert-then-check one raw string, folding any failure into the
    /// uniform parse-error kind.
    fn resolve_one(&self, raw: &str) -> Result<T, ParseError> {
        self.converter
            .convert(raw.to_owned())
            .and_then(|value| self.checks.check(&value).map(|()| value))
            .map_err(|reason| ParseError::Invalid {
                name: self.tags.to_string(),
                raw: raw.to_owned(),
                reason: reason.to_string(),
            })
    }

    /// Scalar read: resolved fresh on every call, never cached. The last
    /// application wins when the option was supplied more than once; a
    /// required option with nothing supplied raises rather than falling
    /// back.
    fn get(&self) -> Result<Option<T>, ParseError> {
        match self.raws.last() {
            Some(raw) => self.resolve_one(raw).map(Some),
            None if self.required => Err(ParseError::MissingOption(self.tags.to_string())),
            None => Ok(self.default.clone()),
        }
    }

    /// Array read: resolved once and cached until a re-application
    /// invalidates the cache.
    fn values(&mut self) -> Result<Vec<T>, ParseError> {
        if let Some(cached) = self.cache.resolved() {
            return Ok(cached.clone());
        }
        if self.raws.is_empty() {
            return match self.required {
                true => Err(ParseError::MissingOption(self.tags.to_string())),
                false => Ok(self.default.clone().into_iter().collect()),
            };
        }

        let resolved = self
            .raws
            .iter()
            .map(|raw| self.resolve_one(raw))
            .collect::<Result<Vec<_>, _>>()?;
        self.cache.store(resolved.clone());
        Ok(resolved)
    }
}

impl<T> OptionNode for ValuedNode<T> {
    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn required(&self) -> bool {
        self.required
    }

    fn is_valued(&self) -> bool {
        true
    }

    fn multi(&self) -> bool {
        self.multi
    }

    fn supplied(&self) -> bool {
        !self.raws.is_empty()
    }

    fn apply(&mut self, raw: &str) {
        self.raws.push(raw.to_owned());
        self.cache.invalidate();
    }

    fn reset(&mut self) {
        self.raws.clear();
        self.cache.reset();
    }
}

/**
Handle to a declared flag: a named option that takes no value.

Cloning is cheap and every clone observes the same underlying option.
*/
#[derive(Clone)]
pub struct Flag {
    node: Rc<RefCell<FlagNode>>,
}

impl Flag {
    pub(crate) fn new(tags: Tags) -> Self {
        Self {
            node: Rc::new(RefCell::new(FlagNode {
                tags,
                description: None,
                required: false,
                multi: false,
                count: 0,
            })),
        }
    }

    pub(crate) fn shared(&self) -> SharedOption {
        let shared: SharedOption = self.node.clone();
        shared
    }

    /// Mark the flag required: invocation fails unless it is supplied.
    pub fn required(self) -> Self {
        self.node.borrow_mut().required = true;
        self
    }

    /// Allow the flag to be supplied more than once; [`count`][Self::count]
    /// observes the repetitions.
    pub fn multi(self) -> Self {
        self.node.borrow_mut().multi = true;
        self
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        self.node.borrow_mut().description = Some(description.into());
        self
    }

    pub fn supplied(&self) -> bool {
        self.node.borrow().supplied()
    }

    pub fn count(&self) -> usize {
        self.node.borrow().count
    }
}

/**
Handle to a declared valued option, generic over its bound type.

Scalar reads ([`value`][Self::value], [`get`][Self::get]) convert and check
on every call; [`values`][Self::values] resolves the whole list once and
caches it until the option is re-applied. Cloning is cheap and every clone
observes the same underlying option.
*/
pub struct Valued<T> {
    node: Rc<RefCell<ValuedNode<T>>>,
}

impl<T> Clone for Valued<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T: FromArg + Clone + 'static> Valued<T> {
    pub(crate) fn new(tags: Tags) -> Self {
        Self::with_converter(tags, Standard::new())
    }
}

impl<T: Clone + 'static> Valued<T> {
    pub(crate) fn with_converter(
        tags: Tags,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Self {
        Self {
            node: Rc::new(RefCell::new(ValuedNode {
                tags,
                description: None,
                required: false,
                multi: false,
                raws: Vec::new(),
                converter: Box::new(converter),
                checks: CheckSet::new(),
                default: None,
                cache: ValueCell::Unset,
            })),
        }
    }

    pub(crate) fn shared(&self) -> SharedOption {
        let shared: SharedOption = self.node.clone();
        shared
    }

    /// Mark the option required: invocation fails unless it is supplied.
    pub fn required(self) -> Self {
        self.node.borrow_mut().required = true;
        self
    }

    /// Allow the option to be supplied more than once;
    /// [`values`][Self::values] observes all of them.
    pub fn multi(self) -> Self {
        self.node.borrow_mut().multi = true;
        self
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        self.node.borrow_mut().description = Some(description.into());
        self
    }

    /// The value reads fall back to when the option wasn't supplied.
    pub fn default_value(self, value: T) -> Self {
        self.node.borrow_mut().default = Some(value);
        self
    }

    /// Append one validation check.
    pub fn check(self, check: impl Check<T> + 'static) -> Self {
        {
            let mut node = self.node.borrow_mut();
            let checks = std::mem::take(&mut node.checks);
            node.checks = checks.with(check);
        }
        self
    }

    /// AND-compose a whole [`CheckSet`]; the sets flatten into one list.
    pub fn checks(self, checks: CheckSet<T>) -> Self {
        {
            let mut node = self.node.borrow_mut();
            let existing = std::mem::take(&mut node.checks);
            node.checks = existing.merge(checks);
        }
        self
    }

    /// Replace the conversion pipeline for this option.
    pub fn convert_with(
        self,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Self {
        self.node.borrow_mut().converter = Box::new(converter);
        self
    }

    pub fn supplied(&self) -> bool {
        self.node.borrow().supplied()
    }

    /// The typed value, or `None` when the option wasn't supplied and has
    /// no default.
    pub fn get(&self) -> Result<Option<T>, ParseError> {
        self.node.borrow().get()
    }

    /// The typed value; an absent option with no default is an error naming
    /// the option.
    pub fn value(&self) -> Result<T, ParseError> {
        match self.node.borrow().get()? {
            Some(value) => Ok(value),
            None => Err(ParseError::MissingOption(
                self.node.borrow().tags.to_string(),
            )),
        }
    }

    /// Every supplied value in application order.
    pub fn values(&self) -> Result<Vec<T>, ParseError> {
        self.node.borrow_mut().values()
    }
}

/// How a [`Group`] constrains its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// All-or-none: supplying a strict subset of the children is an error.
    All,

    /// At least one child, enforced only when the group is required.
    Any,

    /// At most one child; a required group makes it exactly one.
    One,
}

/**
An ordered set of options constrained jointly by a [`Combinator`].

A group is populated first and then attached to a command with
[`add_group`][crate::command::Command::add_group]; its children resolve and
bind exactly like top-level options, while the cardinality constraint and
`required` apply to the group as a whole (the children's own `required` is
not consulted).
*/
pub struct Group {
    label: Option<String>,
    combinator: Combinator,
    required: bool,
    children: Vec<SharedOption>,
}

impl Group {
    #[must_use]
    pub fn new(combinator: Combinator) -> Self {
        Self {
            label: None,
            combinator,
            required: false,
            children: Vec::new(),
        }
    }

    /// Display label for help rendering.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Require the group as a whole: under [`Combinator::Any`] and
    /// [`Combinator::One`] at least one child must be supplied, under
    /// [`Combinator::All`] all of them.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declare a flag inside the group.
    pub fn flag(&mut self, tags: Tags) -> Flag {
        let flag = Flag::new(tags);
        self.children.push(flag.shared());
        flag
    }

    /// Declare a valued option inside the group.
    pub fn option<T>(&mut self, tags: Tags) -> Valued<T>
    where
        T: FromArg + Clone + 'static,
    {
        let option = Valued::new(tags);
        self.children.push(option.shared());
        option
    }

    /// Declare a valued option with a custom conversion pipeline.
    pub fn option_with<T>(
        &mut self,
        tags: Tags,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Valued<T>
    where
        T: Clone + 'static,
    {
        let option = Valued::with_converter(tags, converter);
        self.children.push(option.shared());
        option
    }

    fn names(&self) -> String {
        self.children
            .iter()
            .map(|child| child.borrow().tags().to_string())
            .join_with(", ")
            .to_string()
    }

    fn supplied_names(&self) -> String {
        self.children
            .iter()
            .filter(|child| child.borrow().supplied())
            .map(|child| child.borrow().tags().to_string())
            .join_with(", ")
            .to_string()
    }

    pub(crate) fn enforce(&self) -> Result<(), ParseError> {
        let supplied = self
            .children
            .iter()
            .filter(|child| child.borrow().supplied())
            .count();

        match self.combinator {
            Combinator::All if supplied != 0 && supplied != self.children.len() => {
                Err(ParseError::GroupPartial { names: self.names() })
            }
            Combinator::One if supplied > 1 => Err(ParseError::GroupConflict {
                names: self.supplied_names(),
            }),
            Combinator::All | Combinator::Any | Combinator::One
                if self.required && supplied == 0 =>
            {
                Err(ParseError::GroupMissing { names: self.names() })
            }
            _ => Ok(()),
        }
    }
}

enum OptionEntry {
    Named(SharedOption),
    Group(Group),
}

/// Ordered, name-indexed collection of one command's options.
///
/// Iteration (for help and validation) follows insertion order over
/// top-level entries; lookup by tag resolves group children individually,
/// so value application never cares about grouping.
pub(crate) struct OptionRegistry {
    entries: Vec<OptionEntry>,
    by_short: HashMap<char, SharedOption>,
    by_long: HashMap<String, SharedOption>,
}

impl OptionRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_short: HashMap::new(),
            by_long: HashMap::new(),
        }
    }

    /// Index one leaf option by its tags.
    ///
    /// # Panics
    ///
    /// Panics if either tag collides with an already-registered option;
    /// identity collisions are declaration bugs.
    fn register(&mut self, option: &SharedOption) {
        let tags = option.borrow().tags().clone();

        if let Some(short) = tags.short_tag()
            && self.by_short.contains_key(&short)
        {
            panic!("duplicate option -{short}");
        }
        if let Some(long) = tags.long_name()
            && self.by_long.contains_key(long)
        {
            panic!("duplicate option --{long}");
        }

        if let Some(short) = tags.short_tag() {
            self.by_short.insert(short, option.clone());
        }
        if let Some(long) = tags.long_name() {
            self.by_long.insert(long.to_owned(), option.clone());
        }
    }

    pub(crate) fn add_named(&mut self, option: SharedOption) {
        self.register(&option);
        self.entries.push(OptionEntry::Named(option));
    }

    pub(crate) fn add_group(&mut self, group: Group) {
        for child in &group.children {
            self.register(child);
        }
        self.entries.push(OptionEntry::Group(group));
    }

    pub(crate) fn by_long(&self, name: &str) -> Option<SharedOption> {
        self.by_long.get(name).cloned()
    }

    pub(crate) fn by_short(&self, tag: char) -> Option<SharedOption> {
        self.by_short.get(&tag).cloned()
    }

    /// Store one application on an option, subject to the uniform
    /// duplicate check: a non-multi option may only be applied once,
    /// whether as a flag or with a value, in short or long form.
    pub(crate) fn apply(option: &SharedOption, raw: &str) -> Result<(), ParseError> {
        let mut node = option.borrow_mut();
        if !node.multi() && node.supplied() {
            return Err(ParseError::Repeated(node.tags().to_string()));
        }

        trace!(option = %node.tags(), raw, "option applied");
        node.apply(raw);
        Ok(())
    }

    /// Clear every option's applied state. Invocations are independent:
    /// each scan of this registry starts from nothing supplied.
    pub(crate) fn reset_all(&self) {
        for entry in &self.entries {
            match entry {
                OptionEntry::Named(option) => option.borrow_mut().reset(),
                OptionEntry::Group(group) => {
                    for child in &group.children {
                        child.borrow_mut().reset();
                    }
                }
            }
        }
    }

    /// Post-scan validation: required options present, group cardinalities
    /// respected. Runs before any subcommand dispatch or positional
    /// binding.
    pub(crate) fn validate(&self) -> Result<(), ParseError> {
        for entry in &self.entries {
            match entry {
                OptionEntry::Named(option) => {
                    let node = option.borrow();
                    if node.required() && !node.supplied() {
                        return Err(ParseError::MissingOption(node.tags().to_string()));
                    }
                }
                OptionEntry::Group(group) => group.enforce()?,
            }
        }
        Ok(())
    }

    pub(crate) fn summaries(&self) -> Vec<HelpEntry> {
        self.entries
            .iter()
            .map(|entry| match entry {
                OptionEntry::Named(option) => HelpEntry::Option(OptionSummary::of(&*option.borrow())),
                OptionEntry::Group(group) => HelpEntry::Group(GroupSummary {
                    label: group.label.clone(),
                    combinator: group.combinator,
                    required: group.required,
                    options: group
                        .children
                        .iter()
                        .map(|child| OptionSummary::of(&*child.borrow()))
                        .collect(),
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Combinator, Flag, Group, OptionRegistry, Tags, Valued};
    use crate::errors::ParseError;

    #[test]
    fn tags_prefer_the_long_form_for_display() {
        assert_eq!(Tags::both('v', "verbose").to_string(), "--verbose");
        assert_eq!(Tags::short('v').to_string(), "-v");
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn empty_long_name_is_a_configuration_error() {
        let _ = Tags::long("");
    }

    #[test]
    #[should_panic(expected = "duplicate option --color")]
    fn identity_collision_is_a_configuration_error() {
        let mut registry = OptionRegistry::new();
        registry.add_named(Flag::new(Tags::long("color")).shared());
        registry.add_named(Flag::new(Tags::both('c', "color")).shared());
    }

    #[test]
    fn non_multi_option_rejects_a_second_application() {
        let flag = Flag::new(Tags::long("force"));
        let shared = flag.shared();

        OptionRegistry::apply(&shared, "").unwrap();
        let error = OptionRegistry::apply(&shared, "").unwrap_err();
        assert!(matches!(error, ParseError::Repeated(name) if name == "--force"));
    }

    #[test]
    fn multi_flag_counts_applications() {
        let flag = Flag::new(Tags::short('v')).multi();
        let shared = flag.shared();

        for _ in 0..3 {
            OptionRegistry::apply(&shared, "").unwrap();
        }
        assert_eq!(flag.count(), 3);
    }

    #[test]
    fn scalar_reads_resolve_fresh_and_last_application_wins() {
        let level: Valued<u32> = Valued::new(Tags::long("level")).multi();
        let shared = level.shared();

        OptionRegistry::apply(&shared, "1").unwrap();
        OptionRegistry::apply(&shared, "7").unwrap();
        assert_eq!(level.value().unwrap(), 7);
    }

    #[test]
    fn reapplication_invalidates_the_cached_array() {
        let tag: Valued<String> = Valued::new(Tags::long("tag")).multi();
        let shared = tag.shared();

        OptionRegistry::apply(&shared, "a").unwrap();
        assert_eq!(tag.values().unwrap(), ["a"]);

        OptionRegistry::apply(&shared, "b").unwrap();
        assert_eq!(tag.values().unwrap(), ["a", "b"]);
    }

    #[test]
    fn absent_option_falls_back_to_default_or_errors() {
        let with_default: Valued<u32> = Valued::new(Tags::long("jobs")).default_value(4);
        assert_eq!(with_default.value().unwrap(), 4);

        let bare: Valued<u32> = Valued::new(Tags::long("jobs"));
        assert!(matches!(
            bare.value().unwrap_err(),
            ParseError::MissingOption(name) if name == "--jobs"
        ));
        assert_eq!(bare.get().unwrap(), None);
    }

    #[test]
    fn conversion_failure_names_the_option_and_raw() {
        let level: Valued<u32> = Valued::new(Tags::long("level"));
        let shared = level.shared();
        OptionRegistry::apply(&shared, "loud").unwrap();

        match level.value().unwrap_err() {
            ParseError::Invalid { name, raw, .. } => {
                assert_eq!(name, "--level");
                assert_eq!(raw, "loud");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn supplied(option: &Flag) {
        OptionRegistry::apply(&option.shared(), "").unwrap();
    }

    #[test]
    fn one_group_rejects_two_selections() {
        let mut group = Group::new(Combinator::One);
        let json = group.flag(Tags::long("json"));
        let plain = group.flag(Tags::long("plain"));

        assert!(group.enforce().is_ok());

        supplied(&json);
        supplied(&plain);
        assert!(matches!(
            group.enforce().unwrap_err(),
            ParseError::GroupConflict { names } if names == "--json, --plain"
        ));
    }

    #[test]
    fn group_children_may_take_values() {
        let mut group = Group::new(Combinator::One);
        let output: Valued<String> = group.option(Tags::long("output"));
        let stdout = group.flag(Tags::long("stdout"));

        OptionRegistry::apply(&output.shared(), "a.txt").unwrap();
        assert!(group.enforce().is_ok());
        assert_eq!(output.value().unwrap(), "a.txt");

        supplied(&stdout);
        assert!(matches!(
            group.enforce().unwrap_err(),
            ParseError::GroupConflict { .. }
        ));
    }

    #[test]
    fn optional_one_group_accepts_zero_but_required_does_not() {
        let mut optional = Group::new(Combinator::One);
        optional.flag(Tags::long("json"));
        assert!(optional.enforce().is_ok());

        let mut required = Group::new(Combinator::One).required();
        required.flag(Tags::long("json"));
        assert!(matches!(
            required.enforce().unwrap_err(),
            ParseError::GroupMissing { .. }
        ));
    }

    #[test]
    fn all_group_is_all_or_none() {
        let mut group = Group::new(Combinator::All);
        let user = group.flag(Tags::long("user"));
        group.flag(Tags::long("password"));

        assert!(group.enforce().is_ok());

        supplied(&user);
        assert!(matches!(
            group.enforce().unwrap_err(),
            ParseError::GroupPartial { .. }
        ));
    }

    #[test]
    fn required_any_group_needs_at_least_one() {
        let mut group = Group::new(Combinator::Any).required();
        let color = group.flag(Tags::long("color"));
        group.flag(Tags::long("mono"));

        assert!(matches!(
            group.enforce().unwrap_err(),
            ParseError::GroupMissing { .. }
        ));

        supplied(&color);
        assert!(group.enforce().is_ok());
    }
}

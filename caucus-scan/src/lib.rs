#![no_std]

/*!
Low-level classification of raw command-line tokens. This crate decides
whether a token is a long option, a short cluster, an attached
`--option=value` pair, or the positional boundary where option scanning
stops. No name resolution or type handling happens here; both are delegated
to a [`Visitor`], so this is usually too low level to use directly.
*/

/**
Whether an option consumes a value token.

Reported by the [`Visitor`] when the [`Scanner`] hands it an option name.
This is how the scanner learns that the *next* token on the command line
belongs to the option it just saw.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// The option is a bare flag; the visitor has already applied it.
    Flag,

    /// The option takes a value. The scanner delivers the next token
    /// verbatim through [`Visitor::value`].
    Valued,
}

/**
The [`Scanner`] operates by handing the option names it finds to a
`Visitor`, which owns name resolution and raw-value storage.

Consider `--foo bar`. Is that a flag `--foo` followed by the positional
`bar`, or an option `--foo` whose value is `bar`? The scanner can't classify
this on its own, so the visitor answers each resolution with an [`Arity`]
and the scanner takes care of where the value actually comes from.
*/
pub trait Visitor<'arg> {
    type Error;

    /// A long option (`--name`). Returning [`Arity::Valued`] claims the next
    /// token as this option's raw value, regardless of any leading dashes.
    fn long(&mut self, name: &'arg str) -> Result<Arity, Self::Error>;

    /// A long option with an attached value (`--name=value`). The visitor
    /// applies the value immediately; a flag receiving one is its error to
    /// report.
    fn long_with_value(&mut self, name: &'arg str, value: &'arg str) -> Result<(), Self::Error>;

    /// One short tag out of `-a` or a cluster `-abc`, resolved
    /// independently of its neighbors.
    fn short(&mut self, tag: char) -> Result<Arity, Self::Error>;

    /// The raw value claimed by the most recent [`Arity::Valued`] response.
    fn value(&mut self, raw: &'arg str) -> Result<(), Self::Error>;

    /// A valued option never received its value: it was the last token on
    /// the line, or it sat in the interior of a short cluster.
    fn missing_value(&mut self) -> Self::Error;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Classifying tokens as options until the positional boundary.
    ScanningOptions,

    /// A valued option is waiting; the next token is its value, verbatim.
    AwaitingValue,
}

enum Kind<'arg> {
    Long(&'arg str),
    Cluster(&'arg str),
    Positional,
}

/// A bare `-` is a positional (commonly "read stdin"), and a bare `--` gets
/// no end-of-options treatment here: both land on the boundary.
fn classify(token: &str) -> Kind<'_> {
    if let Some(body) = token.strip_prefix("--") {
        match body.is_empty() {
            true => Kind::Positional,
            false => Kind::Long(body),
        }
    } else if let Some(cluster) = token.strip_prefix('-') {
        match cluster.is_empty() {
            true => Kind::Positional,
            false => Kind::Cluster(cluster),
        }
    } else {
        Kind::Positional
    }
}

fn split_attached(body: &str) -> Option<(&str, &str)> {
    // '=' is ASCII, so both halves stay valid UTF-8
    memchr::memchr(b'=', body.as_bytes()).map(|at| (&body[..at], &body[at + 1..]))
}

/**
The token classifier state machine.

A `Scanner` walks one command's argument slice from the front, feeding every
option it finds into a [`Visitor`] until it reaches the first token that is
neither an option nor a pending option value. That index is the *positional
boundary*: everything from it onward belongs to subcommand dispatch or
positional binding, and is never re-scanned as options.

The scanner operates entirely on borrowed data; the `'arg` lifetime refers
to the argument slice loaded once near the start of the program.
*/
#[derive(Debug, Clone)]
pub struct Scanner<'arg, S> {
    args: &'arg [S],
    cursor: usize,
    state: State,
}

impl<'arg, S> Scanner<'arg, S>
where
    S: AsRef<str>,
{
    /// Create a scanner over one command's argument slice. The slice should
    /// *exclude* the program name commonly passed as the first argument.
    #[inline]
    #[must_use]
    pub fn new(args: &'arg [S]) -> Self {
        Self {
            args,
            cursor: 0,
            state: State::ScanningOptions,
        }
    }

    /**
    Drive the state machine over the whole slice.

    Returns the index of the positional boundary, or `None` if every token
    was consumed as an option or option value. The boundary token itself is
    not consumed; the caller decides whether it names a subcommand or starts
    the positional arguments.
    */
    pub fn scan<V>(mut self, visitor: &mut V) -> Result<Option<usize>, V::Error>
    where
        V: Visitor<'arg>,
    {
        while let Some(token) = self.args.get(self.cursor).map(AsRef::as_ref) {
            match self.state {
                State::AwaitingValue => {
                    self.cursor += 1;
                    self.state = State::ScanningOptions;
                    visitor.value(token)?;
                }
                State::ScanningOptions => match classify(token) {
                    Kind::Long(body) => {
                        self.cursor += 1;
                        match split_attached(body) {
                            Some((name, value)) => visitor.long_with_value(name, value)?,
                            None => {
                                if visitor.long(body)? == Arity::Valued {
                                    self.state = State::AwaitingValue;
                                }
                            }
                        }
                    }
                    Kind::Cluster(cluster) => {
                        self.cursor += 1;
                        let mut tags = cluster.chars().peekable();
                        while let Some(tag) = tags.next() {
                            match visitor.short(tag)? {
                                Arity::Flag => {}
                                // only the final tag in a cluster may claim
                                // the next token
                                Arity::Valued if tags.peek().is_none() => {
                                    self.state = State::AwaitingValue;
                                }
                                Arity::Valued => return Err(visitor.missing_value()),
                            }
                        }
                    }
                    Kind::Positional => return Ok(Some(self.cursor)),
                },
            }
        }

        match self.state {
            State::AwaitingValue => Err(visitor.missing_value()),
            State::ScanningOptions => Ok(None),
        }
    }
}

#[cfg(test)]
extern crate std;

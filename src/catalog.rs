/*!
Pre-built checkers and converters for common argument shapes.

Each member is a thin strategy over the [`Check`]/[`Convert`] traits; the
engine itself only ever sees those interfaces.
*/

use core::fmt::Display;
use core::ops::RangeBounds;
use std::path::PathBuf;

use joinery::JoinableIterator;
use lazy_format::lazy_format;
use regex::Regex;

use crate::check::Check;
use crate::convert::{Convert, Invalid};

/// Accept values inside `range`.
pub fn range<T, R>(range: R) -> impl Check<T> + 'static
where
    T: PartialOrd + Display + 'static,
    R: RangeBounds<T> + 'static,
{
    move |value: &T| match range.contains(value) {
        true => Ok(()),
        false => Err(Invalid::new(lazy_format!("{value} is out of range"))),
    }
}

/// Accept only values from a fixed set.
pub fn one_of<T>(allowed: impl IntoIterator<Item = T>) -> impl Check<T> + 'static
where
    T: PartialEq + Display + 'static,
{
    let allowed: Vec<T> = allowed.into_iter().collect();

    move |value: &T| match allowed.contains(value) {
        true => Ok(()),
        false => {
            let list = allowed.iter().join_with(", ");
            Err(Invalid::new(lazy_format!("must be one of {list}")))
        }
    }
}

/// Checker accepting strings that match a regular expression. Built with
/// [`matches`].
#[derive(Debug, Clone)]
pub struct PatternCheck {
    regex: Regex,
}

impl Check<String> for PatternCheck {
    fn check(&self, value: &String) -> Result<(), Invalid> {
        match self.regex.is_match(value) {
            true => Ok(()),
            false => Err(Invalid::new(lazy_format!(
                "does not match {pattern:?}",
                pattern = self.regex.as_str()
            ))),
        }
    }
}

/// Accept strings matching `pattern`.
///
/// # Panics
///
/// Panics if `pattern` is not a valid regular expression; the pattern is
/// part of the CLI declaration, so a bad one is a configuration error.
pub fn matches(pattern: &str) -> PatternCheck {
    match Regex::new(pattern) {
        Ok(regex) => PatternCheck { regex },
        Err(error) => panic!("invalid check pattern {pattern:?}: {error}"),
    }
}

/// Accept paths that exist on the filesystem at check time.
pub fn path_exists() -> impl Check<PathBuf> + 'static {
    |path: &PathBuf| match path.exists() {
        true => Ok(()),
        false => Err(Invalid::new(lazy_format!(
            "{path} does not exist",
            path = path.display()
        ))),
    }
}

/// Converter splitting `key=value` pairs at the first `=`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValue;

impl Convert for KeyValue {
    type Input = String;
    type Output = (String, String);

    fn convert(&self, input: String) -> Result<(String, String), Invalid> {
        match input.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
            _ => Err(Invalid::new("expected a key=value pair")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValue, matches, one_of, range};
    use crate::check::Check;
    use crate::convert::Convert;

    #[test]
    fn range_rejects_out_of_bounds() {
        let level = range(0u32..=9);
        assert!(level.check(&9).is_ok());
        assert_eq!(level.check(&10).unwrap_err().to_string(), "10 is out of range");
    }

    #[test]
    fn one_of_lists_alternatives() {
        let format = one_of(["json".to_owned(), "plain".to_owned()]);
        assert!(format.check(&"json".to_owned()).is_ok());
        assert_eq!(
            format.check(&"xml".to_owned()).unwrap_err().to_string(),
            "must be one of json, plain"
        );
    }

    #[test]
    fn matches_applies_the_pattern() {
        let ident = matches("^[a-z][a-z0-9-]*$");
        assert!(ident.check(&"build-id".to_owned()).is_ok());
        assert!(ident.check(&"9lives".to_owned()).is_err());
    }

    #[test]
    #[should_panic(expected = "invalid check pattern")]
    fn bad_pattern_is_a_configuration_error() {
        let _ = matches("(unclosed");
    }

    #[test]
    fn key_value_splits_once() {
        let pair = KeyValue.convert("env=prod=eu".to_owned()).unwrap();
        assert_eq!(pair, ("env".to_owned(), "prod=eu".to_owned()));
        assert!(KeyValue.convert("=missing-key".to_owned()).is_err());
        assert!(KeyValue.convert("no-separator".to_owned()).is_err());
    }
}

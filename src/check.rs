/*!
Validation predicates over converted values.

Checks compose under AND semantics only: a [`CheckSet`] is a flat list that
runs in one linear scan and short-circuits on the first failure, whose
reason is reported verbatim. Merging two sets concatenates their lists, so
nested AND compositions always flatten instead of stacking.
*/

use crate::convert::Invalid;

/// A pure validation predicate over a typed value. Any `Fn(&T) ->
/// Result<(), Invalid>` closure is a check.
pub trait Check<T> {
    fn check(&self, value: &T) -> Result<(), Invalid>;
}

impl<T, F> Check<T> for F
where
    F: Fn(&T) -> Result<(), Invalid>,
{
    #[inline]
    fn check(&self, value: &T) -> Result<(), Invalid> {
        self(value)
    }
}

/// An AND-composed collection of checks.
pub struct CheckSet<T> {
    checks: Vec<Box<dyn Check<T>>>,
}

impl<T> CheckSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Append one more check.
    #[must_use]
    pub fn with(mut self, check: impl Check<T> + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// AND-compose with another set by concatenating its checks, keeping
    /// the whole composition one flat list.
    #[must_use]
    pub fn merge(mut self, other: CheckSet<T>) -> Self {
        self.checks.extend(other.checks);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Run every check in order, stopping at the first failure.
    pub fn check(&self, value: &T) -> Result<(), Invalid> {
        self.checks.iter().try_for_each(|check| check.check(value))
    }
}

impl<T> Default for CheckSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolution state of a lazily converted binding.
///
/// Raw strings accumulate on options and parameters during scanning; the
/// typed view is only materialized when application code asks for it. Every
/// raw application moves the cell to [`RawOnly`][ValueCell::RawOnly], so a
/// previously resolved value can never be observed stale.
#[derive(Debug, Clone, Default)]
pub(crate) enum ValueCell<T> {
    /// No raw value has ever been applied.
    #[default]
    Unset,

    /// Raw values exist but nothing has been resolved yet, either because
    /// no read happened or because a re-application invalidated one.
    RawOnly,

    /// The converted-and-checked result as of the last read.
    Resolved(T),
}

impl<T> ValueCell<T> {
    /// Every raw application lands here: whatever was resolved is stale now.
    pub(crate) fn invalidate(&mut self) {
        *self = Self::RawOnly;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::Unset;
    }

    pub(crate) fn resolved(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Unset | Self::RawOnly => None,
        }
    }

    pub(crate) fn store(&mut self, value: T) {
        *self = Self::Resolved(value);
    }
}

#[cfg(test)]
mod tests {
    use super::ValueCell;

    #[test]
    fn invalidate_discards_resolution() {
        let mut cell = ValueCell::Unset;
        cell.store(3);
        assert_eq!(cell.resolved(), Some(&3));

        cell.invalidate();
        assert_eq!(cell.resolved(), None);
        assert!(matches!(cell, ValueCell::RawOnly));
    }

    #[test]
    fn reset_returns_to_unset() {
        let mut cell = ValueCell::Resolved("x");
        cell.reset();
        assert!(matches!(cell, ValueCell::Unset));
    }
}

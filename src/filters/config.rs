use super::selection::FilterAxis;

/// Matching rules for filter values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Shortest prefix accepted in a valid set. Two keeps a stray "S" from
    /// matching half the catalog.
    pub min_prefix_len: usize,

    /// Period names include single-letter "I" and "V".
    pub min_period_len: usize,

    /// Also match prefixes against the code minus its first character
    /// (some units prepend an organizational letter).
    pub strip_leading_char: bool,
}

impl FilterConfig {
    pub fn min_len(&self, axis: FilterAxis) -> usize {
        match axis {
            FilterAxis::Prefix => self.min_prefix_len,
            FilterAxis::Period => self.min_period_len,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_prefix_len: 2,
            min_period_len: 1,
            strip_leading_char: true,
        }
    }
}

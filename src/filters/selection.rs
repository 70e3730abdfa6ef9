use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterAxis {
    Prefix,
    Period,
}

impl FilterAxis {
    pub const ALL: [FilterAxis; 2] = [FilterAxis::Prefix, FilterAxis::Period];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "prefix" | "prefixes" => Some(FilterAxis::Prefix),
            "period" | "periods" => Some(FilterAxis::Period),
            _ => None,
        }
    }
}

impl fmt::Display for FilterAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterAxis::Prefix => f.write_str("prefix"),
            FilterAxis::Period => f.write_str("period"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Polarity {
    Positive,
    Negative,
}

/// State of one option in the tri-state option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionState {
    Unset,
    Included,
    Excluded,
}

/// Ordered, duplicate-free list of filter values as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterValues(Vec<String>);

impl FilterValues {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for value in values {
            set.insert(value.into());
        }
        set
    }

    /// Decode the legacy comma-joined storage form. Empty segments are kept
    /// so a value like `"CS,"` fails validation the same way it always has.
    pub fn from_joined(joined: &str) -> Self {
        if joined.is_empty() {
            return Self::default();
        }
        Self(joined.split(',').map(str::to_string).collect())
    }

    pub fn insert(&mut self, value: String) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.0.push(value);
        true
    }

    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != value);
        self.0.len() != before
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|existing| existing == value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Non-empty and every member at least `min_len` characters long.
    pub fn is_valid(&self, min_len: usize) -> bool {
        !self.0.is_empty() && self.0.iter().all(|v| v.chars().count() >= min_len)
    }
}

/// What one axis asks of a course once precedence has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisRule<'a> {
    Include(&'a FilterValues),
    Exclude(&'a FilterValues),
    Unconstrained,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSelection {
    pub positive: FilterValues,
    pub negative: FilterValues,
}

impl AxisSelection {
    pub fn values(&self, polarity: Polarity) -> &FilterValues {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }

    pub fn values_mut(&mut self, polarity: Polarity) -> &mut FilterValues {
        match polarity {
            Polarity::Positive => &mut self.positive,
            Polarity::Negative => &mut self.negative,
        }
    }

    /// A valid positive set wins; the negative set only applies without one.
    pub fn rule(&self, min_len: usize) -> AxisRule<'_> {
        if self.positive.is_valid(min_len) {
            AxisRule::Include(&self.positive)
        } else if self.negative.is_valid(min_len) {
            AxisRule::Exclude(&self.negative)
        } else {
            AxisRule::Unconstrained
        }
    }

    pub fn state_of(&self, option: &str) -> OptionState {
        if self.positive.contains(option) {
            OptionState::Included
        } else if self.negative.contains(option) {
            OptionState::Excluded
        } else {
            OptionState::Unset
        }
    }

    /// Advance `option` one step through unset -> included -> excluded -> unset.
    pub fn cycle(&mut self, option: &str) -> OptionState {
        match self.state_of(option) {
            OptionState::Included => {
                self.positive.remove(option);
                self.negative.insert(option.to_string());
                OptionState::Excluded
            }
            OptionState::Excluded => {
                self.negative.remove(option);
                OptionState::Unset
            }
            OptionState::Unset => {
                self.positive.insert(option.to_string());
                OptionState::Included
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub prefixes: AxisSelection,
    pub periods: AxisSelection,
}

impl FilterSelection {
    pub fn axis(&self, axis: FilterAxis) -> &AxisSelection {
        match axis {
            FilterAxis::Prefix => &self.prefixes,
            FilterAxis::Period => &self.periods,
        }
    }

    pub fn axis_mut(&mut self, axis: FilterAxis) -> &mut AxisSelection {
        match axis {
            FilterAxis::Prefix => &mut self.prefixes,
            FilterAxis::Period => &mut self.periods,
        }
    }
}

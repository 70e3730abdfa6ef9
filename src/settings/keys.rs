use std::fmt;

use crate::filters::{FilterAxis, Polarity};

/// Every storage key the engine reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Prefixes,
    NotPrefixes,
    Periods,
    NotPeriods,
    CoursePeriods,
    CoursesLoaded,
    Dirty,
}

impl SettingKey {
    pub const ALL: [SettingKey; 7] = [
        SettingKey::Prefixes,
        SettingKey::NotPrefixes,
        SettingKey::Periods,
        SettingKey::NotPeriods,
        SettingKey::CoursePeriods,
        SettingKey::CoursesLoaded,
        SettingKey::Dirty,
    ];

    /// Storage key as the options page knows it.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Prefixes => "prefixes",
            SettingKey::NotPrefixes => "not-prefixes",
            SettingKey::Periods => "periods",
            SettingKey::NotPeriods => "not-periods",
            SettingKey::CoursePeriods => "coursePeriods",
            SettingKey::CoursesLoaded => "coursesLoaded",
            SettingKey::Dirty => "dirty",
        }
    }

    pub fn filter(axis: FilterAxis, polarity: Polarity) -> Self {
        match (axis, polarity) {
            (FilterAxis::Prefix, Polarity::Positive) => SettingKey::Prefixes,
            (FilterAxis::Prefix, Polarity::Negative) => SettingKey::NotPrefixes,
            (FilterAxis::Period, Polarity::Positive) => SettingKey::Periods,
            (FilterAxis::Period, Polarity::Negative) => SettingKey::NotPeriods,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

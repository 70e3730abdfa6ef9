//! Persisted filter selection and the change signals shared with the options UI.

pub mod keys;
pub mod store;

pub use keys::SettingKey;
pub use store::{CoursePeriods, SettingsStore};

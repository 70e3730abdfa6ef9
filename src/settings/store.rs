use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::warn;
use rusqlite::Connection;
use serde_json::Value;

use crate::db::{
    repositories::settings::{read_setting, remove_setting, write_setting},
    Database,
};
use crate::filters::{FilterAxis, FilterSelection, FilterValues, OptionState, Polarity};

use super::keys::SettingKey;

/// Course code -> period-range label, as shown next to each listing.
pub type CoursePeriods = BTreeMap<String, String>;

/// Typed accessors over the persisted settings table.
#[derive(Clone)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All four filter sets, read in one task so they come from the same moment.
    pub async fn filter_selection(&self) -> Result<FilterSelection> {
        self.db.execute(read_selection).await
    }

    pub async fn filter_values(&self, axis: FilterAxis, polarity: Polarity) -> Result<FilterValues> {
        let key = SettingKey::filter(axis, polarity);
        let raw = self.db.get_setting(key).await?;
        Ok(decode_filter_values(key, raw.as_deref()))
    }

    pub async fn set_filter_values(
        &self,
        axis: FilterAxis,
        polarity: Polarity,
        values: &FilterValues,
    ) -> Result<()> {
        let encoded = serde_json::to_string(values).context("failed to encode filter values")?;
        self.db
            .execute(move |conn| {
                let tx = conn
                    .transaction()
                    .context("failed to open filter transaction")?;
                write_setting(&tx, SettingKey::filter(axis, polarity), &encoded)?;
                mark_filters_changed(&tx)?;
                tx.commit().context("failed to commit filter change")
            })
            .await
    }

    /// Advance one option through unset -> included -> excluded -> unset and
    /// mark the selection dirty.
    pub async fn cycle_option(&self, axis: FilterAxis, option: &str) -> Result<OptionState> {
        let option = option.to_string();
        self.db
            .execute(move |conn| {
                let mut selection = read_selection(conn)?;
                let axis_selection = selection.axis_mut(axis);
                let state = axis_selection.cycle(&option);

                let tx = conn
                    .transaction()
                    .context("failed to open option transaction")?;
                for polarity in [Polarity::Positive, Polarity::Negative] {
                    let encoded = serde_json::to_string(axis_selection.values(polarity))?;
                    write_setting(&tx, SettingKey::filter(axis, polarity), &encoded)?;
                }
                mark_filters_changed(&tx)?;
                tx.commit().context("failed to commit option change")?;

                Ok(state)
            })
            .await
    }

    /// Drop all four filter sets, leaving both axes unconstrained.
    pub async fn clear_filters(&self) -> Result<()> {
        self.db
            .execute(|conn| {
                let tx = conn
                    .transaction()
                    .context("failed to open filter transaction")?;
                for axis in FilterAxis::ALL {
                    for polarity in [Polarity::Positive, Polarity::Negative] {
                        remove_setting(&tx, SettingKey::filter(axis, polarity))?;
                    }
                }
                mark_filters_changed(&tx)?;
                tx.commit().context("failed to commit filter reset")
            })
            .await
    }

    pub async fn course_periods(&self) -> Result<CoursePeriods> {
        let raw = self.db.get_setting(SettingKey::CoursePeriods).await?;
        Ok(decode_course_periods(raw.as_deref()))
    }

    /// Merge `periods` into the stored map. Returns the size of the merged map.
    /// The map only spans one selection; every filter change empties it.
    pub async fn merge_course_periods(&self, periods: CoursePeriods) -> Result<usize> {
        self.db
            .execute(move |conn| {
                let existing = read_setting(conn, SettingKey::CoursePeriods)?;
                let mut merged = decode_course_periods(existing.as_deref());
                merged.extend(periods);
                let encoded =
                    serde_json::to_string(&merged).context("failed to encode course periods")?;
                write_setting(conn, SettingKey::CoursePeriods, &encoded)?;
                Ok(merged.len())
            })
            .await
    }

    pub async fn courses_loaded(&self) -> Result<bool> {
        self.flag(SettingKey::CoursesLoaded).await
    }

    pub async fn set_courses_loaded(&self, value: bool) -> Result<()> {
        self.set_flag(SettingKey::CoursesLoaded, value).await
    }

    pub async fn dirty(&self) -> Result<bool> {
        self.flag(SettingKey::Dirty).await
    }

    pub async fn set_dirty(&self, value: bool) -> Result<()> {
        self.set_flag(SettingKey::Dirty, value).await
    }

    async fn flag(&self, key: SettingKey) -> Result<bool> {
        let raw = self.db.get_setting(key).await?;
        Ok(matches!(
            raw.as_deref().map(serde_json::from_str::<Value>),
            Some(Ok(Value::Bool(true)))
        ))
    }

    async fn set_flag(&self, key: SettingKey, value: bool) -> Result<()> {
        self.db.put_setting(key, value.to_string()).await
    }
}

/// Flag the change for the options page and drop labels computed under the
/// previous selection.
fn mark_filters_changed(conn: &Connection) -> Result<()> {
    write_setting(conn, SettingKey::Dirty, "true")?;
    remove_setting(conn, SettingKey::CoursePeriods)
}

fn read_selection(conn: &mut Connection) -> Result<FilterSelection> {
    let mut selection = FilterSelection::default();
    for axis in FilterAxis::ALL {
        for polarity in [Polarity::Positive, Polarity::Negative] {
            let key = SettingKey::filter(axis, polarity);
            let raw = read_setting(conn, key)?;
            *selection.axis_mut(axis).values_mut(polarity) =
                decode_filter_values(key, raw.as_deref());
        }
    }
    Ok(selection)
}

/// Accepts a JSON array of strings or the older comma-joined string.
/// Anything else reads as an empty set.
fn decode_filter_values(key: SettingKey, raw: Option<&str>) -> FilterValues {
    let Some(raw) = raw else {
        return FilterValues::default();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => FilterValues::new(
            items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string)),
        ),
        Ok(Value::String(joined)) => FilterValues::from_joined(&joined),
        Ok(Value::Null) => FilterValues::default(),
        Ok(other) => {
            warn!("Ignoring setting '{key}' with unexpected shape: {other}");
            FilterValues::default()
        }
        Err(err) => {
            warn!("Ignoring unreadable setting '{key}': {err}");
            FilterValues::default()
        }
    }
}

fn decode_course_periods(raw: Option<&str>) -> CoursePeriods {
    raw.and_then(|text| match serde_json::from_str::<CoursePeriods>(text) {
        Ok(map) => Some(map),
        Err(err) => {
            warn!("Discarding unreadable '{}' map: {err}", SettingKey::CoursePeriods);
            None
        }
    })
    .unwrap_or_default()
}

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use tokio::{io, sync::mpsc};

use crate::{
    cli::Command,
    filters::{
        catalog::{is_known_option, known_options},
        FilterAxis, FilterSelection, FilterValues, OptionState, Polarity,
    },
    interceptor::{read_chunks, EmitReport, RequestDetails, RequestId},
    settings::CoursePeriods,
    AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    selection: FilterSelection,
    course_periods: CoursePeriods,
    courses_loaded: bool,
    dirty: bool,
    known_prefixes: &'static [&'static str],
    known_periods: &'static [&'static str],
}

pub async fn dispatch(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Filter { url, request_id } => {
            let report = filter_stdin(state, url, request_id).await?;
            info!(
                "{}",
                serde_json::to_string(&report).context("failed to encode emit report")?
            );
        }
        Command::Toggle { axis, option } => {
            let state_after = toggle_option(state, axis, &option).await?;
            println!("{axis} {option}: {}", option_state_label(state_after));
        }
        Command::Set {
            axis,
            polarity,
            values,
        } => set_values(state, axis, polarity, values).await?,
        Command::Reset => {
            state.settings.clear_filters().await?;
            info!("All filters cleared");
        }
        Command::Show => {
            let stored = stored_state(state).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&stored).context("failed to encode settings")?
            );
        }
        Command::Complete { url } => match state.interceptor.on_request_completed(&url) {
            Some(handle) => {
                let delivered = handle.await.context("notification task join failed")?;
                println!("notified: {delivered}");
            }
            None => info!("{url} is not the page shell; nothing to notify"),
        },
        Command::Config { write } => show_config(state, write.as_deref())?,
        Command::Help => print!("{}", crate::cli::HELP),
    }
    Ok(())
}

/// Treat stdin as the response body of `url` and stdout as the page-bound
/// stream.
pub async fn filter_stdin(
    state: &AppState,
    url: String,
    request_id: Option<String>,
) -> Result<EmitReport> {
    let chunk_size = state.interceptor.config().chunk_size;
    let (tx, rx) = mpsc::channel(16);
    let reader = tokio::spawn(read_chunks(io::stdin(), chunk_size, tx));

    let request_id = request_id
        .map(RequestId::from)
        .unwrap_or_else(RequestId::generate);
    let mut stdout = io::stdout();
    let report = state
        .interceptor
        .handle(RequestDetails::new(request_id, url), rx, &mut stdout)
        .await?;

    reader.await.context("stdin reader join failed")??;
    Ok(report)
}

pub async fn toggle_option(state: &AppState, axis: FilterAxis, option: &str) -> Result<OptionState> {
    if !is_known_option(axis, option) {
        warn!("'{option}' is not a known {axis} option; storing it anyway");
    }
    state.settings.cycle_option(axis, option).await
}

async fn set_values(
    state: &AppState,
    axis: FilterAxis,
    polarity: Polarity,
    values: FilterValues,
) -> Result<()> {
    for unknown in values.iter().filter(|value| !is_known_option(axis, value)) {
        warn!("'{unknown}' is not a known {axis} option; storing it anyway");
    }
    state
        .settings
        .set_filter_values(axis, polarity, &values)
        .await
}

async fn stored_state(state: &AppState) -> Result<StoredState> {
    Ok(StoredState {
        selection: state.settings.filter_selection().await?,
        course_periods: state.settings.course_periods().await?,
        courses_loaded: state.settings.courses_loaded().await?,
        dirty: state.settings.dirty().await?,
        known_prefixes: known_options(FilterAxis::Prefix),
        known_periods: known_options(FilterAxis::Period),
    })
}

fn show_config(state: &AppState, write: Option<&Path>) -> Result<()> {
    let config = state.interceptor.config();
    if let Some(path) = write {
        config.persist(path)?;
        info!("Configuration written to {}", path.display());
    }
    println!(
        "{}",
        serde_json::to_string_pretty(config).context("failed to encode configuration")?
    );
    Ok(())
}

fn option_state_label(state: OptionState) -> &'static str {
    match state {
        OptionState::Unset => "unset",
        OptionState::Included => "included",
        OptionState::Excluded => "excluded",
    }
}

pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod envelope;
pub mod filters;
pub mod interceptor;
pub mod models;
pub mod notify;
pub mod settings;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

use cli::Command;
use config::EngineConfig;
use db::Database;
use interceptor::Interceptor;
use notify::{LogChannel, Notifier};
use settings::SettingsStore;

pub struct AppState {
    pub settings: SettingsStore,
    pub interceptor: Interceptor,
}

impl AppState {
    pub fn open(db_path: &Path, config: EngineConfig) -> Result<Self> {
        let database = Database::new(db_path.to_path_buf())?;
        Ok(Self::with_database(database, config))
    }

    pub fn with_database(database: Database, config: EngineConfig) -> Self {
        let settings = SettingsStore::new(database);
        let notifier = Notifier::new(Arc::new(LogChannel), config.retry_policy());
        let interceptor = Interceptor::new(config, settings.clone(), notifier);
        Self {
            settings,
            interceptor,
        }
    }
}

pub fn run() -> Result<()> {
    utils::logging::init();

    let args = cli::parse_args(std::env::args().skip(1))?;
    if args.command == Command::Help {
        print!("{}", cli::HELP);
        return Ok(());
    }

    let config = EngineConfig::resolve(args.config_path.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let state = AppState::open(&args.db_path, config)?;
        let result = commands::dispatch(&state, args.command).await;
        state.interceptor.notifier().shutdown();
        result
    })
}

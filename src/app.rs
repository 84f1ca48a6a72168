use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config;
use crate::data::{CatalogSource, FileCatalogSource};
use crate::logging;
use crate::media;
use crate::prefs::{PreferenceStore, ECO_MODE_KEY};
use crate::session::Session;
use crate::storage;
use crate::ui;

/// Settings taken from the command line. Anything left unset falls back to the
/// config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            data_file: None,
            config_file: None,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

pub fn run(opts: RunOptions) -> Result<()> {
    if let Err(err) = logging::init(&opts.log_level, opts.log_file.clone()) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let data_file = opts
        .data_file
        .unwrap_or_else(|| cfg.catalog.data_file.clone());
    let source = FileCatalogSource::new(data_file);
    let catalog = source
        .load_catalog()
        .with_context(|| format!("load catalog from {}", friendly_path(source.path())))?;
    tracing::info!(
        items = catalog.len(),
        categories = catalog.index().top_level().count(),
        "catalog ready"
    );

    let store = Arc::new(
        storage::Store::open(storage::Options {
            path: cfg.storage.path.clone(),
        })
        .context("open storage")?,
    );
    let eco_pref = match store.load_flag(ECO_MODE_KEY) {
        Ok(flag) => flag,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read eco preference");
            None
        }
    };
    let eco_mode = eco_pref.unwrap_or(false);

    let media_manager = if cfg.media.enabled {
        let media_cfg = media::Config {
            base_dir: source.base_dir().map(Path::to_path_buf),
            workers: cfg.media.workers,
        };
        match media::Manager::new(media_cfg) {
            Ok(manager) => Some(manager),
            Err(err) => {
                tracing::warn!(error = %err, "preview workers unavailable");
                None
            }
        }
    } else {
        None
    };
    let media_handle = media_manager.as_ref().map(|manager| manager.handle());

    let options = ui::Options {
        session: Session::new(Arc::new(catalog)),
        eco_mode,
        probe_performance: eco_pref.is_none(),
        prefs: store.clone(),
        media_handle,
        tick_rate: cfg.ui.tick_rate,
        trigger_margin: cfg.ui.trigger_margin,
        source_label: friendly_path(source.path()),
    };

    let mut model = ui::Model::new(options);
    let result = model.run();

    drop(model);
    drop(media_manager);
    if let Ok(store) = Arc::try_unwrap(store) {
        if let Err(err) = store.close() {
            tracing::warn!(error = %err, "failed to close state database");
        }
    }

    result
}

fn friendly_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            let mut display = String::from("~");
            if !stripped.as_os_str().is_empty() {
                display.push_str(&format!("/{}", stripped.display()));
            }
            return display;
        }
    }
    path.display().to_string()
}

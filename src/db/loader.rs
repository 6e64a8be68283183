use reqwest::Url;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::EntryStore;
use crate::db::entities::watchdog_entry::{Definition, Model};
use crate::notifications::template::{self, TemplateError};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read definitions file at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse definitions file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Entry '{id}' has an invalid interval {interval}; it must be a positive number of minutes")]
    InvalidInterval { id: String, interval: f64 },
    #[error("Entry '{id}' has an invalid hook URL '{hook}'")]
    InvalidHook { id: String, hook: String },
    #[error("Entry '{id}' has an invalid template: {source}")]
    InvalidTemplate { id: String, source: TemplateError },
}

/// Reads watchdog definitions from a JSON file and stores them under `namespace`.
///
/// The file maps each id to its definition:
/// `{"backup": {"name": "Nightly backup", "interval": 1440, "hook": "https://..."}}`.
/// The whole file is validated before anything is stored.
pub async fn load_definitions(
    path: impl AsRef<Path>,
    namespace: &str,
    store: &EntryStore,
) -> Result<usize, LoadError> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let definitions: BTreeMap<String, Definition> =
        serde_json::from_str(&contents).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut entries = Vec::with_capacity(definitions.len());
    for (id, definition) in definitions {
        validate(&id, &definition)?;
        let (entry, dropped) = Model::from_definition(id.clone(), definition);
        if !dropped.is_empty() {
            warn!(entry_id = %id, fields = ?dropped, "Ignoring reserved fields in definition.");
        }
        entries.push(entry);
    }

    let count = entries.len();
    for entry in entries {
        let id = entry.id.clone();
        store.set(namespace, &id, entry).await;
    }
    info!(count, namespace = %namespace, path = ?path, "Loaded watchdog definitions.");
    Ok(count)
}

fn validate(id: &str, definition: &Definition) -> Result<(), LoadError> {
    if !definition.interval.is_finite() || definition.interval <= 0.0 {
        return Err(LoadError::InvalidInterval {
            id: id.to_string(),
            interval: definition.interval,
        });
    }
    if Url::parse(&definition.hook).is_err() {
        return Err(LoadError::InvalidHook {
            id: id.to_string(),
            hook: definition.hook.clone(),
        });
    }
    for templates in [&definition.template_dead, &definition.template_alive]
        .into_iter()
        .flatten()
    {
        template::validate_map(templates).map_err(|source| LoadError::InvalidTemplate {
            id: id.to_string(),
            source,
        })?;
    }
    Ok(())
}

//! Загрузка команд и организаций из JSON файлов контеста

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::Mode;
use crate::error::{IcpcAudioError, Result};
use crate::models::Item;

/// Запись из teams.json
#[derive(Debug, Deserialize)]
struct TeamRecord {
    id: String,
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    organization_id: Option<String>,
}

/// Запись из organizations.json
#[derive(Debug, Deserialize)]
struct OrganizationRecord {
    id: String,
    name: String,
    #[serde(default)]
    formal_name: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

/// Путь к файлу с данными для режима: `<folder>/<mode>.json`
pub fn data_file_path(folder: &Path, mode: Mode) -> PathBuf {
    folder.join(format!("{}.json", mode.as_str()))
}

/// Загрузить элементы из папки контеста
pub fn load_items(folder: &Path, mode: Mode) -> Result<Vec<Item>> {
    let path = data_file_path(folder, mode);
    if !path.is_file() {
        log::error!("Data file not found: {}", path.display());
        return Err(IcpcAudioError::DataNotFound(path));
    }

    let content = std::fs::read_to_string(&path)?;
    let items = parse_items(&content, mode).map_err(|e| match e {
        IcpcAudioError::MalformedData(msg) => {
            IcpcAudioError::MalformedData(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;

    log::info!("Loaded {} {} from {}", items.len(), mode, path.display());
    Ok(items)
}

/// Разобрать JSON массив в элементы, сохраняя порядок
pub fn parse_items(json: &str, mode: Mode) -> Result<Vec<Item>> {
    let items: Vec<Item> = match mode {
        Mode::Teams => serde_json::from_str::<Vec<TeamRecord>>(json)
            .map_err(|e| IcpcAudioError::MalformedData(e.to_string()))?
            .into_iter()
            .map(|r| Item::team(r.id, r.name, r.display_name, r.organization_id))
            .collect(),
        Mode::Organizations => serde_json::from_str::<Vec<OrganizationRecord>>(json)
            .map_err(|e| IcpcAudioError::MalformedData(e.to_string()))?
            .into_iter()
            .map(|r| Item::organization(r.id, r.name, r.formal_name, r.country))
            .collect(),
    };

    let mut seen = HashSet::with_capacity(items.len());
    for item in &items {
        if item.id.trim().is_empty() {
            return Err(IcpcAudioError::MalformedData(
                "item with an empty id".to_string(),
            ));
        }
        if !is_safe_path_component(&item.id) {
            return Err(IcpcAudioError::MalformedData(format!(
                "item id '{}' cannot be used as a directory name",
                item.id
            )));
        }
        if item.display_text.trim().is_empty() {
            return Err(IcpcAudioError::MalformedData(format!(
                "item '{}' has no text to speak",
                item.id
            )));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(IcpcAudioError::DuplicateId(item.id.clone()));
        }
    }

    Ok(items)
}

/// Идентификатор становится именем директории: `<root>/<mode>/<id>/`
fn is_safe_path_component(id: &str) -> bool {
    id != "." && id != ".." && !id.contains(['/', '\\', '\0'])
}

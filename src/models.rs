//! Модели данных icpc-audio

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Тип элемента
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Team,
    Organization,
}

/// Команда или организация, для которой генерируется аудио
///
/// Планировщик и исполнитель работают только с нормализованными полями
/// `id` и `display_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    /// Идентификатор, уникальный в пределах запуска
    pub id: String,
    /// Текст, который отправляется на синтез (не пустой)
    pub display_text: String,
    /// Организация команды (только для передачи дальше)
    pub organization_id: Option<String>,
    /// Страна организации (только для передачи дальше)
    pub country: Option<String>,
}

impl Item {
    /// Команда: display_name, если задано, иначе name
    pub fn team(
        id: impl Into<String>,
        name: impl Into<String>,
        display_name: Option<String>,
        organization_id: Option<String>,
    ) -> Self {
        Self {
            kind: ItemKind::Team,
            id: id.into(),
            display_text: prefer_non_empty(display_name, name.into()),
            organization_id,
            country: None,
        }
    }

    /// Организация: formal_name, если задано, иначе name
    pub fn organization(
        id: impl Into<String>,
        name: impl Into<String>,
        formal_name: Option<String>,
        country: Option<String>,
    ) -> Self {
        Self {
            kind: ItemKind::Organization,
            id: id.into(),
            display_text: prefer_non_empty(formal_name, name.into()),
            organization_id: None,
            country,
        }
    }
}

fn prefer_non_empty(preferred: Option<String>, fallback: String) -> String {
    match preferred {
        Some(text) if !text.trim().is_empty() => text,
        _ => fallback,
    }
}

/// Одна задача генерации: элемент и путь к выходному файлу
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTask {
    pub item: Item,
    pub output_path: PathBuf,
}

/// Причина пропуска элемента
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Выходной файл уже существует
    Exists,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exists => "exists",
        }
    }
}

/// Пропущенный элемент
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRecord {
    pub item: Item,
    pub output_path: PathBuf,
    pub reason: SkipReason,
}

/// Результат выполнения одной задачи
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub task: GenerationTask,
    pub success: bool,
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn succeeded(task: GenerationTask) -> Self {
        Self {
            task,
            success: true,
            error: None,
        }
    }

    pub fn failed(task: GenerationTask, error: impl Into<String>) -> Self {
        Self {
            task,
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_prefers_display_name() {
        let team = Item::team("t2", "Beta", Some("The Betas".to_string()), None);
        assert_eq!(team.display_text, "The Betas");
        assert_eq!(team.kind, ItemKind::Team);

        let team = Item::team("t1", "Alpha", None, Some("org1".to_string()));
        assert_eq!(team.display_text, "Alpha");
        assert_eq!(team.organization_id.as_deref(), Some("org1"));

        let team = Item::team("t3", "Gamma", Some("  ".to_string()), None);
        assert_eq!(team.display_text, "Gamma");
    }

    #[test]
    fn test_organization_prefers_formal_name() {
        let org = Item::organization(
            "mit",
            "MIT",
            Some("Massachusetts Institute of Technology".to_string()),
            Some("USA".to_string()),
        );
        assert_eq!(org.display_text, "Massachusetts Institute of Technology");
        assert_eq!(org.country.as_deref(), Some("USA"));

        let org = Item::organization("kth", "KTH", None, None);
        assert_eq!(org.display_text, "KTH");
    }
}

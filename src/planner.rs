//! Планирование задач генерации
//!
//! Планировщик делит элементы на две непересекающиеся группы: что нужно
//! сгенерировать и что уже есть на диске. Планирование не создает
//! директорий и не трогает файловую систему, кроме проверки существования.

use std::path::{Path, PathBuf};

use crate::config::{AudioFormat, Mode, RunConfig};
use crate::models::{GenerationTask, Item, SkipReason, SkipRecord};

/// Результат планирования
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Задачи для генерации в порядке входных данных
    pub to_generate: Vec<GenerationTask>,
    /// Пропущенные элементы в порядке входных данных
    pub skipped: Vec<SkipRecord>,
}

impl Plan {
    /// Общее количество элементов
    pub fn len(&self) -> usize {
        self.to_generate.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Путь к выходному файлу: `<root>/<mode>/<id>/audio.<format>`
pub fn output_path(root: &Path, mode: Mode, format: AudioFormat, id: &str) -> PathBuf {
    root.join(mode.as_str())
        .join(id)
        .join(format!("audio.{}", format.extension()))
}

/// Разделить элементы на задачи и пропуски
///
/// `exists` проверяет наличие выходного файла; элемент пропускается, только
/// если файл есть и перезапись не запрошена.
pub fn plan<F>(items: &[Item], config: &RunConfig, exists: F) -> Plan
where
    F: Fn(&Path) -> bool,
{
    let mut plan = Plan::default();

    for item in items {
        let path = output_path(&config.output_root, config.mode, config.format, &item.id);

        if !config.force && exists(&path) {
            log::debug!(
                "Skipping {} ({}): {}",
                item.id,
                SkipReason::Exists.as_str(),
                path.display()
            );
            plan.skipped.push(SkipRecord {
                item: item.clone(),
                output_path: path,
                reason: SkipReason::Exists,
            });
        } else {
            plan.to_generate.push(GenerationTask {
                item: item.clone(),
                output_path: path,
            });
        }
    }

    plan
}

/// Планирование с проверкой по реальной файловой системе
pub fn plan_on_disk(items: &[Item], config: &RunConfig) -> Plan {
    plan(items, config, |path| path.exists())
}

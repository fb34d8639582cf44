//! Модуль с реализациями наблюдателей прогресса

use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressStyle};

use crate::progress::{ProgressEvent, ProgressObserver};

/// Наблюдатель, отображающий прогресс в виде прогресс-бара в консоли
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    /// Создать прогресс-бар на `total` задач
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        match ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:50} [{bar:30.cyan/blue}] {pos}/{len} ({percent}%)")
        {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => log::warn!("Invalid progress bar template: {}", e),
        }
        bar.set_message("Generating audio...");
        Self { bar }
    }

    /// Прогресс-бар без вывода (для тестов и неинтерактивного режима)
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total as u64);
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_progress_update(&self, event: &ProgressEvent) {
        self.bar.set_position(event.completed as u64);
        self.bar.set_message(format!("Generated: {}", event.label));
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Наблюдатель, пишущий прогресс в лог
pub struct LogProgressObserver;

impl ProgressObserver for LogProgressObserver {
    fn on_progress_update(&self, event: &ProgressEvent) {
        let status = if event.success { "done" } else { "failed" };
        log::debug!(
            "[{}/{} {:.0}%] {} ({}) {}",
            event.completed,
            event.total,
            event.percent(),
            event.item_id,
            event.label,
            status
        );
    }

    fn on_finish(&self) {
        log::debug!("Progress reporting finished");
    }
}

/// Наблюдатель, сохраняющий события в памяти
#[derive(Clone, Default)]
pub struct MemoryProgressObserver {
    history: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MemoryProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Получить историю событий
    pub fn history(&self) -> Vec<ProgressEvent> {
        match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressObserver for MemoryProgressObserver {
    fn on_progress_update(&self, event: &ProgressEvent) {
        if let Ok(mut history) = self.history.lock() {
            history.push(event.clone());
        }
    }
}

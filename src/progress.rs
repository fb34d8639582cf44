//! Модуль для отслеживания прогресса генерации
//!
//! Исполнитель отправляет событие после каждой завершенной задачи в
//! неограниченный канал. `ProgressDispatcher` читает канал в отдельной
//! задаче и раздает события наблюдателям, поэтому медленный наблюдатель
//! не задерживает воркеры.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::utils::text::preview;

/// Длина подписи в событии прогресса
pub const LABEL_PREVIEW_LEN: usize = 40;

/// Событие о завершении одной задачи
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    /// Сколько задач завершено, включая эту
    pub completed: usize,
    /// Всего задач в запуске
    pub total: usize,
    /// Идентификатор элемента
    pub item_id: String,
    /// Обрезанный текст элемента
    pub label: String,
    /// Успешно ли завершилась задача
    pub success: bool,
}

impl ProgressEvent {
    pub fn new(
        completed: usize,
        total: usize,
        item_id: impl Into<String>,
        display_text: &str,
        success: bool,
    ) -> Self {
        Self {
            completed,
            total,
            item_id: item_id.into(),
            label: preview(display_text, LABEL_PREVIEW_LEN),
            success,
        }
    }

    /// Процент выполнения (0.0 - 100.0)
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f32 / self.total as f32 * 100.0).clamp(0.0, 100.0)
        }
    }
}

/// Отправитель событий прогресса
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Наблюдатель, получающий события прогресса
pub trait ProgressObserver: Send + Sync {
    /// Вызывается для каждого события
    fn on_progress_update(&self, event: &ProgressEvent);

    /// Вызывается один раз, когда все отправители закрыты
    fn on_finish(&self) {}
}

/// Раздает события прогресса наблюдателям
pub struct ProgressDispatcher {
    observers: RwLock<HashMap<usize, Box<dyn ProgressObserver>>>,
    next_id: AtomicUsize,
}

impl ProgressDispatcher {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Добавить наблюдателя; возвращает его идентификатор
    pub fn add_observer(&self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.write().insert(id, observer);
        id
    }

    /// Удалить наблюдателя по идентификатору
    pub fn remove_observer(&self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        self.observers.write().remove(&id)
    }

    /// Уведомить всех наблюдателей синхронно
    pub fn notify(&self, event: &ProgressEvent) {
        for observer in self.observers.read().values() {
            observer.on_progress_update(event);
        }
    }

    fn finish(&self) {
        for observer in self.observers.read().values() {
            observer.on_finish();
        }
    }

    /// Запустить обработчик канала.
    ///
    /// Задача завершается, когда закрыты все клоны возвращенного отправителя.
    pub fn start(self: Arc<Self>) -> (ProgressSender, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.notify(&event);
            }
            self.finish();
        });
        (tx, handle)
    }
}

impl Default for ProgressDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

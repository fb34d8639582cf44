//! Основной файл библиотеки icpc-audio
//!
//! Библиотека генерирует аудиофайлы с названиями команд или организаций
//! контеста ICPC: загрузка данных, планирование задач, параллельный синтез
//! речи и итоговый отчет.

pub mod cli;
pub mod config;
pub mod configure;
pub mod error;
pub mod executor;
pub mod loader;
pub mod models;
pub mod notification;
pub mod planner;
pub mod progress;
pub mod report;
pub mod tts;
pub mod utils;

use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::error::Result;
use crate::executor::{Executor, SynthesisSettings};
use crate::models::GenerationResult;
use crate::notification::{LogProgressObserver, ProgressBarObserver};
use crate::planner::Plan;
use crate::progress::{ProgressDispatcher, ProgressObserver};
use crate::report::RunSummary;
use crate::tts::SpeechSynthesizer;

/// Чем закончился запуск
#[derive(Debug)]
pub enum GenerationOutcome {
    /// Только предпросмотр, ничего не создано
    DryRun(Plan),
    /// Все файлы уже существуют
    NothingToGenerate(Plan),
    /// Задачи выполнены (возможно, с ошибками)
    Completed {
        plan: Plan,
        results: Vec<GenerationResult>,
        summary: RunSummary,
    },
}

/// Основная структура для одного запуска генерации
pub struct AudioGenerator {
    /// Конфигурация запуска
    config: RunConfig,
    /// Наблюдатели прогресса
    dispatcher: Arc<ProgressDispatcher>,
    /// Показывать прогресс-бар в консоли
    progress_bar: bool,
    cancellation: CancellationToken,
}

impl AudioGenerator {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            dispatcher: Arc::new(ProgressDispatcher::new()),
            progress_bar: false,
            cancellation: CancellationToken::new(),
        }
    }

    /// Включить прогресс-бар indicatif (иначе прогресс пишется в лог)
    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.progress_bar = enabled;
        self
    }

    /// Использовать внешний токен отмены (например, по Ctrl-C)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Добавить наблюдателя прогресса
    pub fn add_observer(&self, observer: Box<dyn ProgressObserver>) -> usize {
        self.dispatcher.add_observer(observer)
    }

    /// Выполнить запуск: загрузка, план, предпросмотр или генерация, отчет.
    ///
    /// `connect` вызывается только если есть что синтезировать. Отчеты
    /// пишутся в `out`.
    pub async fn run<W, C>(&self, out: &mut W, connect: C) -> Result<GenerationOutcome>
    where
        W: Write,
        C: FnOnce(&RunConfig) -> Result<Arc<dyn SpeechSynthesizer>>,
    {
        let root = &self.config.output_root;
        let items = loader::load_items(root, self.config.mode)?;
        write!(out, "{}", report::render_run_header(items.len(), &self.config))?;

        let plan = planner::plan_on_disk(&items, &self.config);
        log::debug!(
            "Planned {} items: {} to generate, {} skipped",
            plan.len(),
            plan.to_generate.len(),
            plan.skipped.len()
        );
        write!(out, "{}", report::render_plan_counts(&plan))?;

        if self.config.dry_run {
            write!(out, "{}", report::render_dry_run(&plan, root))?;
            return Ok(GenerationOutcome::DryRun(plan));
        }

        if plan.to_generate.is_empty() {
            writeln!(out, "\n{}", "Nothing to generate!".green())?;
            return Ok(GenerationOutcome::NothingToGenerate(plan));
        }

        let synthesizer = connect(&self.config)?;
        let total = plan.to_generate.len();

        // Без терминала прогресс пишется в лог
        let observer: Box<dyn ProgressObserver> = if self.progress_bar {
            Box::new(ProgressBarObserver::new(total))
        } else {
            Box::new(LogProgressObserver)
        };
        let observer_id = self.dispatcher.add_observer(observer);

        let (sender, dispatch) = self.dispatcher.clone().start();
        let executor = Executor::new(
            synthesizer,
            SynthesisSettings::from(&self.config),
            self.config.jobs,
        )
        .with_progress(sender)
        .with_cancellation(self.cancellation.clone());

        let results = executor.run(plan.to_generate.clone()).await;
        // Закрываем канал, чтобы обработчик прогресса завершился
        drop(executor);
        if let Err(e) = dispatch.await {
            log::warn!("Progress dispatcher stopped abnormally: {}", e);
        }
        self.dispatcher.remove_observer(observer_id);

        let summary = RunSummary::from_results(&results);
        log::info!(
            "Run finished: {} generated, {} failed, {} skipped",
            summary.succeeded,
            summary.failed.len(),
            plan.skipped.len()
        );
        write!(out, "{}", report::render_summary(&summary))?;

        Ok(GenerationOutcome::Completed {
            plan,
            results,
            summary,
        })
    }
}

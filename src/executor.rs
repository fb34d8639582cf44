//! Параллельное выполнение задач генерации
//!
//! Каждая задача запускается в отдельной tokio задаче; семафор ограничивает
//! количество одновременно выполняемых (синтез или запись файла). Ошибка
//! одной задачи превращается в её `GenerationResult` и не влияет на
//! остальные.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::{AudioFormat, RunConfig};
use crate::models::{GenerationResult, GenerationTask};
use crate::progress::{ProgressEvent, ProgressSender};
use crate::tts::SpeechSynthesizer;

/// Сообщение для задач, не начатых из-за отмены
pub const CANCELLED_MESSAGE: &str = "cancelled before synthesis";

/// Параметры синтеза, общие для всех задач запуска
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisSettings {
    pub language_code: String,
    pub voice_name: String,
    pub format: AudioFormat,
}

impl From<&RunConfig> for SynthesisSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            language_code: config.language.clone(),
            voice_name: config.voice.clone(),
            format: config.format,
        }
    }
}

/// Исполнитель задач генерации
pub struct Executor {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    settings: Arc<SynthesisSettings>,
    jobs: usize,
    progress: Option<ProgressSender>,
    cancellation: CancellationToken,
}

impl Executor {
    /// `jobs` проверяется при загрузке конфигурации; 0 трактуется как 1
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        settings: SynthesisSettings,
        jobs: usize,
    ) -> Self {
        Self {
            synthesizer,
            settings: Arc::new(settings),
            jobs: jobs.max(1),
            progress: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Отправлять события прогресса в канал
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Использовать внешний токен отмены
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Выполнить все задачи.
    ///
    /// Возвращает ровно один результат на задачу в порядке завершения.
    pub async fn run(&self, tasks: Vec<GenerationTask>) -> Vec<GenerationResult> {
        let total = tasks.len();
        log::info!(
            "Generating {} files with {} parallel jobs (voice {}, format {})",
            total,
            self.jobs,
            self.settings.voice_name,
            self.settings.format
        );

        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut pending = FuturesUnordered::new();

        for task in tasks {
            let semaphore = semaphore.clone();
            let synthesizer = self.synthesizer.clone();
            let settings = self.settings.clone();
            let cancellation = self.cancellation.clone();
            let fallback = task.clone();

            let handle = tokio::spawn(async move {
                // Семафор не закрывается, поэтому ошибки здесь не бывает
                let _permit = semaphore.acquire_owned().await.ok();

                if cancellation.is_cancelled() {
                    log::debug!("Skipping {}: run cancelled", task.item.id);
                    return GenerationResult::failed(task, CANCELLED_MESSAGE);
                }

                match generate_single(&task, synthesizer.as_ref(), &settings).await {
                    Ok(()) => {
                        log::debug!("Saved {} to {}", task.item.id, task.output_path.display());
                        GenerationResult::succeeded(task)
                    }
                    Err(e) => {
                        // Ошибки попадают в итоговый отчет; stderr занят прогресс-баром
                        log::debug!("Failed to generate audio for {}: {}", task.item.id, e);
                        GenerationResult::failed(task, e)
                    }
                }
            });

            pending.push(async move { (fallback, handle.await) });
        }

        let mut results = Vec::with_capacity(total);
        while let Some((fallback, joined)) = pending.next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    log::error!("Worker for {} did not complete: {}", fallback.item.id, e);
                    GenerationResult::failed(fallback, format!("worker failed: {}", e))
                }
            };

            if let Some(sender) = &self.progress {
                let event = ProgressEvent::new(
                    results.len() + 1,
                    total,
                    result.task.item.id.as_str(),
                    &result.task.item.display_text,
                    result.success,
                );
                // Получатель мог уже закрыться; на генерацию это не влияет
                let _ = sender.send(event);
            }
            results.push(result);
        }

        results
    }
}

/// Отмена по сигналу прерывания.
///
/// Первый сигнал отменяет `token`: новые задачи не запускаются, начатые
/// дописываются. Возвращает `true`, если пришел второй сигнал и ждать
/// начатые задачи больше не нужно.
pub async fn cancel_on_interrupt<S, F>(mut next_signal: S, token: CancellationToken) -> bool
where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        log::debug!("Interrupt handler unavailable: {}", e);
        return false;
    }
    log::warn!("Interrupted, waiting for running tasks to finish (press Ctrl-C again to abort)");
    token.cancel();

    next_signal().await.is_ok()
}

/// Сгенерировать один файл: директория, синтез, запись
async fn generate_single(
    task: &GenerationTask,
    synthesizer: &dyn SpeechSynthesizer,
    settings: &SynthesisSettings,
) -> Result<(), String> {
    if let Some(parent) = task.output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("failed to create directory {}: {}", parent.display(), e))?;
    }

    let audio = synthesizer
        .synthesize(
            &task.item.display_text,
            &settings.language_code,
            &settings.voice_name,
            settings.format,
        )
        .await
        .map_err(|e| e.to_string())?;

    tokio::fs::write(&task.output_path, &audio)
        .await
        .map_err(|e| format!("failed to write {}: {}", task.output_path.display(), e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IcpcAudioError, Result};
    use crate::models::Item;
    use crate::tts::VoiceDescriptor;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Синтезатор, считающий одновременные вызовы
    struct CountingSynthesizer {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
        fail_for: Option<String>,
    }

    impl CountingSynthesizer {
        fn new(fail_for: Option<&str>) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                fail_for: fail_for.map(str::to_string),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingSynthesizer {
        async fn synthesize(
            &self,
            text: &str,
            _language_code: &str,
            _voice_name: &str,
            _format: AudioFormat,
        ) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_for.as_deref() == Some(text) {
                return Err(IcpcAudioError::synthesis("voice not available"));
            }
            Ok(text.as_bytes().to_vec())
        }

        async fn list_voices(&self, _language_code: Option<&str>) -> Result<Vec<VoiceDescriptor>> {
            Ok(Vec::new())
        }
    }

    fn settings() -> SynthesisSettings {
        SynthesisSettings {
            language_code: "en-US".to_string(),
            voice_name: "en-US-Wavenet-D".to_string(),
            format: AudioFormat::Mp3,
        }
    }

    fn tasks(root: &Path, n: usize) -> Vec<GenerationTask> {
        (0..n)
            .map(|i| GenerationTask {
                item: Item::team(format!("t{}", i), format!("Team {}", i), None, None),
                output_path: root.join("teams").join(format!("t{}", i)).join("audio.mp3"),
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_respects_concurrency_limit() {
        let dir = tempfile::tempdir().unwrap();
        let counter = Arc::new(CountingSynthesizer::new(None));
        let executor = Executor::new(counter.clone(), settings(), 3);

        let results = executor.run(tasks(dir.path(), 12)).await;

        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 12);
        assert!(counter.max_in_flight.load(Ordering::SeqCst) <= 3);
        for result in &results {
            let content = std::fs::read(&result.task.output_path).unwrap();
            assert_eq!(content, result.task.item.display_text.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_single_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let counter = Arc::new(CountingSynthesizer::new(Some("Team 2")));
        let executor = Executor::new(counter, settings(), 2);

        let results = executor.run(tasks(dir.path(), 5)).await;

        assert_eq!(results.len(), 5);
        let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].task.item.id, "t2");
        assert!(failed[0].error.as_deref().unwrap().contains("voice not available"));
        assert!(!failed[0].task.output_path.exists());

        for result in results.iter().filter(|r| r.success) {
            assert!(result.task.output_path.exists());
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // Файл на месте директории элемента: create_dir_all упадет
        std::fs::create_dir_all(dir.path().join("teams")).unwrap();
        std::fs::write(dir.path().join("teams").join("t0"), b"not a directory").unwrap();

        let executor = Executor::new(Arc::new(CountingSynthesizer::new(None)), settings(), 2);
        let results = executor.run(tasks(dir.path(), 2)).await;

        let t0 = results.iter().find(|r| r.task.item.id == "t0").unwrap();
        assert!(!t0.success);
        assert!(t0.error.is_some());
        let t1 = results.iter().find(|r| r.task.item.id == "t1").unwrap();
        assert!(t1.success);
    }

    #[tokio::test]
    async fn test_progress_events_per_task() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let executor =
            Executor::new(Arc::new(CountingSynthesizer::new(None)), settings(), 4).with_progress(tx);

        executor.run(tasks(dir.path(), 6)).await;
        drop(executor);

        let mut counts = Vec::new();
        while let Some(event) = rx.recv().await {
            assert_eq!(event.total, 6);
            counts.push(event.completed);
        }
        assert_eq!(counts, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let counter = Arc::new(CountingSynthesizer::new(None));
        let token = CancellationToken::new();
        token.cancel();

        let executor = Executor::new(counter.clone(), settings(), 2).with_cancellation(token);
        let results = executor.run(tasks(dir.path(), 3)).await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.error.as_deref() == Some(CANCELLED_MESSAGE)));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("teams").exists());
    }

    /// Логгер, запоминающий записи исполнителя
    struct CapturingLogger {
        records: std::sync::Mutex<Vec<(log::Level, String)>>,
    }

    impl log::Log for CapturingLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if record.target() == "icpc_audio::executor" {
                self.records
                    .lock()
                    .unwrap()
                    .push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURED: CapturingLogger = CapturingLogger {
        records: std::sync::Mutex::new(Vec::new()),
    };

    #[tokio::test]
    async fn test_task_failures_stay_off_stderr() {
        let _ = log::set_logger(&CAPTURED);
        log::set_max_level(log::LevelFilter::Trace);

        let dir = tempfile::tempdir().unwrap();
        let task = GenerationTask {
            item: Item::team("quiet-failure", "Silent Team", None, None),
            output_path: dir.path().join("teams/quiet-failure/audio.mp3"),
        };
        let counter = Arc::new(CountingSynthesizer::new(Some("Silent Team")));
        let results = Executor::new(counter, settings(), 1).run(vec![task]).await;
        assert!(!results[0].success);

        let records = CAPTURED.records.lock().unwrap();
        let mentions: Vec<_> = records
            .iter()
            .filter(|(_, message)| message.contains("quiet-failure"))
            .collect();
        assert!(!mentions.is_empty());
        assert!(mentions.iter().all(|(level, _)| *level > log::Level::Warn));
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_second_aborts() {
        let signals = Arc::new(tokio::sync::Notify::new());
        let token = CancellationToken::new();

        let source = signals.clone();
        let handler = tokio::spawn(cancel_on_interrupt(
            move || {
                let source = source.clone();
                async move {
                    source.notified().await;
                    Ok(())
                }
            },
            token.clone(),
        ));

        signals.notify_one();
        token.cancelled().await;
        assert!(!handler.is_finished());

        signals.notify_one();
        assert!(handler.await.unwrap());
    }

    #[tokio::test]
    async fn test_interrupt_handler_unavailable() {
        let token = CancellationToken::new();
        let aborted = cancel_on_interrupt(
            || async { Err(std::io::Error::other("no signal support")) },
            token.clone(),
        )
        .await;
        assert!(!aborted);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_empty_task_list() {
        let executor = Executor::new(Arc::new(CountingSynthesizer::new(None)), settings(), 0);
        assert_eq!(executor.jobs(), 1);
        assert!(executor.run(Vec::new()).await.is_empty());
    }
}

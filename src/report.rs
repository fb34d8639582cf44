//! Отчеты: предпросмотр dry-run, итоги генерации, таблица голосов
//!
//! Все функции возвращают готовый текст и ничего не пишут сами.

use std::fmt::Write as _;
use std::path::Path;

use colored::Colorize;

use crate::config::RunConfig;
use crate::models::GenerationResult;
use crate::planner::Plan;
use crate::tts::VoiceDescriptor;
use crate::utils::text::truncate_chars;

/// Сколько задач показывать в предпросмотре
pub const PREVIEW_ROWS: usize = 20;
/// Длина текста в предпросмотре
pub const PREVIEW_TEXT_LEN: usize = 50;

/// Итоги запуска
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    /// Неудачные задачи, отсортированные по идентификатору
    pub failed: Vec<GenerationResult>,
}

impl RunSummary {
    /// Собрать итоги из результатов в любом порядке
    pub fn from_results(results: &[GenerationResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let mut failed: Vec<GenerationResult> =
            results.iter().filter(|r| !r.success).cloned().collect();
        failed.sort_by(|a, b| {
            a.task
                .item
                .id
                .cmp(&b.task.item.id)
                .then_with(|| a.task.output_path.cmp(&b.task.output_path))
        });
        Self { succeeded, failed }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Заголовок запуска: сколько загружено и с какими параметрами
pub fn render_run_header(loaded: usize, config: &RunConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        format!("Loaded {} {}", loaded, config.mode).bold()
    );
    let _ = writeln!(out, "  Voice: {}", config.voice.cyan());
    let _ = writeln!(out, "  Format: {}", config.format.to_string().cyan());
    let _ = writeln!(out, "  Parallel jobs: {}", config.jobs.to_string().cyan());
    out
}

/// Количество задач и пропусков
pub fn render_plan_counts(plan: &Plan) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  To generate: {}",
        plan.to_generate.len().to_string().green()
    );
    let _ = writeln!(
        out,
        "  Skipped (existing): {}",
        plan.skipped.len().to_string().yellow()
    );
    out
}

/// Предпросмотр dry-run: первые 20 задач и число пропусков
pub fn render_dry_run(plan: &Plan, root: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        "DRY RUN - No files will be created".yellow().bold()
    );
    let _ = writeln!(out);

    if !plan.to_generate.is_empty() {
        let mut rows: Vec<[String; 3]> = plan
            .to_generate
            .iter()
            .take(PREVIEW_ROWS)
            .map(|task| {
                let relative = task
                    .output_path
                    .strip_prefix(root)
                    .unwrap_or(&task.output_path);
                [
                    task.item.id.clone(),
                    truncate_chars(&task.item.display_text, PREVIEW_TEXT_LEN).to_string(),
                    relative.display().to_string(),
                ]
            })
            .collect();

        if plan.to_generate.len() > PREVIEW_ROWS {
            rows.push([
                "...".to_string(),
                format!("({} more)", plan.to_generate.len() - PREVIEW_ROWS),
                "...".to_string(),
            ]);
        }

        let _ = writeln!(out, "Files to Generate");
        out.push_str(&render_table(["ID", "Text to Speak", "Output Path"], &rows));
    }

    if !plan.skipped.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            format!("Would skip {} existing files", plan.skipped.len()).yellow()
        );
    }

    out
}

/// Итоги генерации со списком ошибок
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Generation complete!".bold());
    let _ = writeln!(
        out,
        "  Generated: {}",
        summary.succeeded.to_string().green()
    );

    if summary.has_failures() {
        let _ = writeln!(
            out,
            "  Errors: {}",
            summary.failed.len().to_string().red()
        );
        for result in &summary.failed {
            let _ = writeln!(
                out,
                "    - {} ({}): {}",
                result.task.item.id,
                result.task.item.display_text,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    out
}

/// Таблица голосов, отсортированная по языку и имени
pub fn render_voice_table(voices: &[VoiceDescriptor]) -> String {
    let mut sorted: Vec<&VoiceDescriptor> = voices.iter().collect();
    sorted.sort_by(|a, b| {
        a.primary_language()
            .cmp(b.primary_language())
            .then_with(|| a.name.cmp(&b.name))
    });

    let rows: Vec<[String; 4]> = sorted
        .iter()
        .map(|v| {
            [
                v.primary_language().to_string(),
                v.name.clone(),
                v.gender.label().to_string(),
                v.voice_type().to_string(),
            ]
        })
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "Available Google TTS Voices");
    out.push_str(&render_table(["Language", "Voice Name", "Gender", "Type"], &rows));
    let _ = writeln!(out);
    let _ = writeln!(out, "Total: {} voices", voices.len());
    out
}

/// Простая текстовая таблица с выравниванием по ширине колонок
fn render_table<const N: usize>(headers: [&str; N], rows: &[[String; N]]) -> String {
    let mut widths: [usize; N] = headers.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let format_row = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let _ = writeln!(out, "{}", format_row(headers.to_vec()));
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", separator.join("  "));
    for row in rows {
        let _ = writeln!(out, "{}", format_row(row.iter().map(String::as_str).collect()));
    }
    out
}

//! Интерактивный мастер настройки
//!
//! Мастер спрашивает учетные данные, режим, язык, голос, формат и число
//! параллельных задач, после чего сохраняет icpc-audio.yaml. Ввод и вывод
//! передаются снаружи, поэтому мастер можно прогнать в тестах.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;

use crate::config::{
    AudioFormat, MAX_JOBS, MIN_JOBS, Mode, PersistedConfig, load_config, save_config,
};
use crate::error::{IcpcAudioError, Result};
use crate::tts::SpeechSynthesizer;

/// Вариант выбора
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Вариант, у которого подпись совпадает со значением
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Простые вопросы в терминале
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Вывести строку
    pub fn say(&mut self, message: impl AsRef<str>) -> Result<()> {
        writeln!(self.output, "{}", message.as_ref())?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        self.output.flush()?;
        let mut line = String::new();
        // Конец ввода (Ctrl-D) равносилен отмене
        if self.input.read_line(&mut line)? == 0 {
            return Err(IcpcAudioError::Cancelled);
        }
        Ok(line.trim().to_string())
    }

    /// Текстовый ответ; пустой ввод означает значение по умолчанию
    pub fn text<F>(&mut self, message: &str, default: &str, validate: F) -> Result<String>
    where
        F: Fn(&str) -> std::result::Result<(), String>,
    {
        loop {
            if default.is_empty() {
                write!(self.output, "? {} ", message)?;
            } else {
                write!(self.output, "? {} [{}] ", message, default)?;
            }
            let line = self.read_line()?;
            let answer = if line.is_empty() {
                default.to_string()
            } else {
                line
            };

            match validate(&answer) {
                Ok(()) => return Ok(answer),
                Err(reason) => self.say(format!("  {}", reason.red()))?,
            }
        }
    }

    /// Выбор из списка по номеру; пустой ввод означает вариант по умолчанию
    pub fn select(
        &mut self,
        message: &str,
        choices: &[Choice],
        default: Option<&str>,
    ) -> Result<String> {
        if choices.is_empty() {
            return Err(IcpcAudioError::InvalidConfig(format!(
                "no choices available for '{}'",
                message
            )));
        }

        let default_index = default
            .and_then(|d| choices.iter().position(|c| c.value == d))
            .unwrap_or(0);

        self.say(format!("? {}", message))?;
        for (i, choice) in choices.iter().enumerate() {
            let marker = if i == default_index { ">" } else { " " };
            self.say(format!("  {} {:>3}) {}", marker, i + 1, choice.label))?;
        }

        loop {
            write!(self.output, "  Enter number [{}]: ", default_index + 1)?;
            let line = self.read_line()?;
            if line.is_empty() {
                return Ok(choices[default_index].value.clone());
            }
            match line.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => {
                    return Ok(choices[n - 1].value.clone());
                }
                _ => self.say(format!(
                    "  {}",
                    format!("Enter a number between 1 and {}", choices.len()).red()
                ))?,
            }
        }
    }

    /// Вопрос да/нет
    pub fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            write!(self.output, "? {} ({}) ", message, hint)?;
            let line = self.read_line()?;
            match line.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say(format!("  {}", "Please answer y or n".red()))?,
            }
        }
    }
}

/// Проверка числа параллельных задач
fn validate_jobs_input(value: &str) -> std::result::Result<(), String> {
    match value.parse::<usize>() {
        Ok(n) if (MIN_JOBS..=MAX_JOBS).contains(&n) => Ok(()),
        _ => Err(format!(
            "Enter a number between {} and {}",
            MIN_JOBS, MAX_JOBS
        )),
    }
}

/// Запустить мастер настройки.
///
/// `env_credentials` содержит значение GOOGLE_APPLICATION_CREDENTIALS, если
/// оно задано; `connect` создает синтезатор по пути к учетным данным.
pub async fn run_configure<R, W, C>(
    folder: &Path,
    prompter: &mut Prompter<R, W>,
    env_credentials: Option<OsString>,
    connect: C,
) -> Result<PathBuf>
where
    R: BufRead,
    W: Write,
    C: FnOnce(&Path) -> Result<Arc<dyn SpeechSynthesizer>>,
{
    prompter.say(format!(
        "\n{}\n",
        "ICPC Audio Generator - Configuration Wizard".bold()
    ))?;
    prompter.say(format!("Configuring for: {}\n", folder.display().to_string().cyan()))?;

    let existing = load_config(folder)?;
    if existing.is_some() {
        prompter.say("Found existing config, using as defaults\n".dimmed().to_string())?;
    }
    let defaults = existing.clone().unwrap_or_default();

    // Учетные данные: пустой ответ означает переменную окружения
    let credentials_input = prompter.text(
        "Path to Google Cloud credentials JSON (leave empty to use GOOGLE_APPLICATION_CREDENTIALS env var):",
        defaults.configured_credentials().unwrap_or(""),
        |p| {
            if p.is_empty() || Path::new(p).exists() {
                Ok(())
            } else {
                Err("File does not exist".to_string())
            }
        },
    )?;

    let effective_credentials = if !credentials_input.is_empty() {
        PathBuf::from(&credentials_input)
    } else {
        match env_credentials.filter(|v| !v.is_empty()) {
            Some(value) => {
                let path = PathBuf::from(value);
                prompter.say(
                    format!("Using GOOGLE_APPLICATION_CREDENTIALS: {}", path.display())
                        .dimmed()
                        .to_string(),
                )?;
                path
            }
            None => return Err(IcpcAudioError::CredentialsMissing),
        }
    };

    prompter.say(
        "\nConnecting to Google TTS to fetch available voices..."
            .yellow()
            .to_string(),
    )?;
    let synthesizer = connect(&effective_credentials)?;
    let languages = synthesizer.list_languages().await?;
    prompter.say(
        format!("Connected! Found {} languages.\n", languages.len())
            .green()
            .to_string(),
    )?;

    let mode = prompter.select(
        "What do you want to generate audio for?",
        &[
            Choice::new(
                "Teams - Use team display names from teams.json",
                Mode::Teams.as_str(),
            ),
            Choice::new(
                "Organizations - Use formal names from organizations.json",
                Mode::Organizations.as_str(),
            ),
        ],
        Some(defaults.mode.as_str()),
    )?;

    let language = select_language(prompter, &languages, &defaults.language)?;

    let mut voices = synthesizer.list_voices(Some(language.as_str())).await?;
    voices.sort_by(|a, b| a.name.cmp(&b.name));
    let voice_choices: Vec<Choice> = voices
        .iter()
        .map(|v| {
            Choice::new(
                format!(
                    "{} ({}, {})",
                    v.name,
                    v.gender.label().to_lowercase(),
                    v.voice_type().as_str().to_lowercase()
                ),
                v.name.clone(),
            )
        })
        .collect();
    let voice = prompter.select("Select voice:", &voice_choices, Some(defaults.voice.as_str()))?;

    let format_choices: Vec<Choice> = AudioFormat::ALL
        .iter()
        .map(|f| Choice::new(f.description(), f.extension()))
        .collect();
    let format = prompter.select("Select audio format:", &format_choices, Some(defaults.format.as_str()))?;

    let jobs = prompter.text(
        "Number of parallel jobs (1-16):",
        &defaults.jobs.to_string(),
        validate_jobs_input,
    )?;
    let jobs = jobs
        .parse::<usize>()
        .map_err(|e| IcpcAudioError::InvalidConfig(format!("invalid jobs value: {}", e)))?;

    let config = PersistedConfig {
        credentials_path: if credentials_input.is_empty() {
            None
        } else {
            Some(credentials_input)
        },
        language,
        voice,
        format,
        mode,
        jobs,
    };

    let path = save_config(&config, folder)?;
    prompter.say(
        format!("\nConfiguration saved to {}", path.display())
            .green()
            .to_string(),
    )?;
    prompter.say("\nYou can now run:")?;
    prompter.say(format!(
        "  {}",
        format!("icpc-audio generate {}", folder.display()).cyan()
    ))?;

    Ok(path)
}

/// Выбор языка: по умолчанию только английские, если сохранен английский
fn select_language<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    languages: &[String],
    saved: &str,
) -> Result<String> {
    let show_all = prompter.confirm(
        &format!(
            "Show all {} languages? (No = show English only)",
            languages.len()
        ),
        !saved.starts_with("en-"),
    )?;

    let choices: Vec<Choice> = languages
        .iter()
        .filter(|l| show_all || l.starts_with("en-"))
        .map(|l| Choice::plain(l.as_str()))
        .collect();

    let default = if choices.iter().any(|c| c.value == saved) {
        saved.to_string()
    } else {
        choices
            .first()
            .map(|c| c.value.clone())
            .unwrap_or_else(|| "en-US".to_string())
    };

    prompter.select("Select language:", &choices, Some(default.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::{VoiceDescriptor, VoiceGender};
    use async_trait::async_trait;
    use std::io::Cursor;

    struct CatalogStub;

    fn voice(name: &str, language: &str, gender: VoiceGender) -> VoiceDescriptor {
        VoiceDescriptor {
            name: name.to_string(),
            language_codes: vec![language.to_string()],
            gender,
            natural_sample_rate_hertz: Some(24000),
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for CatalogStub {
        async fn synthesize(
            &self,
            _text: &str,
            _language_code: &str,
            _voice_name: &str,
            _format: AudioFormat,
        ) -> Result<Vec<u8>> {
            Err(IcpcAudioError::synthesis("not used"))
        }

        async fn list_voices(&self, language_code: Option<&str>) -> Result<Vec<VoiceDescriptor>> {
            let all = vec![
                voice("en-US-Wavenet-D", "en-US", VoiceGender::Male),
                voice("en-US-Neural2-C", "en-US", VoiceGender::Female),
                voice("en-GB-Standard-A", "en-GB", VoiceGender::Female),
                voice("sv-SE-Wavenet-A", "sv-SE", VoiceGender::Female),
            ];
            Ok(all
                .into_iter()
                .filter(|v| language_code.is_none_or(|code| v.language_codes.iter().any(|l| l == code)))
                .collect())
        }
    }

    fn connect_stub(_path: &Path) -> Result<Arc<dyn SpeechSynthesizer>> {
        Ok(Arc::new(CatalogStub))
    }

    #[test]
    fn test_prompter_text_default_and_validation() {
        let input = Cursor::new("\n");
        let mut out = Vec::new();
        let mut prompter = Prompter::new(input, &mut out);
        assert_eq!(prompter.text("Jobs", "4", validate_jobs_input).unwrap(), "4");

        let input = Cursor::new("99\n8\n");
        let mut out = Vec::new();
        let mut prompter = Prompter::new(input, &mut out);
        assert_eq!(prompter.text("Jobs", "4", validate_jobs_input).unwrap(), "8");
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Enter a number between 1 and 16"));
    }

    #[test]
    fn test_prompter_select_and_confirm() {
        let choices = vec![Choice::plain("a"), Choice::plain("b"), Choice::plain("c")];

        let mut out = Vec::new();
        let mut prompter = Prompter::new(Cursor::new("\n7\n3\n"), &mut out);
        assert_eq!(prompter.select("Pick", &choices, Some("b")).unwrap(), "b");
        assert_eq!(prompter.select("Pick", &choices, None).unwrap(), "c");

        let mut out = Vec::new();
        let mut prompter = Prompter::new(Cursor::new("\nmaybe\ny\n"), &mut out);
        assert!(!prompter.confirm("Sure?", false).unwrap());
        assert!(prompter.confirm("Sure?", false).unwrap());
    }

    #[test]
    fn test_prompter_eof_is_cancel() {
        let mut out = Vec::new();
        let mut prompter = Prompter::new(Cursor::new(""), &mut out);
        assert!(matches!(
            prompter.confirm("Sure?", true),
            Err(IcpcAudioError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_wizard_saves_config() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        let credentials = dir.path().join("sa.json");
        std::fs::write(&credentials, "{}").unwrap();

        // credentials, mode=organizations, English only, en-US, voice #1 (Neural2-C), ogg, jobs 6
        let answers = format!("{}\n2\nn\n\n1\n4\n6\n", credentials.display());
        let mut out = Vec::new();
        let mut prompter = Prompter::new(Cursor::new(answers), &mut out);

        let path = run_configure(dir.path(), &mut prompter, None, connect_stub)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("icpc-audio.yaml"));

        let saved = load_config(dir.path()).unwrap().unwrap();
        assert_eq!(saved.credentials_path.as_deref(), credentials.to_str());
        assert_eq!(saved.mode, "organizations");
        assert_eq!(saved.language, "en-US");
        assert_eq!(saved.voice, "en-US-Neural2-C");
        assert_eq!(saved.format, "ogg");
        assert_eq!(saved.jobs, 6);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Connected! Found 3 languages."));
        assert!(printed.contains("en-US-Neural2-C (female, neural)"));
        assert!(printed.contains("icpc-audio generate"));
    }

    #[tokio::test]
    async fn test_wizard_uses_env_credentials_and_existing_defaults() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        let env_credentials = dir.path().join("env.json");
        std::fs::write(&env_credentials, "{}").unwrap();
        save_config(
            &PersistedConfig {
                language: "sv-SE".to_string(),
                voice: "sv-SE-Wavenet-A".to_string(),
                format: "wav".to_string(),
                jobs: 2,
                ..PersistedConfig::default()
            },
            dir.path(),
        )
        .unwrap();

        // Все ответы по умолчанию
        let mut out = Vec::new();
        let mut prompter = Prompter::new(Cursor::new("\n\n\n\n\n\n\n"), &mut out);
        run_configure(
            dir.path(),
            &mut prompter,
            Some(env_credentials.into_os_string()),
            connect_stub,
        )
        .await
        .unwrap();

        let saved = load_config(dir.path()).unwrap().unwrap();
        assert_eq!(saved.credentials_path, None);
        assert_eq!(saved.mode, "teams");
        assert_eq!(saved.language, "sv-SE");
        assert_eq!(saved.voice, "sv-SE-Wavenet-A");
        assert_eq!(saved.format, "wav");
        assert_eq!(saved.jobs, 2);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Found existing config"));
        assert!(printed.contains("Using GOOGLE_APPLICATION_CREDENTIALS"));
    }

    #[tokio::test]
    async fn test_wizard_without_any_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let mut prompter = Prompter::new(Cursor::new("\n"), &mut out);
        let result = run_configure(dir.path(), &mut prompter, None, connect_stub).await;
        assert!(matches!(result, Err(IcpcAudioError::CredentialsMissing)));
        assert!(!dir.path().join("icpc-audio.yaml").exists());
    }
}

//! Модуль конфигурации icpc-audio
//!
//! Этот модуль содержит структуры и перечисления для настройки генерации:
//! сохраняемую конфигурацию (`icpc-audio.yaml`), поиск учетных данных
//! и итоговую конфигурацию запуска `RunConfig`.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IcpcAudioError, Result};

/// Имя файла конфигурации в папке контеста
pub const CONFIG_FILE_NAME: &str = "icpc-audio.yaml";

/// Переменная окружения со стандартным путем к учетным данным Google
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Допустимый диапазон числа параллельных задач
pub const MIN_JOBS: usize = 1;
pub const MAX_JOBS: usize = 16;

/// Режим генерации
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Названия команд из teams.json
    #[default]
    Teams,
    /// Официальные названия организаций из organizations.json
    Organizations,
}

impl Mode {
    /// Получить строковое представление режима
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Teams => "teams",
            Self::Organizations => "organizations",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = IcpcAudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teams" => Ok(Self::Teams),
            "organizations" => Ok(Self::Organizations),
            other => Err(IcpcAudioError::InvalidConfig(format!(
                "unknown mode '{}' (expected teams or organizations)",
                other
            ))),
        }
    }
}

/// Поддерживаемые аудиоформаты
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    M4a,
    Ogg,
}

impl AudioFormat {
    /// Все форматы в порядке отображения в мастере настройки
    pub const ALL: [AudioFormat; 4] = [Self::Mp3, Self::M4a, Self::Wav, Self::Ogg];

    /// Расширение файла
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::M4a => "m4a",
            Self::Ogg => "ogg",
        }
    }

    /// Краткое описание для мастера настройки
    pub fn description(&self) -> &'static str {
        match self {
            Self::Mp3 => "MP3 - Compressed, widely compatible",
            Self::M4a => "M4A - Good quality, Apple compatible",
            Self::Wav => "WAV - Uncompressed, large files",
            Self::Ogg => "OGG - Opus codec, good quality/size ratio",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = IcpcAudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "m4a" => Ok(Self::M4a),
            "ogg" => Ok(Self::Ogg),
            _ => Err(IcpcAudioError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Конфигурация, сохраняемая в icpc-audio.yaml
///
/// Поля хранятся в виде строк: проверка выполняется при построении `RunConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistedConfig {
    /// Путь к JSON с учетными данными сервисного аккаунта
    pub credentials_path: Option<String>,
    /// Код языка, например en-US
    pub language: String,
    /// Имя голоса Google TTS
    pub voice: String,
    /// Аудиоформат (mp3, wav, m4a, ogg)
    pub format: String,
    /// Режим (teams, organizations)
    pub mode: String,
    /// Количество параллельных запросов
    pub jobs: usize,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            language: "en-US".to_string(),
            voice: "en-US-Wavenet-D".to_string(),
            format: AudioFormat::default().extension().to_string(),
            mode: Mode::default().as_str().to_string(),
            jobs: 4,
        }
    }
}

impl PersistedConfig {
    /// Проверить значения, которые не может проверить serde
    pub fn validate(&self) -> Result<()> {
        self.format.parse::<AudioFormat>()?;
        self.mode.parse::<Mode>()?;
        validate_jobs(self.jobs)?;
        Ok(())
    }

    /// Явно заданный путь к учетным данным (пустая строка не считается)
    pub fn configured_credentials(&self) -> Option<&str> {
        self.credentials_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Проверить количество параллельных задач
pub fn validate_jobs(jobs: usize) -> Result<()> {
    if (MIN_JOBS..=MAX_JOBS).contains(&jobs) {
        Ok(())
    } else {
        Err(IcpcAudioError::InvalidConfig(format!(
            "jobs must be between {} and {}, got {}",
            MIN_JOBS, MAX_JOBS, jobs
        )))
    }
}

/// Путь к файлу конфигурации в указанной папке
pub fn config_path(folder: &Path) -> PathBuf {
    folder.join(CONFIG_FILE_NAME)
}

/// Загрузить конфигурацию; `None`, если файла нет или он пуст
pub fn load_config(folder: &Path) -> Result<Option<PersistedConfig>> {
    let path = config_path(folder);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    let value: serde_yaml::Value = serde_yaml::from_str(&content)?;
    if value.is_null() {
        return Ok(None);
    }

    let config = serde_yaml::from_value(value)?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(Some(config))
}

/// Сохранить конфигурацию; возвращает путь к записанному файлу
pub fn save_config(config: &PersistedConfig, folder: &Path) -> Result<PathBuf> {
    let path = config_path(folder);
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&path, yaml)?;
    log::info!("Saved configuration to {}", path.display());
    Ok(path)
}

/// Найти учетные данные: значение из конфигурации, иначе переменная окружения
///
/// Значение переменной окружения передается вызывающей стороной, процесс
/// ничего не читает и не меняет в окружении сам.
pub fn resolve_credentials(
    configured: Option<&str>,
    env_value: Option<OsString>,
) -> Result<PathBuf> {
    let path = match configured {
        Some(p) if !p.trim().is_empty() => PathBuf::from(p.trim()),
        _ => match env_value.filter(|v| !v.is_empty()) {
            Some(v) => PathBuf::from(v),
            None => return Err(IcpcAudioError::CredentialsMissing),
        },
    };

    if !path.exists() {
        return Err(IcpcAudioError::CredentialsNotFound(path));
    }
    Ok(path)
}

/// Итоговая конфигурация одного запуска
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Корневая папка (папка контеста)
    pub output_root: PathBuf,
    pub mode: Mode,
    pub format: AudioFormat,
    pub language: String,
    pub voice: String,
    /// Учетные данные, если они нужны для запуска
    pub credentials: Option<PathBuf>,
    /// Количество параллельных задач
    pub jobs: usize,
    /// Перезаписывать существующие файлы
    pub force: bool,
    /// Только показать план
    pub dry_run: bool,
}

impl RunConfig {
    /// Построить конфигурацию запуска из сохраненной конфигурации
    pub fn from_persisted(
        folder: &Path,
        persisted: &PersistedConfig,
        credentials: Option<PathBuf>,
        force: bool,
        dry_run: bool,
    ) -> Result<Self> {
        let format = persisted.format.parse::<AudioFormat>()?;
        let mode = persisted.mode.parse::<Mode>()?;
        validate_jobs(persisted.jobs)?;

        Ok(Self {
            output_root: folder.to_path_buf(),
            mode,
            format,
            language: persisted.language.clone(),
            voice: persisted.voice.clone(),
            credentials,
            jobs: persisted.jobs,
            force,
            dry_run,
        })
    }
}

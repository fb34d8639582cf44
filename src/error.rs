//! Модуль обработки ошибок icpc-audio
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при загрузке
//! данных, работе с конфигурацией и генерации речи.

use std::path::PathBuf;
use thiserror::Error;

/// Ошибки icpc-audio
#[derive(Debug, Error)]
pub enum IcpcAudioError {
    /// Файл с данными команд/организаций не найден
    #[error("Data file not found: {}", .0.display())]
    DataNotFound(PathBuf),

    /// Некорректные данные во входном файле
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// Повторяющийся идентификатор во входных данных
    #[error("Duplicate item id in source data: {0}")]
    DuplicateId(String),

    /// Неподдерживаемый аудиоформат
    #[error("Unsupported audio format: {0} (expected one of mp3, wav, m4a, ogg)")]
    UnsupportedFormat(String),

    /// Ошибка на стороне провайдера TTS
    #[error("Speech synthesis failed: {cause}")]
    SynthesisFailed { cause: String },

    /// Файл конфигурации отсутствует
    #[error("No icpc-audio.yaml found in {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Ошибка конфигурации
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Не заданы учетные данные
    #[error("No credentials configured")]
    CredentialsMissing,

    /// Файл учетных данных не найден
    #[error("Credentials file not found: {}", .0.display())]
    CredentialsNotFound(PathBuf),

    /// Пользователь прервал ввод
    #[error("Cancelled")]
    Cancelled,

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка сериализации/десериализации YAML
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl IcpcAudioError {
    /// Сокращение для `SynthesisFailed`
    pub fn synthesis(cause: impl Into<String>) -> Self {
        IcpcAudioError::SynthesisFailed {
            cause: cause.into(),
        }
    }

    /// Ошибки, после которых запуск невозможен (CLI завершается с кодом 1)
    pub fn is_fatal_precondition(&self) -> bool {
        matches!(
            self,
            IcpcAudioError::DataNotFound(_)
                | IcpcAudioError::MalformedData(_)
                | IcpcAudioError::DuplicateId(_)
                | IcpcAudioError::UnsupportedFormat(_)
                | IcpcAudioError::ConfigNotFound(_)
                | IcpcAudioError::InvalidConfig(_)
                | IcpcAudioError::CredentialsMissing
                | IcpcAudioError::CredentialsNotFound(_)
        )
    }
}

/// Тип Result для icpc-audio
pub type Result<T> = std::result::Result<T, IcpcAudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IcpcAudioError::DataNotFound(PathBuf::from("/tmp/x/teams.json"));
        assert_eq!(err.to_string(), "Data file not found: /tmp/x/teams.json");

        let err = IcpcAudioError::synthesis("quota exceeded");
        assert_eq!(err.to_string(), "Speech synthesis failed: quota exceeded");

        let err = IcpcAudioError::UnsupportedFormat("flac".to_string());
        assert!(err.to_string().contains("flac"));
    }

    #[test]
    fn test_fatal_preconditions() {
        assert!(IcpcAudioError::CredentialsMissing.is_fatal_precondition());
        assert!(IcpcAudioError::DataNotFound(PathBuf::new()).is_fatal_precondition());
        assert!(!IcpcAudioError::synthesis("boom").is_fatal_precondition());
        assert!(!IcpcAudioError::Cancelled.is_fatal_precondition());
    }
}

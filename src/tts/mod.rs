//! Модуль для работы с TTS
//!
//! Этот модуль содержит контракт синтезатора речи, описание голосов и
//! реализацию для Google Cloud Text-to-Speech.

pub mod google;

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AudioFormat;
use crate::error::Result;

/// Кодировка аудио на стороне провайдера
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    Mp3,
    /// Несжатый PCM; провайдер добавляет WAV заголовок
    Linear16,
    M4a,
    OggOpus,
}

impl AudioEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::Linear16 => "LINEAR16",
            Self::M4a => "M4A",
            Self::OggOpus => "OGG_OPUS",
        }
    }
}

impl From<AudioFormat> for AudioEncoding {
    fn from(format: AudioFormat) -> Self {
        match format {
            AudioFormat::Mp3 => Self::Mp3,
            AudioFormat::Wav => Self::Linear16,
            AudioFormat::M4a => Self::M4a,
            AudioFormat::Ogg => Self::OggOpus,
        }
    }
}

/// Пол голоса (SSML gender)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceGender {
    Male,
    Female,
    Neutral,
    #[default]
    Unspecified,
}

impl VoiceGender {
    /// Неизвестные значения считаются `Unspecified`
    pub fn parse(value: &str) -> Self {
        match value {
            "MALE" => Self::Male,
            "FEMALE" => Self::Female,
            "NEUTRAL" => Self::Neutral,
            _ => Self::Unspecified,
        }
    }

    /// Название для таблиц (`MALE`, `FEMALE`, ...)
    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::Neutral => "NEUTRAL",
            Self::Unspecified => "SSML_VOICE_GENDER_UNSPECIFIED",
        }
    }
}

impl Serialize for VoiceGender {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for VoiceGender {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// Категория голоса, определяемая по имени
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceType {
    Neural,
    Wavenet,
    Standard,
}

impl VoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neural => "Neural",
            Self::Wavenet => "Wavenet",
            Self::Standard => "Standard",
        }
    }
}

impl fmt::Display for VoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Описание голоса из каталога провайдера
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDescriptor {
    pub name: String,
    #[serde(default)]
    pub language_codes: Vec<String>,
    #[serde(default, rename = "ssmlGender")]
    pub gender: VoiceGender,
    #[serde(default)]
    pub natural_sample_rate_hertz: Option<u32>,
}

impl VoiceDescriptor {
    pub fn voice_type(&self) -> VoiceType {
        if self.name.contains("Neural2") || self.name.contains("Journey") {
            VoiceType::Neural
        } else if self.name.contains("Wavenet") {
            VoiceType::Wavenet
        } else {
            VoiceType::Standard
        }
    }

    /// Основной язык голоса (первый в списке)
    pub fn primary_language(&self) -> &str {
        self.language_codes.first().map(String::as_str).unwrap_or("")
    }
}

/// Синтезатор речи
///
/// Экземпляр разделяется между всеми задачами, поэтому вызовы не должны
/// зависеть друг от друга.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Синтезировать речь и вернуть закодированное аудио.
    ///
    /// Любая ошибка провайдера возвращается как `SynthesisFailed`.
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
        voice_name: &str,
        format: AudioFormat,
    ) -> Result<Vec<u8>>;

    /// Список голосов, опционально отфильтрованный по языку
    async fn list_voices(&self, language_code: Option<&str>) -> Result<Vec<VoiceDescriptor>>;

    /// Отсортированный список уникальных кодов языков
    async fn list_languages(&self) -> Result<Vec<String>> {
        let voices = self.list_voices(None).await?;
        Ok(unique_languages(&voices))
    }
}

/// Уникальные коды языков всех голосов в порядке сортировки
pub fn unique_languages(voices: &[VoiceDescriptor]) -> Vec<String> {
    voices
        .iter()
        .flat_map(|v| v.language_codes.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

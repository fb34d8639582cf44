//! Модуль для интеграции с Google Cloud Text-to-Speech
//!
//! REST клиент для методов `text:synthesize` и `voices`. Учетные данные
//! передаются в конструктор явно; переменные окружения процесса не меняются.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{AudioEncoding, SpeechSynthesizer, VoiceDescriptor};
use crate::config::AudioFormat;
use crate::error::{IcpcAudioError, Result};

/// Базовый адрес REST API
pub const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1";

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Источник access token для запросов к API
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Токены сервисного аккаунта через gcp_auth
pub struct ServiceAccountTokens {
    provider: Arc<dyn TokenProvider>,
}

impl ServiceAccountTokens {
    /// Загрузить JSON сервисного аккаунта
    pub fn from_file(credentials_path: &Path) -> Result<Self> {
        let account = CustomServiceAccount::from_file(credentials_path).map_err(|e| {
            IcpcAudioError::InvalidConfig(format!(
                "failed to load credentials {}: {}",
                credentials_path.display(),
                e
            ))
        })?;
        Ok(Self {
            provider: Arc::new(account),
        })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String> {
        let token = self
            .provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| IcpcAudioError::synthesis(format!("authentication failed: {}", e)))?;
        Ok(token.as_str().to_string())
    }
}

/// Заранее известный токен (для тестов и отладки)
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: AudioEncoding,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

#[derive(Debug, Deserialize)]
struct ListVoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceDescriptor>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Клиент Google Cloud TTS
pub struct GoogleTtsClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GoogleTtsClient {
    /// Создать клиент с учетными данными сервисного аккаунта
    pub fn new(credentials_path: &Path) -> Result<Self> {
        log::debug!("Loading credentials from {}", credentials_path.display());
        let tokens = ServiceAccountTokens::from_file(credentials_path)?;
        Self::with_token_source(Arc::new(tokens))
    }

    /// Создать клиент с произвольным источником токенов
    pub fn with_token_source(tokens: Arc<dyn AccessTokenSource>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: GOOGLE_TTS_URL.to_string(),
            tokens,
        })
    }

    /// Переопределить базовый адрес API
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn send_synthesize(
        &self,
        text: &str,
        language_code: &str,
        voice_name: &str,
        format: AudioFormat,
    ) -> Result<Vec<u8>> {
        let token = self.tokens.access_token().await?;
        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code,
                name: voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: AudioEncoding::from(format),
            },
        };

        let response = self
            .client
            .post(format!("{}/text:synthesize", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| IcpcAudioError::synthesis(format!("request failed: {}", e)))?;

        let status = response.status();
        let text_body = response
            .text()
            .await
            .map_err(|e| IcpcAudioError::synthesis(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = api_error_message(status.as_u16(), &text_body);
            log::debug!("Google TTS API error (status {}): {}", status, message);
            return Err(IcpcAudioError::synthesis(message));
        }

        let parsed: SynthesizeResponse = serde_json::from_str(&text_body)
            .map_err(|e| IcpcAudioError::synthesis(format!("unexpected response: {}", e)))?;
        decode_audio(&parsed.audio_content)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
        voice_name: &str,
        format: AudioFormat,
    ) -> Result<Vec<u8>> {
        log::debug!(
            "Synthesizing {} chars with voice {} ({})",
            text.chars().count(),
            voice_name,
            format
        );
        match self.send_synthesize(text, language_code, voice_name, format).await {
            Ok(bytes) => Ok(bytes),
            Err(e @ IcpcAudioError::SynthesisFailed { .. }) => Err(e),
            Err(e) => Err(IcpcAudioError::synthesis(e.to_string())),
        }
    }

    async fn list_voices(&self, language_code: Option<&str>) -> Result<Vec<VoiceDescriptor>> {
        let token = self.tokens.access_token().await?;
        let mut request = self
            .client
            .get(format!("{}/voices", self.base_url))
            .bearer_auth(token);
        if let Some(code) = language_code.filter(|c| !c.is_empty()) {
            request = request.query(&[("languageCode", code)]);
        }

        let response = request.send().await?;
        let status = response.status();
        let text_body = response.text().await?;
        if !status.is_success() {
            let message = api_error_message(status.as_u16(), &text_body);
            log::error!("Google TTS voices request failed (status {}): {}", status, message);
            return Err(IcpcAudioError::synthesis(message));
        }

        let parsed: ListVoicesResponse = serde_json::from_str(&text_body)?;
        log::debug!("Fetched {} voices", parsed.voices.len());
        Ok(parsed.voices)
    }
}

/// Декодировать base64 `audioContent`
fn decode_audio(content: &str) -> Result<Vec<u8>> {
    if content.is_empty() {
        return Err(IcpcAudioError::synthesis("received empty audio content"));
    }
    BASE64
        .decode(content)
        .map_err(|e| IcpcAudioError::synthesis(format!("invalid audio content: {}", e)))
}

/// Сообщение об ошибке из тела ответа API
fn api_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => match parsed.error.status {
            Some(code) => format!("{} ({})", parsed.error.message, code),
            None => parsed.error.message,
        },
        _ if body.trim().is_empty() => format!("HTTP {}", status),
        _ => format!("HTTP {}: {}", status, body.trim()),
    }
}

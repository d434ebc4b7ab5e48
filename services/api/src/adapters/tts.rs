//! services/api/src/adapters/tts.rs
//!
//! This module contains the adapter for OpenAI's Text-to-Speech (TTS) service.
//! It implements the `TextToSpeechService` port from the `core` crate.
//!
//! Speech is requested as raw PCM and wrapped into a WAV container here, so the
//! browser can decode every narration frame without extra work.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::audio::{CreateSpeechRequest, SpeechModel, SpeechResponseFormat, Voice},
    Client,
};
use async_trait::async_trait;
use gramatica_core::ports::{PortError, PortResult, TextToSpeechService};
use hound::{WavSpec, WavWriter};

/// Sample rate of the provider's PCM output.
pub const PCM_SAMPLE_RATE: u32 = 24_000;

const VOICE_INSTRUCTIONS: &str = "Lê com entusiasmo em Português de Portugal (variante europeia), \
com um tom caloroso e brincalhão, adequado a crianças.";

/// Parses a configured voice name.
pub fn parse_voice(name: &str) -> Option<Voice> {
    match name.trim().to_lowercase().as_str() {
        "alloy" => Some(Voice::Alloy),
        "echo" => Some(Voice::Echo),
        "fable" => Some(Voice::Fable),
        "onyx" => Some(Voice::Onyx),
        "nova" => Some(Voice::Nova),
        "shimmer" => Some(Voice::Shimmer),
        _ => None,
    }
}

/// Maps a configured model name onto the client's speech model.
pub fn parse_speech_model(name: &str) -> SpeechModel {
    match name.trim() {
        "tts-1" => SpeechModel::Tts1,
        "tts-1-hd" => SpeechModel::Tts1Hd,
        other => SpeechModel::Other(other.to_string()),
    }
}

/// Wraps little-endian 16-bit mono PCM into a WAV file.
pub fn pcm16_to_wav(pcm_data: &[u8], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for chunk in pcm_data.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TextToSpeechService` port using the OpenAI TTS API.
#[derive(Clone)]
pub struct OpenAiTtsAdapter {
    client: Client<OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
}

impl OpenAiTtsAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: SpeechModel, voice: Voice) -> Self {
        Self {
            client,
            model,
            voice,
        }
    }
}

//=========================================================================================
// `TextToSpeechService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextToSpeechService for OpenAiTtsAdapter {
    async fn generate_audio(&self, text: &str) -> PortResult<Option<Vec<u8>>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let request = CreateSpeechRequest {
            model: self.model.clone(),
            input: text.to_string(),
            voice: self.voice.clone(),
            instructions: Some(VOICE_INSTRUCTIONS.to_string()),
            response_format: Some(SpeechResponseFormat::Pcm),
            ..Default::default()
        };

        let response = self
            .client
            .audio()
            .speech()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        if response.bytes.len() < 2 {
            return Ok(None);
        }
        let wav = pcm16_to_wav(&response.bytes, PCM_SAMPLE_RATE)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode WAV: {}", e)))?;
        Ok(Some(wav))
    }
}

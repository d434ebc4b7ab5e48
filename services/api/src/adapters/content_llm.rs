//! services/api/src/adapters/content_llm.rs
//!
//! This module contains the adapter for the question-writing LLM.
//! It implements the `ContentProvider` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use gramatica_core::{
    domain::{Difficulty, GeneratedQuestion},
    ports::{ContentProvider, PortError, PortResult},
};
use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("code fence pattern is valid")
});

const QUESTION_SYSTEM_PROMPT: &str = "És um autor de fichas de gramática para alunos do 2.º ciclo do ensino básico em Portugal (5.º e 6.º anos). \
REGRAS CRÍTICAS: \
1. Usa EXCLUSIVAMENTE o Português de Portugal (variante europeia). \
2. Utiliza a terminologia gramatical em vigor em Portugal (Dicionário Terminológico). \
3. O tom deve ser lúdico, pedagógico e motivador. \
4. Inclui uma \"pista\" (hint) curta que ajude o aluno sem dar a resposta diretamente. \
5. Evita termos como \"caderno\", \"professor\", \"aula\" se não forem estritamente necessários para o exercício. \
Responde APENAS com um objeto JSON com os campos: \"question\" (texto), \"options\" (exatamente 4 textos), \
\"correctAnswerIndex\" (inteiro de 0 a 3), \"explanation\" (texto), \"hint\" (texto) e \"difficulty\" (texto).";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentProvider` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiContentAdapter {
    client: Client<OpenAIConfig>,
    question_model: String,
    summary_model: String,
}

impl OpenAiContentAdapter {
    /// Creates a new `OpenAiContentAdapter`.
    pub fn new(client: Client<OpenAIConfig>, question_model: String, summary_model: String) -> Self {
        Self {
            client,
            question_model,
            summary_model,
        }
    }

    /// Sends one system + user exchange and returns the text of the first choice.
    async fn complete(
        &self,
        model: &str,
        system: &str,
        user: String,
        json_mode: bool,
    ) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(model).messages(messages).n(1);
        if json_mode {
            args.response_format(ResponseFormat::JsonObject);
        }
        let request = args
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::InvalidResponse("LLM response contained no text content.".to_string())
            })
    }
}

/// Parses the model's JSON answer, tolerating a surrounding markdown code fence.
pub fn parse_generated_question(raw: &str) -> PortResult<GeneratedQuestion> {
    let body = CODE_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw.trim(), |m| m.as_str());
    serde_json::from_str(body).map_err(|e| {
        PortError::InvalidResponse(format!("Question payload is not valid JSON: {}", e))
    })
}

//=========================================================================================
// `ContentProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentProvider for OpenAiContentAdapter {
    async fn generate_question(
        &self,
        topic: &str,
        difficulty: Difficulty,
    ) -> PortResult<GeneratedQuestion> {
        let prompt = format!(
            "Gera uma pergunta de gramática.\nTópico: \"{}\".\nNível de dificuldade: {}.",
            topic,
            difficulty.label()
        );
        let raw = self
            .complete(&self.question_model, QUESTION_SYSTEM_PROMPT, prompt, true)
            .await?;
        parse_generated_question(&raw)
    }

    async fn generate_summary(&self, score: u32, total: u32) -> PortResult<String> {
        let prompt = format!(
            "Cria uma mensagem curta de incentivo em Português de Portugal para um aluno que acertou {} de {} perguntas de gramática. Usa um tom de celebração e emojis.",
            score, total
        );
        let text = self
            .complete(
                &self.summary_model,
                "És um companheiro de aventura entusiasta que celebra as conquistas de crianças.",
                prompt,
                false,
            )
            .await?;
        Ok(text.trim().to_string())
    }
}

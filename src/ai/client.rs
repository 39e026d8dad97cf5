//! Chat-completion backed column classifier.
//!
//! Sends the column name and a handful of sample values to an
//! OpenAI-compatible endpoint and returns the model's one-word answer. The
//! pipeline parses and bounds the answer; this client only talks to the API.

use crate::analyser::logic::classify::TypeClassifier;
use crate::error::{CleanError, Result, ResultExt as _};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;

pub use crate::config::AIConfig;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const SYSTEM_PROMPT: &str =
    "You are a data analyst. Based on column samples, classify the column type.";

/// [`TypeClassifier`] that asks a language model.
pub struct LlmClassifier {
    client: Client<OpenAIConfig>,
    config: AIConfig,
}

impl LlmClassifier {
    pub fn new(api_key: String, config: AIConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if !config.api_base.is_empty() {
            openai_config = openai_config.with_api_base(config.api_base.clone());
        }
        let client = Client::with_config(openai_config);

        Self { client, config }
    }

    /// Reads the API key from `OPENAI_API_KEY`.
    pub fn from_env(config: AIConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| CleanError::Config(format!("{API_KEY_ENV} is not set")))?;
        Ok(Self::new(api_key, config))
    }

    fn user_prompt(column: &str, samples: &[String]) -> String {
        format!(
            "Column name: {column}\nSample values: {}\n\n\
             Possible types: numeric, categorical, datetime, boolean, text, ID/code.\n\
             Which type best fits? Reply with only the type.",
            samples.join(", ")
        )
    }
}

#[async_trait]
impl TypeClassifier for LlmClassifier {
    async fn classify(&self, column: &str, samples: &[String]) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .context("Failed to build system message")?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(Self::user_prompt(column, samples))
                .build()
                .context("Failed to build user message")?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()
            .context("Failed to build chat completion request")?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CleanError::ClassificationUnavailable(format!("OpenAI API error: {e}")))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                CleanError::ClassificationUnavailable("No response content received".to_owned())
            })
    }
}

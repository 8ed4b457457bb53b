use anyhow::{Context, Result};

pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            host: "https://api.openai.com".to_string(),
            api_key,
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Build a config from the environment, for callers with no CLI flags.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable must be set")?;
        Ok(Self::new(api_key, "gpt-4o-mini".to_string()))
    }
}

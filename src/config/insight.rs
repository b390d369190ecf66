use crate::config::var_or;
use dotenvy::var;
use secrecy::SecretString;

#[derive(Debug)]
pub struct InsightConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

impl InsightConfig {
    pub fn from_env() -> Self {
        let api_key = var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);
        if api_key.is_none() {
            info!("No GEMINI_API_KEY set, executive insights will use the fallback text");
        }

        Self {
            api_key,
            model: var_or("GEMINI_MODEL", "gemini-3-flash-preview"),
            base_url: var_or("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com"),
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

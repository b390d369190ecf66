use crate::config::var_or;
use secrecy::SecretString;

const DEFAULT_ADMIN_PHRASE: &str = "humble";
const DEFAULT_NURSE_PHRASE: &str = "medical";

/// The shared phrases that unlock the ADMIN and NURSE roles.
#[derive(Debug)]
pub struct PhraseConfig {
    pub admin_phrase: SecretString,
    pub nurse_phrase: SecretString,
}

impl PhraseConfig {
    pub fn from_env() -> Self {
        let admin_phrase = var_or("SECURELEAVE_ADMIN_PHRASE", DEFAULT_ADMIN_PHRASE);
        let nurse_phrase = var_or("SECURELEAVE_NURSE_PHRASE", DEFAULT_NURSE_PHRASE);

        if admin_phrase == DEFAULT_ADMIN_PHRASE || nurse_phrase == DEFAULT_NURSE_PHRASE {
            warn!("Using a built-in role phrase, set SECURELEAVE_ADMIN_PHRASE and SECURELEAVE_NURSE_PHRASE");
        }

        Self {
            admin_phrase: admin_phrase.into(),
            nurse_phrase: nurse_phrase.into(),
        }
    }
}

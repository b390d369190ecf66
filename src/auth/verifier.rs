use crate::{
    config::auth::PhraseConfig,
    data::user::Role,
    error::{BcryptSnafu, GateResult, JoinBlockingSnafu},
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use snafu::ResultExt;

/// Decides whether a phrase unlocks a role.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, role: Role, phrase: SecretString) -> GateResult<bool>;
}

///phrases are compared trimmed and case-insensitively
fn normalise(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}

/// One shared phrase per gated role, kept only as bcrypt hashes.
#[derive(Debug)]
pub struct SharedPhraseVerifier {
    admin_hash: SecretString,
    nurse_hash: SecretString,
}

impl SharedPhraseVerifier {
    pub fn new(config: &PhraseConfig) -> GateResult<Self> {
        Self::with_cost(config, bcrypt::DEFAULT_COST)
    }

    pub fn with_cost(config: &PhraseConfig, cost: u32) -> GateResult<Self> {
        let hash = |phrase: &SecretString| {
            bcrypt::hash(normalise(phrase.expose_secret()), cost)
                .map(SecretString::from)
                .context(BcryptSnafu)
        };

        Ok(Self {
            admin_hash: hash(&config.admin_phrase)?,
            nurse_hash: hash(&config.nurse_phrase)?,
        })
    }
}

#[async_trait]
impl CredentialVerifier for SharedPhraseVerifier {
    async fn verify(&self, role: Role, phrase: SecretString) -> GateResult<bool> {
        let hash = match role {
            Role::Admin => self.admin_hash.clone(),
            Role::Nurse => self.nurse_hash.clone(),
            Role::Teacher | Role::Security => return Ok(true),
            Role::Student => return Ok(false),
        };

        tokio::task::spawn_blocking(move || {
            bcrypt::verify(normalise(phrase.expose_secret()), hash.expose_secret())
        })
        .await
        .context(JoinBlockingSnafu)?
        .context(BcryptSnafu)
    }
}

use crate::error::{BadEnvVarSnafu, GateResult, ParsePortSnafu};
use dotenvy::var;
use secrecy::{ExposeSecret, SecretString};
use snafu::ResultExt;
use std::sync::Arc;

pub mod auth;
pub mod insight;
pub mod school;

use auth::PhraseConfig;
use insight::InsightConfig;
use school::SchoolConfig;

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    db_config: Arc<DbConfig>,
    school_config: Arc<SchoolConfig>,
    phrase_config: Arc<PhraseConfig>,
    insight_config: Arc<InsightConfig>,
}

impl RuntimeConfiguration {
    pub fn new() -> GateResult<Self> {
        Ok(Self {
            db_config: Arc::new(DbConfig::new()?),
            school_config: Arc::new(SchoolConfig::from_env()?),
            phrase_config: Arc::new(PhraseConfig::from_env()),
            insight_config: Arc::new(InsightConfig::from_env()),
        })
    }

    pub fn db_config(&self) -> Arc<DbConfig> {
        self.db_config.clone()
    }

    pub fn school_config(&self) -> Arc<SchoolConfig> {
        self.school_config.clone()
    }

    pub fn phrase_config(&self) -> Arc<PhraseConfig> {
        self.phrase_config.clone()
    }

    pub fn insight_config(&self) -> Arc<InsightConfig> {
        self.insight_config.clone()
    }
}

///optional env var, falling back to `default` when unset or empty
pub fn var_or(name: &'static str, default: &str) -> String {
    var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug)]
pub struct DbConfig {
    user: String,
    password: SecretString,
    path: String,
    port: u16,
    database: String,
}

impl DbConfig {
    pub fn new() -> GateResult<Self> {
        let get_env_var = |name| var(name).context(BadEnvVarSnafu { name });

        Ok(Self {
            user: get_env_var("DB_USER")?,
            password: SecretString::from(get_env_var("DB_PASSWORD")?),
            path: get_env_var("DB_PATH")?,
            port: get_env_var("DB_PORT")?.parse().context(ParsePortSnafu)?,
            database: get_env_var("DB_NAME")?,
        })
    }

    pub fn get_db_path(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.password.expose_secret(),
            self.path,
            self.port,
            self.database
        )
    }
}

use crate::{
    auth::GateSession,
    config::{RuntimeConfiguration, school::SchoolConfig},
    error::{GateResult, MigrateSnafu, OpenDatabaseSnafu},
    gatehouse::{Gatehouse, Subscription},
    insights::InsightGenerator,
    maud_conveniences::render_nav,
    store::{LeaveStore, postgres::PostgresLeaveStore},
};
use maud::{DOCTYPE, Markup, html};
use snafu::ResultExt;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;

///htmx leaves 4xx/5xx bodies unswapped by default, which would hide every error alert
pub const HTMX_CONFIG: &str = r#"{"responseHandling":[{"code":"204","swap":false},{"code":"[23]..","swap":true},{"code":"[45]..","swap":true,"error":true},{"code":"...","swap":false}]}"#;

#[derive(Clone, Debug)]
pub struct GateState {
    pool: PgPool,
    config: RuntimeConfiguration,
    gatehouse: Gatehouse,
    insights: InsightGenerator,
}

impl GateState {
    pub async fn new(options: PgPoolOptions, config: RuntimeConfiguration) -> GateResult<Self> {
        let pool = options
            .connect(&config.db_config().get_db_path())
            .await
            .context(OpenDatabaseSnafu)?;

        sqlx::migrate!().run(&pool).await.context(MigrateSnafu)?;

        let store: Arc<dyn LeaveStore> = Arc::new(PostgresLeaveStore::new(pool.clone()));
        let insights = InsightGenerator::new(config.insight_config())?;

        Ok(Self {
            pool,
            gatehouse: Gatehouse::spawn(store),
            insights,
            config,
        })
    }

    #[allow(clippy::unused_self)]
    pub fn render(&self, session: &GateSession, markup: Markup) -> Markup {
        let nav = render_nav(session.user.as_ref());

        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="UTF-8" {}
                    meta name="viewport" content="width=device-width, initial-scale=1.0" {}
                    meta name="htmx-config" content=(HTMX_CONFIG) {}
                    script src="https://unpkg.com/htmx.org@2.0.4" integrity="sha384-HGfztofotfshcF7+8n44JQL2oJmowVChPTg48S+jvZoztPfvwD79OC/LTtG6dMp+" crossorigin="anonymous" {}
                    script src="https://unpkg.com/htmx-ext-sse@2.2.3" integrity="sha384-Y4gc0CK6Kg+hmulDc6rZPJu0tqvk7EWlih0Oh+2OkAi1ZDlCbBDCQEE2uVk472Ky" crossorigin="anonymous" {}
                    script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" {}
                    title { "SecureLeave" }
                }
                body hx-ext="sse" class="bg-gray-900 min-h-screen flex flex-col items-center pt-24 pb-8 px-4 text-white" {
                    (nav)
                    (markup)
                }
            }
        }
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    pub fn gatehouse(&self) -> &Gatehouse {
        &self.gatehouse
    }

    pub fn insights(&self) -> &InsightGenerator {
        &self.insights
    }

    pub fn school(&self) -> Arc<SchoolConfig> {
        self.config.school_config()
    }

    pub fn subscribe(&self) -> Subscription {
        self.gatehouse.subscribe()
    }

    pub async fn sensible_shutdown(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn error_responses_are_swapped_in() {
        let config: Value = serde_json::from_str(HTMX_CONFIG).unwrap();
        let rules = config["responseHandling"].as_array().unwrap();

        let errors = rules.iter().find(|rule| rule["code"] == "[45]..").unwrap();
        assert_eq!(errors["swap"], true);
        assert_eq!(errors["error"], true);

        let success = rules.iter().find(|rule| rule["code"] == "[23]..").unwrap();
        assert_eq!(success["swap"], true);
        assert_eq!(rules.last().unwrap()["swap"], false);
    }
}

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use time::Date;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::store::{MealStore, PgStore, SchoolStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub schools: Arc<dyn SchoolStore>,
    pub meals: Arc<dyn MealStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let store = Arc::new(PgStore::new(db));
        let clock = Arc::new(SystemClock::new(config.utc_offset_hours)?);

        Ok(Self {
            config,
            schools: store.clone(),
            meals: store,
            clock,
        })
    }

    pub fn today(&self) -> Date {
        self.clock.today()
    }

    /// In-memory state pinned to Wednesday 2024-03-06 (ISO week 10).
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::clock::FixedClock;
        use crate::store::MemoryStore;

        let store = Arc::new(MemoryStore::default());
        Self {
            config: Arc::new(AppConfig::for_tests()),
            schools: store.clone(),
            meals: store,
            clock: Arc::new(FixedClock(time::macros::date!(2024 - 03 - 06))),
        }
    }

    #[cfg(test)]
    pub fn with_config(self, config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            ..self
        }
    }

    #[cfg(test)]
    pub fn with_today(self, today: Date) -> Self {
        Self {
            clock: Arc::new(crate::clock::FixedClock(today)),
            ..self
        }
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::meals::calendar::Season;
use crate::meals::repo_types::{MealCourses, MealRecord, MenuType};
use crate::schools::dto::SchoolInput;
use crate::schools::repo_types::School;

#[cfg(test)]
mod memory;

#[cfg(test)]
pub use memory::MemoryStore;

/// Why a school row could not be inserted.
#[derive(Debug, thiserror::Error)]
pub enum InsertSchoolError {
    #[error("administrator {0} already owns a school")]
    AdminTaken(Uuid),
    #[error("slug '{0}' is taken")]
    SlugTaken(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait SchoolStore: Send + Sync {
    async fn find_by_admin(&self, admin_id: Uuid) -> anyhow::Result<Option<School>>;
    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<School>>;
    async fn slug_taken(&self, slug: &str) -> anyhow::Result<bool>;
    /// All schools ordered by name.
    async fn list(&self) -> anyhow::Result<Vec<School>>;
    /// Case-insensitive substring match on name or city, ordered by name.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<School>>;
    async fn insert(&self, admin_id: Uuid, slug: &str, input: &SchoolInput) -> Result<School, InsertSchoolError>;
    async fn update(&self, id: Uuid, input: &SchoolInput) -> anyhow::Result<School>;
}

#[async_trait]
pub trait MealStore: Send + Sync {
    /// Records of (school, shape, week, season) ordered by day.
    async fn list_week(
        &self,
        school_id: Uuid,
        menu_type: MenuType,
        week: i16,
        season: Season,
    ) -> anyhow::Result<Vec<MealRecord>>;

    /// Inserts one placeholder per weekday when the week has no records yet,
    /// then returns the week ordered by day. Existing weeks are left as they
    /// are, even when some days are missing.
    async fn create_week_if_empty(
        &self,
        school_id: Uuid,
        menu_type: MenuType,
        week: i16,
        season: Season,
    ) -> anyhow::Result<Vec<MealRecord>>;

    /// Upserts every `(day, courses)` pair atomically: either all days are
    /// written or none.
    async fn save_week(
        &self,
        school_id: Uuid,
        week: i16,
        season: Season,
        days: &[(i16, MealCourses)],
    ) -> anyhow::Result<()>;
}

/// PostgreSQL-backed store. Queries live next to their feature in
/// `schools::repo` and `meals::repo`.
#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

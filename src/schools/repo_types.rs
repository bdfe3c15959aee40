use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::meals::calendar::SeasonChoice;
use crate::meals::repo_types::MenuType;

/// School record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct School {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub admin_id: Uuid, // owning administrator, not exposed in JSON
    pub slug: String,
    pub name: String,
    pub city: String,
    pub season_choice: SeasonChoice,
    pub week_bias: i16,
    pub menu_type: MenuType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

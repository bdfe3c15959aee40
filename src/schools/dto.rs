use serde::{Deserialize, Serialize};
use crate::meals::calendar::{Season, SeasonChoice};
use crate::meals::repo_types::MenuType;

use super::repo_types::School;

/// Request body for creating or updating the administrator's school.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchoolInput {
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub season_choice: SeasonChoice,
    #[serde(default)]
    pub week_bias: i16,
    #[serde(default)]
    pub menu_type: MenuType,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// School as shown to its administrator: the stored profile plus the menu
/// slot it resolves to today, to help calibrate `week_bias`.
#[derive(Debug, Serialize)]
pub struct SchoolDetails {
    #[serde(flatten)]
    pub school: School,
    pub current_season: Season,
    pub current_week: i16,
    pub current_day: i16,
}

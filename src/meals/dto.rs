use serde::{Deserialize, Serialize};

use super::calendar::Season;
use super::repo_types::{MealRecord, MenuType};
use crate::schools::repo_types::School;

/// Menu resolved for one day, together with the rest of its week.
#[derive(Debug, Clone, Serialize)]
pub struct MenuOfTheDay {
    pub week: i16,
    pub day: i16,
    pub season: Season,
    pub meal: Option<MealRecord>, // None when nothing is stored for the day
    pub weekly_meals: Vec<MealRecord>,
}

#[derive(Debug, Serialize)]
pub struct SchoolMenuResponse {
    pub school: School,
    #[serde(flatten)]
    pub menu: MenuOfTheDay,
}

#[derive(Debug, Deserialize)]
pub struct SeasonQuery {
    pub season: Option<Season>,
}

/// Values submitted for one day of a weekly edit. Which fields are allowed
/// depends on the school's menu type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayEdit {
    pub day: i16,
    pub menu: Option<String>,
    pub first_course: Option<String>,
    pub second_course: Option<String>,
    pub side_dish: Option<String>,
    pub fruit: Option<String>,
    pub snack: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeekEditRequest {
    pub days: Vec<DayEdit>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyMenuResponse {
    pub week: i16,
    pub season: Season,
    pub menu_type: MenuType,
    pub meals: Vec<MealRecord>,
}

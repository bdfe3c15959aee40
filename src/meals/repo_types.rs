use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::calendar::Season;

/// Shape of the meal records a school publishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "menu_type", rename_all = "lowercase")]
pub enum MenuType {
    /// One free-text field per day plus a snack.
    #[default]
    Simple,
    /// First course, second course, side dish, fruit and snack.
    Detailed,
}

impl MenuType {
    /// Empty courses of this shape, used for freshly created weeks.
    pub fn placeholder(self) -> MealCourses {
        match self {
            MenuType::Simple => MealCourses::Simple(SimpleMeal::default()),
            MenuType::Detailed => MealCourses::Detailed(DetailedMeal::default()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleMeal {
    pub menu: String,
    pub snack: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedMeal {
    pub first_course: String,
    pub second_course: String,
    pub side_dish: String,
    pub fruit: String,
    pub snack: String,
}

/// Courses served on one day, in the shape chosen by the school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "menu_type", rename_all = "lowercase")]
pub enum MealCourses {
    Simple(SimpleMeal),
    Detailed(DetailedMeal),
}

impl MealCourses {
    pub fn menu_type(&self) -> MenuType {
        match self {
            MealCourses::Simple(_) => MenuType::Simple,
            MealCourses::Detailed(_) => MenuType::Detailed,
        }
    }
}

/// One day of a school's menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub week: i16,
    pub day: i16,
    pub season: Season,
    #[serde(flatten)]
    pub courses: MealCourses,
}

/// Row of the `meals` table. Every course column exists for both shapes;
/// `menu_type` says which ones are meaningful.
#[derive(Debug, Clone, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub school_id: Uuid,
    pub menu_type: MenuType,
    pub season: Season,
    pub week: i16,
    pub day: i16,
    pub menu: String,
    pub first_course: String,
    pub second_course: String,
    pub side_dish: String,
    pub fruit: String,
    pub snack: String,
}

impl From<MealRow> for MealRecord {
    fn from(r: MealRow) -> Self {
        let courses = match r.menu_type {
            MenuType::Simple => MealCourses::Simple(SimpleMeal {
                menu: r.menu,
                snack: r.snack,
            }),
            MenuType::Detailed => MealCourses::Detailed(DetailedMeal {
                first_course: r.first_course,
                second_course: r.second_course,
                side_dish: r.side_dish,
                fruit: r.fruit,
                snack: r.snack,
            }),
        };
        Self {
            id: r.id,
            school_id: r.school_id,
            week: r.week,
            day: r.day,
            season: r.season,
            courses,
        }
    }
}

/// Column values written for a set of courses, in `meals` column order:
/// menu, first_course, second_course, side_dish, fruit, snack.
pub(crate) fn course_columns(courses: &MealCourses) -> [&str; 6] {
    match courses {
        MealCourses::Simple(m) => [m.menu.as_str(), "", "", "", "", m.snack.as_str()],
        MealCourses::Detailed(m) => [
            "",
            m.first_course.as_str(),
            m.second_course.as_str(),
            m.side_dish.as_str(),
            m.fruit.as_str(),
            m.snack.as_str(),
        ],
    }
}

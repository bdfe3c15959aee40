use std::collections::HashSet;

use time::Date;
use tracing::{debug, info, warn};

use super::calendar::{menu_slot, resolve_season, Season, MENU_WEEKS};
use super::dto::{DayEdit, MenuOfTheDay};
use super::repo_types::{DetailedMeal, MealCourses, MealRecord, MenuType, SimpleMeal};
use crate::error::{AppError, AppResult, DayErrors, FieldError};
use crate::schools::repo_types::School;
use crate::store::MealStore;

const SCHOOL_DAYS: i16 = 5;
const MAX_MENU_LEN: usize = 600;
const MAX_COURSE_LEN: usize = 200;

fn check_week(week: i16) -> AppResult<()> {
    if (1..=MENU_WEEKS).contains(&week) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("week must be between 1 and {MENU_WEEKS}, got {week}")))
    }
}

fn check_day(day: i16) -> AppResult<()> {
    if (1..=SCHOOL_DAYS).contains(&day) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("day must be between 1 and {SCHOOL_DAYS}, got {day}")))
    }
}

/// Today's menu for `school`. A day without a stored record yields
/// `meal: None`, the rest of the week is still returned.
pub async fn get_menu_for(store: &dyn MealStore, school: &School, today: Date) -> AppResult<MenuOfTheDay> {
    let (week, day) = menu_slot(today, school.week_bias);
    let season = resolve_season(school.season_choice, today);
    let weekly_meals = store
        .list_week(school.id, school.menu_type, week, season)
        .await?;
    let meal = weekly_meals.iter().find(|m| m.day == day).cloned();
    if meal.is_none() {
        debug!(school_id = %school.id, week, day, ?season, "no meal stored for today");
    }
    Ok(MenuOfTheDay {
        week,
        day,
        season,
        meal,
        weekly_meals,
    })
}

/// Menu of an explicitly requested week and day. The season defaults to the
/// one the school serves `today`. A missing record is `NotFound`.
pub async fn get_menu_at(
    store: &dyn MealStore,
    school: &School,
    week: i16,
    day: i16,
    season: Option<Season>,
    today: Date,
) -> AppResult<MenuOfTheDay> {
    check_week(week)?;
    check_day(day)?;
    let season = season.unwrap_or_else(|| resolve_season(school.season_choice, today));
    let weekly_meals = store
        .list_week(school.id, school.menu_type, week, season)
        .await?;
    let meal = weekly_meals
        .iter()
        .find(|m| m.day == day)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("meal for week {week}, day {day}")))?;
    Ok(MenuOfTheDay {
        week,
        day,
        season,
        meal: Some(meal),
        weekly_meals,
    })
}

/// Records of one week, creating five empty ones first if the week has none.
pub async fn get_or_create_week(
    store: &dyn MealStore,
    school: &School,
    week: i16,
    season: Season,
) -> AppResult<Vec<MealRecord>> {
    check_week(week)?;
    let meals = store
        .create_week_if_empty(school.id, school.menu_type, week, season)
        .await?;
    debug!(school_id = %school.id, week, ?season, count = meals.len(), "weekly menu loaded");
    Ok(meals)
}

/// Validates every day of `edits` and writes them in one batch. If any day
/// fails nothing is written and every failure is reported.
pub async fn update_week(
    store: &dyn MealStore,
    school: &School,
    week: i16,
    season: Season,
    edits: Vec<DayEdit>,
) -> AppResult<Vec<MealRecord>> {
    check_week(week)?;
    if edits.is_empty() {
        return Err(AppError::BadRequest("no days submitted".into()));
    }
    let days = match validate_week(school.menu_type, edits) {
        Ok(days) => days,
        Err(e) => {
            warn!(school_id = %school.id, week, ?season, error = %e, "weekly menu rejected");
            return Err(e);
        }
    };
    store.save_week(school.id, week, season, &days).await?;
    info!(school_id = %school.id, week, ?season, days = days.len(), "weekly menu updated");
    Ok(store
        .list_week(school.id, school.menu_type, week, season)
        .await?)
}

/// Checks a whole batch of edits, returning the courses to store per day.
pub fn validate_week(menu_type: MenuType, edits: Vec<DayEdit>) -> AppResult<Vec<(i16, MealCourses)>> {
    let mut seen = HashSet::new();
    let mut days = Vec::with_capacity(edits.len());
    let mut failures = Vec::new();

    for (index, edit) in edits.into_iter().enumerate() {
        let day = edit.day;
        let mut errors = Vec::new();
        if !(1..=SCHOOL_DAYS).contains(&day) {
            errors.push(FieldError::new("day", format!("Day must be between 1 and {SCHOOL_DAYS}")));
        } else if !seen.insert(day) {
            errors.push(FieldError::new("day", "Day appears more than once"));
        }
        match courses_from_edit(menu_type, edit) {
            Ok(courses) if errors.is_empty() => days.push((day, courses)),
            Ok(_) => {}
            Err(mut field_errors) => errors.append(&mut field_errors),
        }
        if !errors.is_empty() {
            failures.push(DayErrors { index, day, errors });
        }
    }

    if failures.is_empty() {
        Ok(days)
    } else {
        Err(AppError::InvalidWeek(failures))
    }
}

/// Builds the courses of `menu_type` from a submitted day.
pub fn courses_from_edit(menu_type: MenuType, edit: DayEdit) -> Result<MealCourses, Vec<FieldError>> {
    let mut errors = Vec::new();
    let courses = match menu_type {
        MenuType::Simple => {
            for (field, value) in [
                ("first_course", &edit.first_course),
                ("second_course", &edit.second_course),
                ("side_dish", &edit.side_dish),
                ("fruit", &edit.fruit),
            ] {
                reject_foreign(field, value, "simple", &mut errors);
            }
            MealCourses::Simple(SimpleMeal {
                menu: field_value("menu", edit.menu, true, MAX_MENU_LEN, &mut errors),
                snack: field_value("snack", edit.snack, false, MAX_COURSE_LEN, &mut errors),
            })
        }
        MenuType::Detailed => {
            reject_foreign("menu", &edit.menu, "detailed", &mut errors);
            MealCourses::Detailed(DetailedMeal {
                first_course: field_value("first_course", edit.first_course, true, MAX_COURSE_LEN, &mut errors),
                second_course: field_value("second_course", edit.second_course, true, MAX_COURSE_LEN, &mut errors),
                side_dish: field_value("side_dish", edit.side_dish, false, MAX_COURSE_LEN, &mut errors),
                fruit: field_value("fruit", edit.fruit, false, MAX_COURSE_LEN, &mut errors),
                snack: field_value("snack", edit.snack, false, MAX_COURSE_LEN, &mut errors),
            })
        }
    };
    if errors.is_empty() {
        Ok(courses)
    } else {
        Err(errors)
    }
}

fn field_value(
    field: &'static str,
    value: Option<String>,
    required: bool,
    max_len: usize,
    errors: &mut Vec<FieldError>,
) -> String {
    let value = value.as_deref().map(str::trim).unwrap_or_default().to_string();
    if required && value.is_empty() {
        errors.push(FieldError::new(field, "This field is required"));
    } else if value.chars().count() > max_len {
        errors.push(FieldError::new(
            field,
            format!("Ensure this value has at most {max_len} characters"),
        ));
    }
    value
}

fn reject_foreign(field: &'static str, value: &Option<String>, shape: &str, errors: &mut Vec<FieldError>) {
    if value.as_deref().is_some_and(|v| !v.trim().is_empty()) {
        errors.push(FieldError::new(field, format!("Not a field of {shape} menus")));
    }
}

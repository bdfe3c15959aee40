use serde::{Deserialize, Serialize};
use time::{Date, Month};

/// Number of canonical menu weeks stored per school and season.
pub const MENU_WEEKS: i16 = 4;

/// Seasonal variant a meal record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "season", rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
}

/// Season setting of a school. `Automatic` follows the calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "season_choice", rename_all = "lowercase")]
pub enum SeasonChoice {
    #[default]
    Automatic,
    Winter,
    Spring,
}

/// Season a school is serving on `date`.
pub fn resolve_season(choice: SeasonChoice, date: Date) -> Season {
    match choice {
        SeasonChoice::Winter => Season::Winter,
        SeasonChoice::Spring => Season::Spring,
        SeasonChoice::Automatic => season_of(date),
    }
}

// Winter runs from Sep 22 to Mar 19 inclusive; Mar 20 and Sep 21 are spring.
fn season_of(date: Date) -> Season {
    let day = date.day();
    match date.month() {
        Month::October | Month::November | Month::December | Month::January | Month::February => {
            Season::Winter
        }
        Month::April | Month::May | Month::June | Month::July | Month::August => Season::Spring,
        Month::March if day < 20 => Season::Winter,
        Month::March => Season::Spring,
        Month::September if day > 21 => Season::Winter,
        Month::September => Season::Spring,
    }
}

/// ISO week and weekday (1 = Monday) the menu should show for `date`.
///
/// Weekends show the following Monday. The week is not wrapped at year end,
/// `canonical_week` folds it anyway.
pub fn resolve_week_day(date: Date) -> (i16, i16) {
    let week = i16::from(date.iso_week());
    let weekday = i16::from(date.weekday().number_from_monday());
    if weekday > 5 {
        (week + 1, 1)
    } else {
        (week, weekday)
    }
}

/// Maps an ISO week onto one of the stored weeks `1..=MENU_WEEKS`, shifted by
/// the school's `bias`.
///
/// A multiple of `MENU_WEEKS` maps to `MENU_WEEKS`, never to 0. Every school
/// calibrated its bias against this rotation, so changing it shifts all of
/// their menus.
pub fn canonical_week(iso_week: i16, bias: i16) -> i16 {
    match (iso_week + bias).rem_euclid(MENU_WEEKS) {
        0 => MENU_WEEKS,
        rest => rest,
    }
}

/// Stored week and weekday to show on `date` for a school with `bias`.
pub fn menu_slot(date: Date, bias: i16) -> (i16, i16) {
    let (iso_week, day) = resolve_week_day(date);
    (canonical_week(iso_week, bias), day)
}

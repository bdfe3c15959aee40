use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{InsertSchoolError, MealStore, SchoolStore};
use crate::meals::calendar::Season;
use crate::meals::repo_types::{MealCourses, MealRecord, MenuType};
use crate::schools::dto::SchoolInput;
use crate::schools::repo_types::School;

// Same ordering as the `uq_meals_slot` constraint, so a range over the first
// four components is one week ordered by day.
type SlotKey = (Uuid, MenuType, Season, i16, i16);

/// In-process store backing the handler and service tests.
#[derive(Default)]
pub struct MemoryStore {
    schools: RwLock<Vec<School>>,
    meals: RwLock<BTreeMap<SlotKey, MealRecord>>,
}

fn week_of(
    meals: &BTreeMap<SlotKey, MealRecord>,
    school_id: Uuid,
    menu_type: MenuType,
    week: i16,
    season: Season,
) -> Vec<MealRecord> {
    meals
        .range((school_id, menu_type, season, week, i16::MIN)..=(school_id, menu_type, season, week, i16::MAX))
        .map(|(_, record)| record.clone())
        .collect()
}

fn sorted_by_name(mut schools: Vec<School>) -> Vec<School> {
    schools.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    schools
}

#[async_trait]
impl SchoolStore for MemoryStore {
    async fn find_by_admin(&self, admin_id: Uuid) -> anyhow::Result<Option<School>> {
        let schools = self.schools.read().await;
        Ok(schools.iter().find(|s| s.admin_id == admin_id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<School>> {
        let schools = self.schools.read().await;
        Ok(schools.iter().find(|s| s.slug == slug).cloned())
    }

    async fn slug_taken(&self, slug: &str) -> anyhow::Result<bool> {
        let schools = self.schools.read().await;
        Ok(schools.iter().any(|s| s.slug == slug))
    }

    async fn list(&self) -> anyhow::Result<Vec<School>> {
        Ok(sorted_by_name(self.schools.read().await.clone()))
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<School>> {
        let needle = query.to_lowercase();
        let schools = self.schools.read().await;
        let found = schools
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&needle) || s.city.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(sorted_by_name(found))
    }

    async fn insert(&self, admin_id: Uuid, slug: &str, input: &SchoolInput) -> Result<School, InsertSchoolError> {
        let mut schools = self.schools.write().await;
        if schools.iter().any(|s| s.admin_id == admin_id) {
            return Err(InsertSchoolError::AdminTaken(admin_id));
        }
        if schools.iter().any(|s| s.slug == slug) {
            return Err(InsertSchoolError::SlugTaken(slug.to_string()));
        }
        let school = School {
            id: Uuid::new_v4(),
            admin_id,
            slug: slug.to_string(),
            name: input.name.clone(),
            city: input.city.clone(),
            season_choice: input.season_choice,
            week_bias: input.week_bias,
            menu_type: input.menu_type,
            created_at: OffsetDateTime::now_utc(),
        };
        schools.push(school.clone());
        Ok(school)
    }

    async fn update(&self, id: Uuid, input: &SchoolInput) -> anyhow::Result<School> {
        let mut schools = self.schools.write().await;
        let school = schools
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| anyhow::anyhow!("school {id} not found"))?;
        school.name = input.name.clone();
        school.city = input.city.clone();
        school.season_choice = input.season_choice;
        school.week_bias = input.week_bias;
        school.menu_type = input.menu_type;
        Ok(school.clone())
    }
}

#[async_trait]
impl MealStore for MemoryStore {
    async fn list_week(
        &self,
        school_id: Uuid,
        menu_type: MenuType,
        week: i16,
        season: Season,
    ) -> anyhow::Result<Vec<MealRecord>> {
        let meals = self.meals.read().await;
        Ok(week_of(&meals, school_id, menu_type, week, season))
    }

    async fn create_week_if_empty(
        &self,
        school_id: Uuid,
        menu_type: MenuType,
        week: i16,
        season: Season,
    ) -> anyhow::Result<Vec<MealRecord>> {
        let mut meals = self.meals.write().await;
        if week_of(&meals, school_id, menu_type, week, season).is_empty() {
            for day in 1..=5 {
                let record = MealRecord {
                    id: Uuid::new_v4(),
                    school_id,
                    week,
                    day,
                    season,
                    courses: menu_type.placeholder(),
                };
                meals.insert((school_id, menu_type, season, week, day), record);
            }
        }
        Ok(week_of(&meals, school_id, menu_type, week, season))
    }

    async fn save_week(
        &self,
        school_id: Uuid,
        week: i16,
        season: Season,
        days: &[(i16, MealCourses)],
    ) -> anyhow::Result<()> {
        // The write lock is held for the whole batch, so readers see all of it
        // or none of it.
        let mut meals = self.meals.write().await;
        for (day, courses) in days {
            let key = (school_id, courses.menu_type(), season, week, *day);
            meals
                .entry(key)
                .and_modify(|record| record.courses = courses.clone())
                .or_insert_with(|| MealRecord {
                    id: Uuid::new_v4(),
                    school_id,
                    week,
                    day: *day,
                    season,
                    courses: courses.clone(),
                });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::repo_types::SimpleMeal;

    fn simple(menu: &str) -> MealCourses {
        MealCourses::Simple(SimpleMeal {
            menu: menu.into(),
            snack: String::new(),
        })
    }

    #[tokio::test]
    async fn week_is_ordered_by_day_and_isolated_by_key() {
        let store = MemoryStore::default();
        let school = Uuid::new_v4();
        store
            .save_week(school, 2, Season::Winter, &[(3, simple("c")), (1, simple("a")), (2, simple("b"))])
            .await
            .unwrap();
        store.save_week(school, 3, Season::Winter, &[(1, simple("other week"))]).await.unwrap();
        store.save_week(school, 2, Season::Spring, &[(1, simple("other season"))]).await.unwrap();

        let week = store.list_week(school, MenuType::Simple, 2, Season::Winter).await.unwrap();
        let days: Vec<_> = week.iter().map(|m| m.day).collect();
        assert_eq!(days, vec![1, 2, 3]);
        assert!(store
            .list_week(school, MenuType::Detailed, 2, Season::Winter)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn save_week_keeps_record_ids() {
        let store = MemoryStore::default();
        let school = Uuid::new_v4();
        let created = store
            .create_week_if_empty(school, MenuType::Simple, 1, Season::Spring)
            .await
            .unwrap();
        store.save_week(school, 1, Season::Spring, &[(1, simple("Pasta"))]).await.unwrap();
        let week = store.list_week(school, MenuType::Simple, 1, Season::Spring).await.unwrap();
        assert_eq!(week[0].id, created[0].id);
        assert_eq!(week[0].courses, simple("Pasta"));
    }
}

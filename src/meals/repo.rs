use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::calendar::Season;
use super::repo_types::{course_columns, MealCourses, MealRecord, MealRow, MenuType};
use crate::store::{MealStore, PgStore};

async fn fetch_week(
    db: &PgPool,
    school_id: Uuid,
    menu_type: MenuType,
    week: i16,
    season: Season,
) -> anyhow::Result<Vec<MealRecord>> {
    let rows = sqlx::query_as::<_, MealRow>(
        r#"
        SELECT id, school_id, menu_type, season, week, day,
               menu, first_course, second_course, side_dish, fruit, snack
          FROM meals
         WHERE school_id = $1 AND menu_type = $2 AND week = $3 AND season = $4
         ORDER BY day ASC
        "#,
    )
    .bind(school_id)
    .bind(menu_type)
    .bind(week)
    .bind(season)
    .fetch_all(db)
    .await
    .context("list meals of week")?;

    Ok(rows.into_iter().map(MealRecord::from).collect())
}

/// Insert or overwrite the courses of one day within a transaction.
async fn upsert_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    school_id: Uuid,
    week: i16,
    season: Season,
    day: i16,
    courses: &MealCourses,
    overwrite: bool,
) -> anyhow::Result<()> {
    let on_conflict = if overwrite {
        r#"DO UPDATE SET menu = EXCLUDED.menu,
                         first_course = EXCLUDED.first_course,
                         second_course = EXCLUDED.second_course,
                         side_dish = EXCLUDED.side_dish,
                         fruit = EXCLUDED.fruit,
                         snack = EXCLUDED.snack,
                         updated_at = now()"#
    } else {
        "DO NOTHING"
    };
    let [menu, first_course, second_course, side_dish, fruit, snack] = course_columns(courses);

    sqlx::query(&format!(
        r#"
        INSERT INTO meals (school_id, menu_type, season, week, day,
                           menu, first_course, second_course, side_dish, fruit, snack)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT ON CONSTRAINT uq_meals_slot {on_conflict}
        "#
    ))
    .bind(school_id)
    .bind(courses.menu_type())
    .bind(season)
    .bind(week)
    .bind(day)
    .bind(menu)
    .bind(first_course)
    .bind(second_course)
    .bind(side_dish)
    .bind(fruit)
    .bind(snack)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("upsert meal day {day}"))?;

    Ok(())
}

#[async_trait]
impl MealStore for PgStore {
    async fn list_week(
        &self,
        school_id: Uuid,
        menu_type: MenuType,
        week: i16,
        season: Season,
    ) -> anyhow::Result<Vec<MealRecord>> {
        fetch_week(&self.db, school_id, menu_type, week, season).await
    }

    async fn create_week_if_empty(
        &self,
        school_id: Uuid,
        menu_type: MenuType,
        week: i16,
        season: Season,
    ) -> anyhow::Result<Vec<MealRecord>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM meals
                 WHERE school_id = $1 AND menu_type = $2 AND week = $3 AND season = $4
            )
            "#,
        )
        .bind(school_id)
        .bind(menu_type)
        .bind(week)
        .bind(season)
        .fetch_one(&mut *tx)
        .await
        .context("check week exists")?;

        if !exists {
            // A concurrent request creating the same week hits the unique
            // constraint and skips its rows.
            let placeholder = menu_type.placeholder();
            for day in 1..=5 {
                upsert_meal_tx(&mut tx, school_id, week, season, day, &placeholder, false).await?;
            }
        }
        tx.commit().await.context("commit tx")?;

        fetch_week(&self.db, school_id, menu_type, week, season).await
    }

    async fn save_week(
        &self,
        school_id: Uuid,
        week: i16,
        season: Season,
        days: &[(i16, MealCourses)],
    ) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        for (day, courses) in days {
            upsert_meal_tx(&mut tx, school_id, week, season, *day, courses, true).await?;
        }
        tx.commit().await.context("commit tx")?;
        Ok(())
    }
}

use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::dto::SchoolInput;
use super::repo_types::School;
use crate::store::{InsertSchoolError, PgStore, SchoolStore};

const SCHOOL_COLUMNS: &str =
    "id, admin_id, slug, name, city, season_choice, week_bias, menu_type, created_at";

/// Maps unique violations on the `schools` constraints to their meaning.
fn insert_error(e: sqlx::Error, admin_id: Uuid, slug: &str) -> InsertSchoolError {
    let constraint = match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => db.constraint().map(str::to_owned),
        _ => None,
    };
    match constraint.as_deref() {
        Some("uq_schools_admin") => InsertSchoolError::AdminTaken(admin_id),
        Some("uq_schools_slug") => InsertSchoolError::SlugTaken(slug.to_string()),
        _ => InsertSchoolError::Other(anyhow::Error::new(e).context("insert school")),
    }
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl SchoolStore for PgStore {
    async fn find_by_admin(&self, admin_id: Uuid) -> anyhow::Result<Option<School>> {
        let school = sqlx::query_as::<_, School>(&format!(
            "SELECT {SCHOOL_COLUMNS} FROM schools WHERE admin_id = $1"
        ))
        .bind(admin_id)
        .fetch_optional(&self.db)
        .await
        .context("find school by admin")?;
        Ok(school)
    }

    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<School>> {
        let school = sqlx::query_as::<_, School>(&format!(
            "SELECT {SCHOOL_COLUMNS} FROM schools WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.db)
        .await
        .context("find school by slug")?;
        Ok(school)
    }

    async fn slug_taken(&self, slug: &str) -> anyhow::Result<bool> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM schools WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.db)
            .await
            .context("check slug")?;
        Ok(taken)
    }

    async fn list(&self) -> anyhow::Result<Vec<School>> {
        let rows = sqlx::query_as::<_, School>(&format!(
            "SELECT {SCHOOL_COLUMNS} FROM schools ORDER BY lower(name), id"
        ))
        .fetch_all(&self.db)
        .await
        .context("list schools")?;
        Ok(rows)
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<School>> {
        let rows = sqlx::query_as::<_, School>(&format!(
            r#"
            SELECT {SCHOOL_COLUMNS}
              FROM schools
             WHERE name ILIKE $1 OR city ILIKE $1
             ORDER BY lower(name), id
            "#
        ))
        .bind(like_pattern(query))
        .fetch_all(&self.db)
        .await
        .context("search schools")?;
        Ok(rows)
    }

    async fn insert(&self, admin_id: Uuid, slug: &str, input: &SchoolInput) -> Result<School, InsertSchoolError> {
        let school = sqlx::query_as::<_, School>(&format!(
            r#"
            INSERT INTO schools (admin_id, slug, name, city, season_choice, week_bias, menu_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SCHOOL_COLUMNS}
            "#
        ))
        .bind(admin_id)
        .bind(slug)
        .bind(&input.name)
        .bind(&input.city)
        .bind(input.season_choice)
        .bind(input.week_bias)
        .bind(input.menu_type)
        .fetch_one(&self.db)
        .await
        .map_err(|e| insert_error(e, admin_id, slug))?;
        Ok(school)
    }

    async fn update(&self, id: Uuid, input: &SchoolInput) -> anyhow::Result<School> {
        let school = sqlx::query_as::<_, School>(&format!(
            r#"
            UPDATE schools
               SET name = $2, city = $3, season_choice = $4, week_bias = $5, menu_type = $6
             WHERE id = $1
            RETURNING {SCHOOL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.city)
        .bind(input.season_choice)
        .bind(input.week_bias)
        .bind(input.menu_type)
        .fetch_one(&self.db)
        .await
        .context("update school")?;
        Ok(school)
    }
}

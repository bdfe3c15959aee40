use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use time::Date;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldError};
use crate::meals::calendar::{menu_slot, resolve_season};
use crate::store::{InsertSchoolError, SchoolStore};

use super::dto::{SchoolDetails, SchoolInput};
use super::repo_types::School;

const MAX_NAME_LEN: usize = 200;
const MAX_WEEK_BIAS: i16 = 3;
const MAX_SLUG_ATTEMPTS: usize = 20;

/// URL-safe identifier derived from a school name.
pub(crate) fn slugify(name: &str) -> String {
    lazy_static! {
        static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    }
    let folded: String = name
        .chars()
        .map(fold_accent)
        .flat_map(char::to_lowercase)
        .collect();
    let slug = NON_ALNUM.replace_all(&folded, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "school".to_string()
    } else {
        slug.to_string()
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'À' | 'Á' | 'Â' | 'Ä' => 'a',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other,
    }
}

fn slug_candidate(base: &str, n: usize) -> String {
    if n <= 1 {
        base.to_string()
    } else {
        format!("{base}-{n}")
    }
}

/// Smallest suffix whose candidate slug is free right now.
async fn free_slug_suffix(store: &dyn SchoolStore, base: &str) -> anyhow::Result<usize> {
    let mut n = 1;
    while store.slug_taken(&slug_candidate(base, n)).await? {
        n += 1;
    }
    Ok(n)
}

fn already_owns_school(admin_id: Uuid) -> AppError {
    warn!(%admin_id, "administrator already owns a school");
    AppError::Conflict("administrator already owns a school".into())
}

/// Trims the text fields and checks every rule, collecting all failures.
pub fn validate_school(input: SchoolInput) -> AppResult<SchoolInput> {
    let input = SchoolInput {
        name: input.name.trim().to_string(),
        city: input.city.trim().to_string(),
        ..input
    };

    let mut errors = Vec::new();
    for (field, value) in [("name", &input.name), ("city", &input.city)] {
        if value.is_empty() {
            errors.push(FieldError::new(field, "This field is required"));
        } else if value.chars().count() > MAX_NAME_LEN {
            errors.push(FieldError::new(
                field,
                format!("Ensure this value has at most {MAX_NAME_LEN} characters"),
            ));
        }
    }
    if input.week_bias < 0 {
        errors.push(FieldError::new("week_bias", "The minimum value is 0"));
    } else if input.week_bias > MAX_WEEK_BIAS {
        errors.push(FieldError::new("week_bias", "The maximum value is 3"));
    }

    if errors.is_empty() {
        Ok(input)
    } else {
        Err(AppError::InvalidSchool(errors))
    }
}

/// Creates the administrator's school under a slug derived from its name.
///
/// The checks before the insert can race with another request; the store's
/// unique constraints settle it, either as a conflict on the administrator or
/// by moving on to the next slug suffix.
pub async fn create_school(
    store: &dyn SchoolStore,
    admin_id: Uuid,
    input: SchoolInput,
) -> AppResult<School> {
    let input = validate_school(input)?;
    if store.find_by_admin(admin_id).await?.is_some() {
        return Err(already_owns_school(admin_id));
    }
    let base = slugify(&input.name);
    let mut n = free_slug_suffix(store, &base).await?;
    for _ in 0..MAX_SLUG_ATTEMPTS {
        let slug = slug_candidate(&base, n);
        match store.insert(admin_id, &slug, &input).await {
            Ok(school) => {
                info!(school_id = %school.id, slug = %school.slug, %admin_id, "school created");
                return Ok(school);
            }
            Err(InsertSchoolError::AdminTaken(_)) => return Err(already_owns_school(admin_id)),
            Err(InsertSchoolError::SlugTaken(slug)) => {
                debug!(%slug, "slug taken concurrently");
                n += 1;
            }
            Err(InsertSchoolError::Other(e)) => return Err(e.into()),
        }
    }
    Err(AppError::Conflict(format!("no free slug for '{base}'")))
}

/// Updates the administrator's school. The slug never changes so published
/// links keep working.
pub async fn update_school(
    store: &dyn SchoolStore,
    admin_id: Uuid,
    input: SchoolInput,
) -> AppResult<School> {
    let input = validate_school(input)?;
    let current = my_school(store, admin_id).await?;
    let school = store
        .update(current.id, &input)
        .await
        .context("update school")?;
    info!(school_id = %school.id, %admin_id, "school updated");
    Ok(school)
}

pub async fn my_school(store: &dyn SchoolStore, admin_id: Uuid) -> AppResult<School> {
    store
        .find_by_admin(admin_id)
        .await?
        .ok_or_else(|| AppError::NotFound("school".into()))
}

pub async fn school_by_slug(store: &dyn SchoolStore, slug: &str) -> AppResult<School> {
    store
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("school '{slug}'")))
}

pub async fn list_schools(store: &dyn SchoolStore) -> AppResult<Vec<School>> {
    Ok(store.list().await?)
}

/// Blank queries match nothing.
pub async fn search_schools(store: &dyn SchoolStore, query: &str) -> AppResult<Vec<School>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    Ok(store.search(query).await?)
}

pub fn school_details(school: School, today: Date) -> SchoolDetails {
    let (current_week, current_day) = menu_slot(today, school.week_bias);
    SchoolDetails {
        current_season: resolve_season(school.season_choice, today),
        current_week,
        current_day,
        school,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::calendar::{Season, SeasonChoice};
    use crate::meals::repo_types::MenuType;
    use crate::store::MemoryStore;
    use time::macros::date;

    fn input(name: &str, city: &str) -> SchoolInput {
        SchoolInput {
            name: name.into(),
            city: city.into(),
            season_choice: SeasonChoice::Automatic,
            week_bias: 0,
            menu_type: MenuType::Simple,
        }
    }

    #[test]
    fn slugify_folds_accents_and_punctuation() {
        assert_eq!(slugify("Scuola Primaria Città"), "scuola-primaria-citta");
        assert_eq!(slugify("  I.C. \"Giovanni Pascoli\"  "), "i-c-giovanni-pascoli");
        assert_eq!(slugify("!!!"), "school");
    }

    #[test]
    fn validation_collects_every_error() {
        let mut bad = input("  ", "");
        bad.week_bias = 4;
        match validate_school(bad) {
            Err(AppError::InvalidSchool(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["name", "city", "week_bias"]);
                assert_eq!(errors[2].message, "The maximum value is 3");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn validation_trims_text() {
        let ok = validate_school(input("  Scuola Rodari ", " Milano ")).unwrap();
        assert_eq!(ok.name, "Scuola Rodari");
        assert_eq!(ok.city, "Milano");
    }

    #[tokio::test]
    async fn one_school_per_administrator() {
        let store = MemoryStore::default();
        let admin = Uuid::new_v4();
        create_school(&store, admin, input("Scuola Rodari", "Milano")).await.unwrap();
        let err = create_school(&store, admin, input("Another", "Roma")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(list_schools(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn slugs_stay_unique() {
        let store = MemoryStore::default();
        let a = create_school(&store, Uuid::new_v4(), input("Scuola Rodari", "Milano")).await.unwrap();
        let b = create_school(&store, Uuid::new_v4(), input("Scuola Rodari", "Torino")).await.unwrap();
        let c = create_school(&store, Uuid::new_v4(), input("Scuola  Rodari!", "Bari")).await.unwrap();
        assert_eq!(a.slug, "scuola-rodari");
        assert_eq!(b.slug, "scuola-rodari-2");
        assert_eq!(c.slug, "scuola-rodari-3");
    }

    #[tokio::test]
    async fn update_keeps_slug_and_applies_settings() {
        let store = MemoryStore::default();
        let admin = Uuid::new_v4();
        let created = create_school(&store, admin, input("Scuola Rodari", "Milano")).await.unwrap();

        let mut changes = input("Scuola Gianni Rodari", "Monza");
        changes.week_bias = 2;
        changes.menu_type = MenuType::Detailed;
        changes.season_choice = SeasonChoice::Winter;
        let updated = update_school(&store, admin, changes).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.slug, "scuola-rodari");
        assert_eq!(updated.city, "Monza");
        assert_eq!(updated.week_bias, 2);
        assert_eq!(updated.menu_type, MenuType::Detailed);
        assert_eq!(school_by_slug(&store, "scuola-rodari").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_without_school_is_not_found() {
        let store = MemoryStore::default();
        let err = update_school(&store, Uuid::new_v4(), input("Scuola", "Milano")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_update_leaves_school_untouched() {
        let store = MemoryStore::default();
        let admin = Uuid::new_v4();
        let created = create_school(&store, admin, input("Scuola Rodari", "Milano")).await.unwrap();
        let mut bad = input("", "Roma");
        bad.week_bias = 7;
        assert!(update_school(&store, admin, bad).await.is_err());
        assert_eq!(my_school(&store, admin).await.unwrap(), created);
    }

    #[tokio::test]
    async fn search_matches_name_or_city_case_insensitively() {
        let store = MemoryStore::default();
        create_school(&store, Uuid::new_v4(), input("Test School", "Milano")).await.unwrap();
        create_school(&store, Uuid::new_v4(), input("Scuola Verdi", "Roma")).await.unwrap();

        let by_name = search_schools(&store, "TEST").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Test School");

        let by_city = search_schools(&store, "milano").await.unwrap();
        assert_eq!(by_city.len(), 1);

        assert!(search_schools(&store, "   ").await.unwrap().is_empty());
        assert!(search_schools(&store, "kjsdkjhsdkjhkslk").await.unwrap().is_empty());
    }

    /// Pre-checks that never see existing rows, as when another request
    /// inserts between the check and the write.
    struct StaleReads(MemoryStore);

    #[async_trait::async_trait]
    impl SchoolStore for StaleReads {
        async fn find_by_admin(&self, _admin_id: Uuid) -> anyhow::Result<Option<School>> {
            Ok(None)
        }
        async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<School>> {
            self.0.find_by_slug(slug).await
        }
        async fn slug_taken(&self, _slug: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn list(&self) -> anyhow::Result<Vec<School>> {
            self.0.list().await
        }
        async fn search(&self, query: &str) -> anyhow::Result<Vec<School>> {
            self.0.search(query).await
        }
        async fn insert(&self, admin_id: Uuid, slug: &str, input: &SchoolInput) -> Result<School, InsertSchoolError> {
            self.0.insert(admin_id, slug, input).await
        }
        async fn update(&self, id: Uuid, input: &SchoolInput) -> anyhow::Result<School> {
            self.0.update(id, input).await
        }
    }

    #[tokio::test]
    async fn racing_second_school_for_admin_is_conflict() {
        let store = StaleReads(MemoryStore::default());
        let admin = Uuid::new_v4();
        create_school(&store, admin, input("Scuola Rodari", "Milano")).await.unwrap();
        let err = create_school(&store, admin, input("Scuola Verdi", "Roma")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "{err:?}");
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
        assert_eq!(list_schools(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn racing_slug_moves_to_next_suffix() {
        let store = StaleReads(MemoryStore::default());
        let a = create_school(&store, Uuid::new_v4(), input("Scuola Rodari", "Milano")).await.unwrap();
        let b = create_school(&store, Uuid::new_v4(), input("Scuola Rodari", "Torino")).await.unwrap();
        let c = create_school(&store, Uuid::new_v4(), input("Scuola Rodari", "Bari")).await.unwrap();
        assert_eq!(a.slug, "scuola-rodari");
        assert_eq!(b.slug, "scuola-rodari-2");
        assert_eq!(c.slug, "scuola-rodari-3");
    }

    #[test]
    fn details_report_todays_slot() {
        let school = School {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            slug: "s".into(),
            name: "S".into(),
            city: "C".into(),
            season_choice: SeasonChoice::Automatic,
            week_bias: 1,
            menu_type: MenuType::Simple,
            created_at: time::OffsetDateTime::UNIX_EPOCH,
        };
        // Wednesday of ISO week 10.
        let details = school_details(school, date!(2024 - 03 - 06));
        assert_eq!(details.current_week, 3);
        assert_eq!(details.current_day, 3);
        assert_eq!(details.current_season, Season::Winter);
    }
}

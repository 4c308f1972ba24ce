use sqlx::{types::Json, SqlitePool};
use uuid::Uuid;

use crate::models::JobVacancy;

use super::form::VacancyFields;

pub async fn own(db_pool: &SqlitePool, company_id: &str) -> Result<Vec<JobVacancy>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM job_vacancies WHERE company_id=? ORDER BY created_at DESC, id DESC")
        .bind(company_id)
        .fetch_all(db_pool)
        .await
}

pub async fn find_own(db_pool: &SqlitePool, company_id: &str, id: &str) -> Result<Option<JobVacancy>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM job_vacancies WHERE id=? AND company_id=?")
        .bind(id)
        .bind(company_id)
        .fetch_optional(db_pool)
        .await
}

pub async fn create(db_pool: &SqlitePool, company_id: &str, fields: &VacancyFields) -> Result<JobVacancy, sqlx::Error> {
    sqlx::query_as(
        r#"INSERT INTO job_vacancies (
            id,company_id,title,description,requirements,responsibilities,salary_range,
            employment_type,experience_level,location,remote_work,skills_required,benefits,
            department,is_active
        ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
        RETURNING *"#,
    )
        .bind(Uuid::now_v7().to_string())
        .bind(company_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.requirements)
        .bind(&fields.responsibilities)
        .bind(&fields.salary_range)
        .bind(&fields.employment_type)
        .bind(&fields.experience_level)
        .bind(&fields.location)
        .bind(fields.remote_work)
        .bind(Json(&fields.skills_required))
        .bind(Json(&fields.benefits))
        .bind(&fields.department)
        .bind(fields.is_active)
        .fetch_one(db_pool)
        .await
}

pub async fn update(
    db_pool: &SqlitePool,
    company_id: &str,
    id: &str,
    fields: &VacancyFields,
) -> Result<Option<JobVacancy>, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE job_vacancies SET
            title=?, description=?, requirements=?, responsibilities=?, salary_range=?,
            employment_type=?, experience_level=?, location=?, remote_work=?,
            skills_required=?, benefits=?, department=?, is_active=?,
            updated_at=strftime('%Y-%m-%dT%H:%M:%fZ','now')
        WHERE id=? AND company_id=?
        RETURNING *"#,
    )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.requirements)
        .bind(&fields.responsibilities)
        .bind(&fields.salary_range)
        .bind(&fields.employment_type)
        .bind(&fields.experience_level)
        .bind(&fields.location)
        .bind(fields.remote_work)
        .bind(Json(&fields.skills_required))
        .bind(Json(&fields.benefits))
        .bind(&fields.department)
        .bind(fields.is_active)
        .bind(id)
        .bind(company_id)
        .fetch_optional(db_pool)
        .await
}

pub async fn toggle(db_pool: &SqlitePool, company_id: &str, id: &str) -> Result<Option<JobVacancy>, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE job_vacancies
        SET is_active = NOT is_active, updated_at=strftime('%Y-%m-%dT%H:%M:%fZ','now')
        WHERE id=? AND company_id=?
        RETURNING *"#,
    )
        .bind(id)
        .bind(company_id)
        .fetch_optional(db_pool)
        .await
}

pub async fn delete(db_pool: &SqlitePool, company_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let done = sqlx::query("DELETE FROM job_vacancies WHERE id=? AND company_id=?")
        .bind(id)
        .bind(company_id)
        .execute(db_pool)
        .await?;
    Ok(done.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn fields(title: &str) -> VacancyFields {
        VacancyFields {
            title: title.to_owned(),
            description: Some("Build things".to_owned()),
            requirements: None,
            responsibilities: None,
            salary_range: None,
            employment_type: Some("full-time".to_owned()),
            experience_level: None,
            location: None,
            remote_work: true,
            skills_required: vec!["rust".to_owned(), "sql".to_owned()],
            benefits: Vec::new(),
            department: None,
            is_active: true,
        }
    }

    async fn companies(db_pool: &SqlitePool) {
        sqlx::query("INSERT INTO companies (id,company_name,email) VALUES ('c1','Acme','a@acme.io'), ('c2','Globex','g@globex.io')")
            .execute(db_pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_round_trips_lists() {
        let db_pool = test_pool().await;
        companies(&db_pool).await;

        let created = create(&db_pool, "c1", &fields("Engineer")).await.unwrap();

        assert_eq!(created.company_id, "c1");
        assert_eq!(created.skills_required, vec!["rust", "sql"]);
        assert!(created.remote_work);
        assert_eq!(own(&db_pool, "c1").await.unwrap().len(), 1);
        assert!(own(&db_pool, "c2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_vacancies_are_out_of_reach() {
        let db_pool = test_pool().await;
        companies(&db_pool).await;
        let created = create(&db_pool, "c1", &fields("Engineer")).await.unwrap();

        assert!(find_own(&db_pool, "c2", &created.id).await.unwrap().is_none());
        assert!(update(&db_pool, "c2", &created.id, &fields("Hijacked")).await.unwrap().is_none());
        assert!(toggle(&db_pool, "c2", &created.id).await.unwrap().is_none());
        assert!(!delete(&db_pool, "c2", &created.id).await.unwrap());

        let still = find_own(&db_pool, "c1", &created.id).await.unwrap().unwrap();
        assert_eq!(still.title, "Engineer");
        assert!(still.is_active);
    }

    #[tokio::test]
    async fn toggle_flips_and_delete_removes() {
        let db_pool = test_pool().await;
        companies(&db_pool).await;
        let created = create(&db_pool, "c1", &fields("Engineer")).await.unwrap();

        let toggled = toggle(&db_pool, "c1", &created.id).await.unwrap().unwrap();
        assert!(!toggled.is_active);

        let updated = update(&db_pool, "c1", &created.id, &fields("Senior Engineer")).await.unwrap().unwrap();
        assert_eq!(updated.title, "Senior Engineer");
        assert!(updated.is_active);

        assert!(delete(&db_pool, "c1", &created.id).await.unwrap());
        assert!(find_own(&db_pool, "c1", &created.id).await.unwrap().is_none());
    }
}

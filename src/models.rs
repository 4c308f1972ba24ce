use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    JobSeeker,
    Company,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::JobSeeker => "job_seeker",
            ActorKind::Company => "company",
        }
    }

    pub fn parse(s: &str) -> Option<ActorKind> {
        match s {
            "job_seeker" => Some(ActorKind::JobSeeker),
            "company" => Some(ActorKind::Company),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobSeeker {
    pub id: String,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    #[sqlx(json)]
    pub preferences: Vec<String>,
    #[sqlx(json)]
    pub skills: Vec<String>,
    pub personality: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Company {
    pub id: String,
    pub company_name: String,
    pub email: String,
    pub description: Option<String>,
    pub culture: Option<String>,
    #[sqlx(json)]
    pub benefits: Vec<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub logo_url: Option<String>,
    pub subscription_status: String,
    pub subscription_end_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Actor {
    JobSeeker(JobSeeker),
    Company(Company),
}

impl Actor {
    pub fn id(&self) -> &str {
        match self {
            Actor::JobSeeker(seeker) => &seeker.id,
            Actor::Company(company) => &company.id,
        }
    }

    pub fn kind(&self) -> ActorKind {
        match self {
            Actor::JobSeeker(_) => ActorKind::JobSeeker,
            Actor::Company(_) => ActorKind::Company,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Actor::JobSeeker(seeker) => &seeker.name,
            Actor::Company(company) => &company.company_name,
        }
    }

    /// Looks the account up as a job seeker first, then as a company.
    pub async fn find(db_pool: &SqlitePool, user_id: &str) -> Result<Option<Actor>, sqlx::Error> {
        let seeker: Option<JobSeeker> = sqlx::query_as("SELECT * FROM job_seekers WHERE id=?")
            .bind(user_id)
            .fetch_optional(db_pool)
            .await?;
        if let Some(seeker) = seeker {
            return Ok(Some(Actor::JobSeeker(seeker)));
        }

        let company: Option<Company> = sqlx::query_as("SELECT * FROM companies WHERE id=?")
            .bind(user_id)
            .fetch_optional(db_pool)
            .await?;
        Ok(company.map(Actor::Company))
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobVacancy {
    pub id: String,
    pub company_id: String,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    pub salary_range: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub location: Option<String>,
    pub remote_work: bool,
    #[sqlx(json)]
    pub skills_required: Vec<String>,
    #[sqlx(json)]
    pub benefits: Vec<String>,
    pub department: Option<String>,
    pub is_active: bool,
    pub applications_count: i64,
    pub views_count: i64,
    pub posted_at: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VacancyWithCompany {
    #[serde(flatten)]
    pub vacancy: JobVacancy,
    pub company: Company,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeType {
    Like,
    Pass,
}

impl SwipeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeType::Like => "like",
            SwipeType::Pass => "pass",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Swipe {
    pub id: String,
    pub swiper_id: String,
    pub swiped_id: String,
    pub vacancy_id: Option<String>,
    pub swipe_type: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Match {
    pub id: String,
    pub job_seeker_id: String,
    pub company_id: String,
    pub vacancy_id: Option<String>,
    pub matched_at: String,
    pub is_active: bool,
}

/// Splits comma separated form input, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Empty form fields are stored as NULL.
pub fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(split_list(" rust, ,sql ,"), vec!["rust".to_owned(), "sql".to_owned()]);
        assert!(split_list("").is_empty());
    }

    #[tokio::test]
    async fn find_prefers_job_seeker_row() {
        let db_pool = crate::db::test_pool().await;
        sqlx::query("INSERT INTO companies (id,company_name,email) VALUES ('u1','Acme','a@acme.io')")
            .execute(&db_pool)
            .await
            .unwrap();

        let actor = Actor::find(&db_pool, "u1").await.unwrap().unwrap();
        assert_eq!(actor.kind(), ActorKind::Company);
        assert_eq!(actor.display_name(), "Acme");

        assert!(Actor::find(&db_pool, "nobody").await.unwrap().is_none());
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::{
    db::StoreError,
    models::{ActorKind, Company, JobSeeker, JobVacancy, VacancyWithCompany},
};

/// Most candidates one deck holds.
pub const DECK_LIMIT: i64 = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Candidate {
    Vacancy(VacancyWithCompany),
    Profile(JobSeeker),
}

/// What a deck remembers about a candidate between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CandidateRef {
    Vacancy { vacancy_id: String, company_id: String },
    Profile { job_seeker_id: String },
}

impl CandidateRef {
    /// The actor on the other side of a swipe on this candidate.
    pub fn counterparty(&self) -> &str {
        match self {
            CandidateRef::Vacancy { company_id, .. } => company_id,
            CandidateRef::Profile { job_seeker_id } => job_seeker_id,
        }
    }

    pub fn vacancy_id(&self) -> Option<&str> {
        match self {
            CandidateRef::Vacancy { vacancy_id, .. } => Some(vacancy_id),
            CandidateRef::Profile { .. } => None,
        }
    }
}

impl Candidate {
    pub fn to_ref(&self) -> CandidateRef {
        match self {
            Candidate::Vacancy(VacancyWithCompany { vacancy, .. }) => CandidateRef::Vacancy {
                vacancy_id: vacancy.id.clone(),
                company_id: vacancy.company_id.clone(),
            },
            Candidate::Profile(seeker) => CandidateRef::Profile { job_seeker_id: seeker.id.clone() },
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Candidate::Vacancy(VacancyWithCompany { vacancy, .. }) => &vacancy.id,
            Candidate::Profile(seeker) => &seeker.id,
        }
    }
}

/// Companies swipe on job seekers, job seekers swipe on vacancies. Anything
/// the actor already liked is left out; passes are shown again.
pub async fn load_candidates(
    db_pool: &SqlitePool,
    actor_id: &str,
    kind: ActorKind,
) -> Result<Vec<Candidate>, StoreError> {
    let candidates = match kind {
        ActorKind::Company => job_seekers_for(db_pool, actor_id).await?,
        ActorKind::JobSeeker => vacancies_for(db_pool, actor_id).await?,
    };

    debug!(%actor_id, kind = kind.as_str(), count = candidates.len(), "candidates loaded");
    Ok(candidates)
}

async fn job_seekers_for(db_pool: &SqlitePool, company_id: &str) -> Result<Vec<Candidate>, StoreError> {
    let seekers: Vec<JobSeeker> = sqlx::query_as(
        r#"SELECT * FROM job_seekers
        WHERE id != ?
          AND id NOT IN (SELECT swiped_id FROM swipes WHERE swiper_id = ? AND swipe_type = 'like')
        ORDER BY created_at, id
        LIMIT ?"#,
    )
        .bind(company_id)
        .bind(company_id)
        .bind(DECK_LIMIT)
        .fetch_all(db_pool)
        .await?;

    Ok(seekers.into_iter().map(Candidate::Profile).collect())
}

async fn vacancies_for(db_pool: &SqlitePool, seeker_id: &str) -> Result<Vec<Candidate>, StoreError> {
    let filtered = sqlx::query_as::<_, JobVacancy>(
        r#"SELECT * FROM job_vacancies
        WHERE is_active = TRUE
          AND company_id != ?
          AND id NOT IN (
            SELECT vacancy_id FROM swipes
            WHERE swiper_id = ? AND swipe_type = 'like' AND vacancy_id IS NOT NULL
          )
        ORDER BY created_at, id
        LIMIT ?"#,
    )
        .bind(seeker_id)
        .bind(seeker_id)
        .bind(DECK_LIMIT)
        .fetch_all(db_pool)
        .await
        .map_err(StoreError::from);

    let vacancies = match filtered {
        Ok(vacancies) => vacancies,
        Err(err) if err.is_missing_column("vacancy_id") => {
            warn!("swipes has no vacancy_id column, liked vacancies are not filtered");
            sqlx::query_as(
                "SELECT * FROM job_vacancies WHERE is_active = TRUE AND company_id != ? ORDER BY created_at, id LIMIT ?",
            )
                .bind(seeker_id)
                .bind(DECK_LIMIT)
                .fetch_all(db_pool)
                .await?
        }
        Err(err) => return Err(err),
    };

    let mut companies: HashMap<String, Option<Company>> = HashMap::new();
    let mut candidates = Vec::with_capacity(vacancies.len());
    for vacancy in vacancies {
        if !companies.contains_key(&vacancy.company_id) {
            let company: Option<Company> = sqlx::query_as("SELECT * FROM companies WHERE id=?")
                .bind(&vacancy.company_id)
                .fetch_optional(db_pool)
                .await?;
            companies.insert(vacancy.company_id.clone(), company);
        }

        let Some(Some(company)) = companies.get(&vacancy.company_id) else {
            warn!(vacancy_id = %vacancy.id, "vacancy without company skipped");
            continue;
        };
        candidates.push(Candidate::Vacancy(VacancyWithCompany { company: company.clone(), vacancy }));
    }

    Ok(candidates)
}

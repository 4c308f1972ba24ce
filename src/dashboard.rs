use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    auth::CurrentActor,
    models::{Actor, Company, JobSeeker, JobVacancy, Match},
    AppResult, AppState,
};

#[derive(Debug, Serialize)]
pub struct MatchView {
    #[serde(flatten)]
    pub matched: Match,
    /// The company for a job seeker, the job seeker for a company.
    pub counterpart: Option<Actor>,
    pub vacancy: Option<JobVacancy>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub actor: Actor,
    pub matches: Vec<MatchView>,
}

pub async fn matches_of(db_pool: &SqlitePool, actor: &Actor) -> Result<Vec<MatchView>, sqlx::Error> {
    let column = match actor {
        Actor::JobSeeker(_) => "job_seeker_id",
        Actor::Company(_) => "company_id",
    };
    let rows: Vec<Match> = sqlx::query_as(&format!(
        "SELECT * FROM matches WHERE {column}=? AND is_active = TRUE ORDER BY matched_at DESC, id DESC"
    ))
        .bind(actor.id())
        .fetch_all(db_pool)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for matched in rows {
        let counterpart = match actor {
            Actor::JobSeeker(_) => sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id=?")
                .bind(&matched.company_id)
                .fetch_optional(db_pool)
                .await?
                .map(Actor::Company),
            Actor::Company(_) => sqlx::query_as::<_, JobSeeker>("SELECT * FROM job_seekers WHERE id=?")
                .bind(&matched.job_seeker_id)
                .fetch_optional(db_pool)
                .await?
                .map(Actor::JobSeeker),
        };

        let vacancy = match &matched.vacancy_id {
            Some(vacancy_id) => sqlx::query_as("SELECT * FROM job_vacancies WHERE id=?")
                .bind(vacancy_id)
                .fetch_optional(db_pool)
                .await?,
            None => None,
        };

        views.push(MatchView { matched, counterpart, vacancy });
    }

    Ok(views)
}

#[debug_handler(state = AppState)]
pub async fn dashboard(
    State(db_pool): State<SqlitePool>,
    CurrentActor { actor, .. }: CurrentActor,
) -> AppResult<Json<Dashboard>> {
    let matches = matches_of(&db_pool, &actor).await?;
    Ok(Json(Dashboard { actor, matches }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::provision_actor, db::test_pool, models::ActorKind};

    #[tokio::test]
    async fn each_side_sees_the_other() {
        let db_pool = test_pool().await;
        provision_actor(&db_pool, ActorKind::JobSeeker, "s1", Some("ada@example.com"), Some("Ada")).await.unwrap();
        provision_actor(&db_pool, ActorKind::Company, "c1", Some("hr@acme.io"), Some("Acme")).await.unwrap();
        sqlx::query("INSERT INTO matches (id,job_seeker_id,company_id,matched_at) VALUES ('m1','s1','c1','2024-01-01T00:00:00.000Z')")
            .execute(&db_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO matches (id,job_seeker_id,company_id,is_active) VALUES ('m2','s1','c9',FALSE)")
            .execute(&db_pool)
            .await
            .unwrap();

        let seeker = Actor::find(&db_pool, "s1").await.unwrap().unwrap();
        let seen = matches_of(&db_pool, &seeker).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].counterpart.as_ref().map(Actor::display_name), Some("Acme"));

        let company = Actor::find(&db_pool, "c1").await.unwrap().unwrap();
        let seen = matches_of(&db_pool, &company).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].counterpart.as_ref().map(Actor::display_name), Some("Ada"));
        assert!(seen[0].vacancy.is_none());
    }
}

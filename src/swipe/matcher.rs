use sqlx::SqlitePool;

use crate::db::StoreError;

use super::candidates::CandidateRef;

/// True when the counterparty of `target` has already liked `actor_id` back.
pub async fn is_mutual(db_pool: &SqlitePool, actor_id: &str, target: &CandidateRef) -> Result<bool, StoreError> {
    let back: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM swipes WHERE swiper_id=? AND swiped_id=? AND swipe_type='like' LIMIT 1",
    )
        .bind(target.counterparty())
        .bind(actor_id)
        .fetch_optional(db_pool)
        .await?;

    Ok(back.is_some())
}

/// Active match rows the actor is part of, on either side.
pub async fn match_count(db_pool: &SqlitePool, actor_id: &str) -> Result<i64, StoreError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM matches WHERE is_active = TRUE AND (job_seeker_id=? OR company_id=?)")
            .bind(actor_id)
            .bind(actor_id)
            .fetch_one(db_pool)
            .await?
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_pool,
        models::SwipeType,
        swipe::recorder::record_swipe,
    };

    #[tokio::test]
    async fn match_needs_both_likes() {
        let db_pool = test_pool().await;
        let seeker = CandidateRef::Profile { job_seeker_id: "s1".to_owned() };
        let vacancy = CandidateRef::Vacancy { vacancy_id: "v1".to_owned(), company_id: "c1".to_owned() };

        record_swipe(&db_pool, "c1", &seeker, SwipeType::Like).await.unwrap();
        assert!(!is_mutual(&db_pool, "c1", &seeker).await.unwrap());

        record_swipe(&db_pool, "s1", &vacancy, SwipeType::Like).await.unwrap();
        assert!(is_mutual(&db_pool, "s1", &vacancy).await.unwrap());
        assert!(is_mutual(&db_pool, "c1", &seeker).await.unwrap());
    }

    #[tokio::test]
    async fn a_pass_back_is_no_match() {
        let db_pool = test_pool().await;
        let seeker = CandidateRef::Profile { job_seeker_id: "s1".to_owned() };
        let vacancy = CandidateRef::Vacancy { vacancy_id: "v1".to_owned(), company_id: "c1".to_owned() };

        record_swipe(&db_pool, "c1", &seeker, SwipeType::Pass).await.unwrap();
        record_swipe(&db_pool, "s1", &vacancy, SwipeType::Like).await.unwrap();

        assert!(!is_mutual(&db_pool, "s1", &vacancy).await.unwrap());
    }

    #[tokio::test]
    async fn counts_active_matches_on_either_side() {
        let db_pool = test_pool().await;
        for (id, seeker, company, active) in [("m1", "s1", "c1", true), ("m2", "s2", "c1", true), ("m3", "s1", "c2", false)] {
            sqlx::query("INSERT INTO matches (id,job_seeker_id,company_id,is_active) VALUES (?,?,?,?)")
                .bind(id)
                .bind(seeker)
                .bind(company)
                .bind(active)
                .execute(&db_pool)
                .await
                .unwrap();
        }

        assert_eq!(match_count(&db_pool, "c1").await.unwrap(), 2);
        assert_eq!(match_count(&db_pool, "s1").await.unwrap(), 1);
        assert_eq!(match_count(&db_pool, "c2").await.unwrap(), 0);
    }
}

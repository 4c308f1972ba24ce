use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{db::StoreError, models::SwipeType};

use super::candidates::CandidateRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeOutcome {
    Recorded,
    /// The same like was already stored; treated as success.
    AlreadyRecorded,
}

/// Inserts the swipe without looking first. A unique violation means an
/// earlier attempt won, and a store without `vacancy_id` gets the narrower
/// row instead.
pub async fn record_swipe(
    db_pool: &SqlitePool,
    swiper_id: &str,
    target: &CandidateRef,
    swipe_type: SwipeType,
) -> Result<SwipeOutcome, StoreError> {
    let swiped_id = target.counterparty();

    let full = sqlx::query("INSERT INTO swipes (id,swiper_id,swiped_id,vacancy_id,swipe_type) VALUES (?,?,?,?,?)")
        .bind(Uuid::now_v7().to_string())
        .bind(swiper_id)
        .bind(swiped_id)
        .bind(target.vacancy_id())
        .bind(swipe_type.as_str())
        .execute(db_pool)
        .await
        .map_err(StoreError::from);

    let outcome = match full {
        Ok(_) => Ok(SwipeOutcome::Recorded),
        Err(err) if err.is_missing_column("vacancy_id") => {
            warn!(%swiper_id, "swipes has no vacancy_id column, recording without it");
            sqlx::query("INSERT INTO swipes (id,swiper_id,swiped_id,swipe_type) VALUES (?,?,?,?)")
                .bind(Uuid::now_v7().to_string())
                .bind(swiper_id)
                .bind(swiped_id)
                .bind(swipe_type.as_str())
                .execute(db_pool)
                .await
                .map(|_| SwipeOutcome::Recorded)
                .map_err(StoreError::from)
        }
        Err(err) => Err(err),
    };

    match outcome {
        Err(StoreError::Duplicate(message)) => {
            debug!(%swiper_id, %swiped_id, %message, "swipe already recorded");
            Ok(SwipeOutcome::AlreadyRecorded)
        }
        other => other,
    }
}

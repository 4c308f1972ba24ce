use serde::{Deserialize, Serialize};
use tower_sessions::{session, Session};

use crate::models::ActorKind;

/// Saved positions older than this are ignored.
pub const FRESHNESS_MS: i64 = 60 * 60 * 1000;

/// Where an actor stopped in their deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCursor {
    pub current_index: usize,
    /// Unix milliseconds of the save.
    pub timestamp: i64,
}

impl SavedCursor {
    /// Index to resume at for a deck of `len`, or 0.
    pub fn restore(&self, now_ms: i64, len: usize) -> usize {
        let fresh = now_ms - self.timestamp < FRESHNESS_MS;
        if fresh && self.current_index > 0 && self.current_index < len {
            self.current_index
        } else {
            0
        }
    }
}

pub fn cursor_key(actor_id: &str, kind: ActorKind) -> String {
    format!("swipe_session_{actor_id}_{}", kind.as_str())
}

pub async fn load(
    session: &Session,
    actor_id: &str,
    kind: ActorKind,
    len: usize,
    now_ms: i64,
) -> Result<usize, session::Error> {
    let saved = session.get::<SavedCursor>(&cursor_key(actor_id, kind)).await?;
    Ok(saved.map_or(0, |cursor| cursor.restore(now_ms, len)))
}

/// Moves one past `current` and persists it; reaching the end forgets the cursor.
pub async fn advance(
    session: &Session,
    actor_id: &str,
    kind: ActorKind,
    current: usize,
    len: usize,
    now_ms: i64,
) -> Result<usize, session::Error> {
    let next = current + 1;
    if next >= len {
        clear(session, actor_id, kind).await?;
    } else {
        session.insert(&cursor_key(actor_id, kind), SavedCursor { current_index: next, timestamp: now_ms }).await?;
    }
    Ok(next)
}

pub async fn clear(session: &Session, actor_id: &str, kind: ActorKind) -> Result<(), session::Error> {
    session.remove_value(&cursor_key(actor_id, kind)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_session;

    #[test]
    fn stale_or_out_of_range_restores_to_start() {
        let now = 10 * FRESHNESS_MS;
        let cursor = |current_index, age| SavedCursor { current_index, timestamp: now - age };

        assert_eq!(cursor(3, 1_000).restore(now, 10), 3);
        assert_eq!(cursor(3, FRESHNESS_MS + 1).restore(now, 10), 0);
        assert_eq!(cursor(0, 1_000).restore(now, 10), 0);
        assert_eq!(cursor(10, 1_000).restore(now, 10), 0);
        assert_eq!(cursor(3, 1_000).restore(now, 2), 0);
    }

    #[tokio::test]
    async fn advance_saves_then_forgets_at_end() {
        let session = test_session();
        let now = 1_700_000_000_000;

        assert_eq!(advance(&session, "u1", ActorKind::Company, 0, 3, now).await.unwrap(), 1);
        assert_eq!(load(&session, "u1", ActorKind::Company, 3, now).await.unwrap(), 1);

        let stored = session.get::<SavedCursor>("swipe_session_u1_company").await.unwrap();
        assert_eq!(stored, Some(SavedCursor { current_index: 1, timestamp: now }));

        assert_eq!(advance(&session, "u1", ActorKind::Company, 2, 3, now).await.unwrap(), 3);
        assert_eq!(session.get::<SavedCursor>("swipe_session_u1_company").await.unwrap(), None);
    }

    #[tokio::test]
    async fn cursor_is_kept_per_actor_kind() {
        let session = test_session();
        let now = 1_700_000_000_000;

        advance(&session, "u1", ActorKind::JobSeeker, 1, 5, now).await.unwrap();

        assert_eq!(load(&session, "u1", ActorKind::JobSeeker, 5, now).await.unwrap(), 2);
        assert_eq!(load(&session, "u1", ActorKind::Company, 5, now).await.unwrap(), 0);
        assert_eq!(load(&session, "u1", ActorKind::JobSeeker, 5, now + FRESHNESS_MS).await.unwrap(), 0);
    }
}

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

/// Keys with an operation outstanding. A second attempt on a busy key is
/// dropped, never queued.
#[derive(Clone, Default)]
pub struct InFlight(Arc<Mutex<HashSet<String>>>);

pub struct Ticket {
    set: InFlight,
    key: String,
}

impl InFlight {
    pub fn try_begin(&self, key: impl Into<String>) -> Option<Ticket> {
        let key = key.into();
        let mut busy = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !busy.insert(key.clone()) {
            return None;
        }

        Some(Ticket { set: self.clone(), key })
    }
}

/// Answer for an attempt that was dropped because another one is running.
pub fn dropped() -> Response {
    (StatusCode::CONFLICT, Json(json!({ "dropped": true }))).into_response()
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.set.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_attempt_is_dropped_until_ticket_released() {
        let in_flight = InFlight::default();

        let ticket = in_flight.try_begin("swipe:u1").unwrap();
        assert!(in_flight.try_begin("swipe:u1").is_none());
        assert!(in_flight.try_begin("swipe:u2").is_some());

        drop(ticket);
        let again = in_flight.try_begin("swipe:u1");
        assert!(again.is_some());
        assert!(in_flight.try_begin("swipe:u1").is_none());
    }
}

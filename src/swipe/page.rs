use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::{debug, error, info};

use crate::{
    auth::CurrentActor,
    inflight,
    load_within,
    models::{Actor, ActorKind, SwipeType},
    session::now_millis,
    AppResult, AppState, Notice,
};

use super::{
    candidates::{load_candidates, Candidate, CandidateRef},
    cursor, gesture,
    matcher::{is_mutual, match_count},
    recorder::{record_swipe, SwipeOutcome},
};

/// The deck as the session holds it between requests.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Deck {
    pub items: Vec<CandidateRef>,
    pub position: usize,
    pub matches: i64,
}

fn deck_key(actor_id: &str, kind: ActorKind) -> String {
    format!("swipe_deck_{actor_id}_{}", kind.as_str())
}

#[derive(Debug, Serialize)]
pub struct DeckView {
    pub actor_type: ActorKind,
    pub candidates: Vec<Candidate>,
    pub current_index: usize,
    pub total: usize,
    pub has_more: bool,
    pub match_count: i64,
    pub timed_out: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug, Serialize)]
pub struct SwipeResult {
    pub outcome: Option<SwipeOutcome>,
    pub matched: bool,
    pub current_index: usize,
    pub has_more: bool,
    pub match_count: i64,
    pub notice: Option<Notice>,
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub decision: Option<SwipeType>,
    pub drag_offset: Option<f64>,
}

impl SwipeRequest {
    fn decision(&self) -> Option<SwipeType> {
        self.decision.or_else(|| self.drag_offset.and_then(gesture::release))
    }
}

async fn fresh_deck(state: &AppState, actor: &Actor, session: &Session, resume: bool) -> AppResult<DeckView> {
    let (actor_id, kind) = (actor.id(), actor.kind());

    let loaded = load_within(
        state.config.load_timeout,
        "swipe deck",
        load_candidates(&state.db_pool, actor_id, kind),
    ).await?;
    let timed_out = loaded.is_none();
    let candidates = loaded.unwrap_or_default();

    let position = if resume {
        cursor::load(session, actor_id, kind, candidates.len(), now_millis()).await?
    } else {
        cursor::clear(session, actor_id, kind).await?;
        0
    };
    let matches = match_count(&state.db_pool, actor_id).await?;

    let deck = Deck {
        items: candidates.iter().map(Candidate::to_ref).collect(),
        position,
        matches,
    };
    session.insert(&deck_key(actor_id, kind), &deck).await?;

    let notice = (candidates.is_empty() && kind == ActorKind::JobSeeker && !timed_out)
        .then(|| Notice::error("No job vacancies available. Companies need to post jobs first."));

    Ok(DeckView {
        actor_type: kind,
        current_index: position,
        total: candidates.len(),
        has_more: position < candidates.len(),
        match_count: matches,
        timed_out,
        notice,
        candidates,
    })
}

#[debug_handler(state = AppState)]
pub(crate) async fn deck(
    State(state): State<AppState>,
    CurrentActor { actor, session }: CurrentActor,
) -> AppResult<Json<DeckView>> {
    Ok(Json(fresh_deck(&state, &actor, &session, true).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn reset(
    State(state): State<AppState>,
    CurrentActor { actor, session }: CurrentActor,
) -> AppResult<Json<DeckView>> {
    let mut view = fresh_deck(&state, &actor, &session, false).await?;

    let what = match actor.kind() {
        ActorKind::JobSeeker => "vacancies",
        ActorKind::Company => "profiles",
    };
    if view.notice.is_none() && !view.timed_out {
        view.notice = Some(Notice::success(format!("Refreshed! Showing all available {what} (excluding your likes)")));
    }

    Ok(Json(view))
}

#[debug_handler(state = AppState)]
pub(crate) async fn swipe(
    State(state): State<AppState>,
    CurrentActor { actor, session }: CurrentActor,

    Json(request): Json<SwipeRequest>,
) -> AppResult<Response> {
    let Some(decision) = request.decision() else {
        return Ok((StatusCode::BAD_REQUEST, Json(json!({ "error": "no_decision" }))).into_response());
    };

    let (actor_id, kind) = (actor.id(), actor.kind());
    let Some(_ticket) = state.in_flight.try_begin(format!("swipe:{actor_id}")) else {
        debug!(%actor_id, "swipe already in flight, dropped");
        return Ok(inflight::dropped());
    };

    let key = deck_key(actor_id, kind);
    let mut deck = session.get::<Deck>(&key).await?.unwrap_or_default();
    let Some(target) = deck.items.get(deck.position).cloned() else {
        return Ok(Json(SwipeResult {
            outcome: None,
            matched: false,
            current_index: deck.position,
            has_more: false,
            match_count: deck.matches,
            notice: None,
        }).into_response());
    };

    let outcome = match record_swipe(&state.db_pool, actor_id, &target, decision).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(%actor_id, target = %target.counterparty(), error = %err, "failed to record swipe");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SwipeResult {
                    outcome: None,
                    matched: false,
                    current_index: deck.position,
                    has_more: true,
                    match_count: deck.matches,
                    notice: Some(Notice::error("Failed to record swipe")),
                }),
            ).into_response());
        }
    };

    let mut matched = false;
    if outcome == SwipeOutcome::Recorded && decision == SwipeType::Like {
        match is_mutual(&state.db_pool, actor_id, &target).await {
            Ok(mutual) => matched = mutual,
            Err(err) => error!(%actor_id, error = %err, "match check failed"),
        }
    }
    if matched {
        deck.matches += 1;
        info!(%actor_id, name = actor.display_name(), partner = %target.counterparty(), "it's a match");
    }

    deck.position = cursor::advance(&session, actor_id, kind, deck.position, deck.items.len(), now_millis()).await?;
    session.insert(&key, &deck).await?;

    Ok(Json(SwipeResult {
        outcome: Some(outcome),
        matched,
        current_index: deck.position,
        has_more: deck.position < deck.items.len(),
        match_count: deck.matches,
        notice: matched.then(|| Notice::success("It's a match!")),
    }).into_response())
}

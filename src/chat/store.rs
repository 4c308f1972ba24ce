use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::res::render_markdown;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub created_at: String,
    pub is_read: bool,
}

/// A message as sent to the browser, body rendered.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub message_html: String,
}

impl From<ChatMessage> for MessageView {
    fn from(message: ChatMessage) -> Self {
        let message_html = render_markdown(&message.message);
        MessageView { message, message_html }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub partner_id: String,
    pub partner_name: String,
    pub last_message_text: Option<String>,
    pub last_message_time: Option<String>,
    pub unread_count: i64,
}

/// Stores a message and hands it to every live subscriber.
pub async fn send(
    db_pool: &SqlitePool,
    tx: &broadcast::Sender<ChatMessage>,
    sender_id: &str,
    receiver_id: &str,
    text: &str,
) -> Result<ChatMessage, sqlx::Error> {
    let message: ChatMessage = sqlx::query_as(
        "INSERT INTO messages (id,sender_id,receiver_id,message) VALUES (?,?,?,?) RETURNING *",
    )
        .bind(Uuid::now_v7().to_string())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(text)
        .fetch_one(db_pool)
        .await?;

    let _ = tx.send(message.clone());
    Ok(message)
}

/// Both directions of one conversation, oldest first.
pub async fn between(db_pool: &SqlitePool, me: &str, partner: &str) -> Result<Vec<ChatMessage>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT * FROM messages
        WHERE (sender_id=? AND receiver_id=?) OR (sender_id=? AND receiver_id=?)
        ORDER BY created_at, id"#,
    )
        .bind(me)
        .bind(partner)
        .bind(partner)
        .bind(me)
        .fetch_all(db_pool)
        .await
}

pub async fn mark_read(db_pool: &SqlitePool, me: &str, partner: &str) -> Result<u64, sqlx::Error> {
    let done = sqlx::query("UPDATE messages SET is_read = TRUE WHERE sender_id=? AND receiver_id=? AND is_read = FALSE")
        .bind(partner)
        .bind(me)
        .execute(db_pool)
        .await?;

    debug!(%me, %partner, read = done.rows_affected(), "messages marked read");
    Ok(done.rows_affected())
}

pub async fn partner_name(db_pool: &SqlitePool, id: &str) -> Result<String, sqlx::Error> {
    let seeker: Option<String> = sqlx::query_scalar("SELECT name FROM job_seekers WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    if let Some(name) = seeker {
        return Ok(name);
    }

    let company: Option<String> = sqlx::query_scalar("SELECT company_name FROM companies WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(company.unwrap_or_else(|| "Unknown User".to_owned()))
}

/// Everyone `me` has talked to or matched with. Partners with messages come
/// first, newest activity first; matched partners without messages follow.
pub async fn conversations(db_pool: &SqlitePool, me: &str) -> Result<Vec<Conversation>, sqlx::Error> {
    let messages: Vec<ChatMessage> = sqlx::query_as(
        "SELECT * FROM messages WHERE sender_id=? OR receiver_id=? ORDER BY created_at DESC, id DESC",
    )
        .bind(me)
        .bind(me)
        .fetch_all(db_pool)
        .await?;

    let mut order: Vec<String> = Vec::new();
    let mut summaries: HashMap<String, Conversation> = HashMap::new();
    for message in messages {
        let incoming = message.receiver_id == me;
        let partner = if incoming { message.sender_id } else { message.receiver_id };

        let summary = summaries.entry(partner.clone()).or_insert_with(|| {
            order.push(partner.clone());
            Conversation {
                partner_id: partner.clone(),
                partner_name: String::new(),
                last_message_text: Some(message.message),
                last_message_time: Some(message.created_at),
                unread_count: 0,
            }
        });
        if incoming && !message.is_read {
            summary.unread_count += 1;
        }
    }

    let matched: Vec<(String, String)> = sqlx::query_as(
        r#"SELECT job_seeker_id, company_id FROM matches
        WHERE is_active = TRUE AND (job_seeker_id=? OR company_id=?)
        ORDER BY matched_at DESC"#,
    )
        .bind(me)
        .bind(me)
        .fetch_all(db_pool)
        .await?;

    for (seeker, company) in matched {
        let partner = if seeker == me { company } else { seeker };
        if summaries.contains_key(&partner) {
            continue;
        }
        order.push(partner.clone());
        summaries.insert(partner.clone(), Conversation {
            partner_id: partner,
            partner_name: String::new(),
            last_message_text: None,
            last_message_time: None,
            unread_count: 0,
        });
    }

    let mut out = Vec::with_capacity(order.len());
    for partner in order {
        if let Some(mut summary) = summaries.remove(&partner) {
            summary.partner_name = partner_name(db_pool, &partner).await?;
            out.push(summary);
        }
    }
    Ok(out)
}

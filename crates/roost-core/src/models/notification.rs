use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::profile::ActorProfile;

/// Closed set of notification kinds the platform emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    NewPost,
    Message,
}

/// What a notification points at.
///
/// The backend stores the subject in two physical columns (a uuid-typed
/// `conversation_id` and an integer `post_id`, a retrofit of an earlier
/// single-column design). The union is derived once here, at the parse
/// boundary; the dual columns never escape it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectRef {
    Conversation(Uuid),
    Post(i64),
    None,
}

/// Raw notification row as the backend serializes it.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRow {
    pub id: String,
    pub actor_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub conversation_id: Option<String>,
    pub post_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial row delivered by an `update` push. Only carries the fields
/// that may change; the client never fabricates an entry from one.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPatch {
    pub id: String,
    pub is_read: Option<bool>,
    pub title: Option<String>,
    pub body: Option<String>,
}

/// A notification as the rest of the application sees it.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub id: String,
    pub actor_id: Option<String>,
    pub kind: NotificationKind,
    pub subject: SubjectRef,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    /// Seconds since UNIX epoch; the ordering key. Immutable.
    pub created_at: u64,
    /// Actor display data attached by enrichment, when `actor_id` is set.
    pub actor: Option<ActorProfile>,
}

impl NotificationRow {
    /// Parse a raw JSON value into a row.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value).map_err(|e| CoreError::MalformedPayload(e.to_string()))
    }

    /// Resolve the dual-column subject into the tagged union. The kind
    /// decides which column is authoritative; a row whose kind demands a
    /// column it does not carry is malformed.
    fn subject(&self) -> Result<SubjectRef, CoreError> {
        match self.kind {
            NotificationKind::Follow => Ok(SubjectRef::None),
            NotificationKind::NewPost => match self.post_id {
                Some(id) => Ok(SubjectRef::Post(id)),
                None => Err(CoreError::MalformedPayload(format!(
                    "new_post notification {} has no post_id",
                    self.id
                ))),
            },
            NotificationKind::Message => match &self.conversation_id {
                Some(raw) => Uuid::parse_str(raw).map(SubjectRef::Conversation).map_err(|_| {
                    CoreError::MalformedPayload(format!(
                        "notification {} has non-uuid conversation_id {:?}",
                        self.id, raw
                    ))
                }),
                None => Err(CoreError::MalformedPayload(format!(
                    "message notification {} has no conversation_id",
                    self.id
                ))),
            },
        }
    }

    pub fn into_event(self) -> Result<NotificationEvent, CoreError> {
        let subject = self.subject()?;
        Ok(NotificationEvent {
            subject,
            id: self.id,
            actor_id: self.actor_id,
            kind: self.kind,
            title: self.title,
            body: self.body,
            is_read: self.is_read,
            created_at: self.created_at.timestamp().max(0) as u64,
            actor: None,
        })
    }
}

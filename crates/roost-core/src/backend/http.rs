use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::backend::BackendClient;
use crate::config::CoreConfig;
use crate::constants::resources;
use crate::error::CoreError;
use crate::models::{ActorProfile, NotificationRow, PresenceRow, ProfileRow};

/// `BackendClient` over the hosted backend's REST surface.
///
/// All requests carry the anon key plus a bearer token and share one
/// client-level timeout, so a hung call fails through the same path as
/// an explicit error response.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    bearer: String,
}

#[derive(Deserialize)]
struct FolloweeRow {
    followee_id: String,
}

#[derive(Deserialize)]
struct BlockedRow {
    blocked_id: String,
}

#[derive(Deserialize)]
struct ConversationRow {
    participant_a: String,
    participant_b: String,
}

impl HttpBackend {
    pub fn new(config: &CoreConfig, access_token: Option<String>) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            bearer: access_token.unwrap_or_else(|| config.anon_key.clone()),
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }

    fn map_err(err: reqwest::Error) -> CoreError {
        if err.is_timeout() {
            CoreError::Timeout
        } else {
            CoreError::Transport(err)
        }
    }

    async fn check(response: Response) -> Result<Response, CoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(CoreError::Denied(body))
        } else {
            Err(CoreError::Backend(format!("{status}: {body}")))
        }
    }

    async fn get_rows<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, CoreError> {
        let response = self
            .client
            .get(self.url(resource))
            .query(query)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.bearer)
            .send()
            .await
            .map_err(Self::map_err)?;
        Self::check(response)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(Self::map_err)
    }

    async fn write(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(), CoreError> {
        let response = request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.bearer)
            .send()
            .await
            .map_err(Self::map_err)?;
        Self::check(response).await.map(|_| ())
    }

    /// PostgREST `in.(a,b,c)` filter value.
    fn in_filter(ids: &[String]) -> String {
        format!("in.({})", ids.join(","))
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn recent_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRow>, CoreError> {
        self.get_rows(
            resources::NOTIFICATIONS,
            &[
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn actor_profile(&self, user_id: &str) -> Result<Option<ActorProfile>, CoreError> {
        let rows: Vec<ProfileRow> = self
            .get_rows(
                resources::PROFILES,
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(ActorProfile::from))
    }

    async fn set_notification_read(&self, id: &str, is_read: bool) -> Result<(), CoreError> {
        let request = self
            .client
            .patch(self.url(resources::NOTIFICATIONS))
            .query(&[("id", format!("eq.{id}"))])
            .json(&json!({ "is_read": is_read }));
        self.write(request).await
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), CoreError> {
        let request = self
            .client
            .patch(self.url(resources::NOTIFICATIONS))
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("is_read", "eq.false".to_string()),
            ])
            .json(&json!({ "is_read": true }));
        self.write(request).await
    }

    async fn followee_ids(&self, user_id: &str) -> Result<Vec<String>, CoreError> {
        let rows: Vec<FolloweeRow> = self
            .get_rows(
                resources::FOLLOWS,
                &[
                    ("follower_id", format!("eq.{user_id}")),
                    ("select", "followee_id".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.followee_id).collect())
    }

    async fn recent_conversation_partner_ids(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, CoreError> {
        let rows: Vec<ConversationRow> = self
            .get_rows(
                resources::CONVERSATIONS,
                &[
                    (
                        "or",
                        format!("(participant_a.eq.{user_id},participant_b.eq.{user_id})"),
                    ),
                    ("order", "updated_at.desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let mut partners = Vec::new();
        for row in rows {
            let partner = if row.participant_a == user_id {
                row.participant_b
            } else {
                row.participant_a
            };
            if partner != user_id && !partners.contains(&partner) {
                partners.push(partner);
            }
        }
        Ok(partners)
    }

    async fn blocked_ids(&self, user_id: &str) -> Result<Vec<String>, CoreError> {
        let rows: Vec<BlockedRow> = self
            .get_rows(
                resources::BLOCKS,
                &[
                    ("blocker_id", format!("eq.{user_id}")),
                    ("select", "blocked_id".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.blocked_id).collect())
    }

    async fn presence_records(&self, user_ids: &[String]) -> Result<Vec<PresenceRow>, CoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_rows(
            resources::PRESENCE,
            &[("user_id", Self::in_filter(user_ids))],
        )
        .await
    }

    async fn profiles(&self, user_ids: &[String]) -> Result<Vec<ProfileRow>, CoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_rows(
            resources::PROFILES,
            &[("user_id", Self::in_filter(user_ids))],
        )
        .await
    }

    async fn insert_block(&self, blocker_id: &str, blocked_id: &str) -> Result<(), CoreError> {
        let request = self.client.post(self.url(resources::BLOCKS)).json(&json!({
            "blocker_id": blocker_id,
            "blocked_id": blocked_id,
        }));
        self.write(request).await
    }

    async fn delete_follow(&self, follower_id: &str, followee_id: &str) -> Result<(), CoreError> {
        let request = self
            .client
            .delete(self.url(resources::FOLLOWS))
            .query(&[
                ("follower_id", format!("eq.{follower_id}")),
                ("followee_id", format!("eq.{followee_id}")),
            ]);
        self.write(request).await
    }
}

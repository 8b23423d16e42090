//! Join notifications to the automation webhook

use chrono::{DateTime, Utc};
use recruitctl_core::config::WebhookConfig;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::directory::InvitedAthlete;
use crate::error::{BotError, Result};
use crate::invites::{JoinMatch, MatchKind};

pub const EVENT_MEMBER_JOINED: &str = "member_joined";
pub const EVENT_MEMBER_JOINED_UNMATCHED: &str = "member_joined_unmatched";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEvent {
    pub event: &'static str,
    pub user_id: String,
    pub username: String,
    pub invite_code: Option<String>,
    pub athlete_id: Option<Uuid>,
    pub athlete_name: Option<String>,
    pub athlete_email: Option<String>,
    pub guild_id: String,
    pub joined_at: DateTime<Utc>,
    #[serde(rename = "match")]
    pub match_kind: MatchKind,
}

impl JoinEvent {
    pub fn new(guild_id: &str, join: &JoinMatch, athlete: Option<&InvitedAthlete>) -> Self {
        Self {
            event: if athlete.is_some() {
                EVENT_MEMBER_JOINED
            } else {
                EVENT_MEMBER_JOINED_UNMATCHED
            },
            user_id: join.member.user.id.clone(),
            username: join.member.user.username.clone(),
            invite_code: join.invite_code.clone(),
            athlete_id: athlete.map(|a| a.id),
            athlete_name: athlete.map(|a| a.full_name.clone()),
            athlete_email: athlete.and_then(|a| a.email.clone()),
            guild_id: guild_id.to_string(),
            joined_at: join.member.joined_at,
            match_kind: join.kind,
        }
    }
}

pub struct WebhookNotifier {
    client: Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Self {
        if url.is_none() {
            tracing::warn!("no automation webhook configured, join events will only be logged");
        }
        Self {
            client: Client::new(),
            url,
        }
    }

    pub fn from_config(config: &WebhookConfig) -> Self {
        Self::new(config.target_url().map(str::to_string))
    }

    /// POST one event. Single attempt; callers log failures.
    pub async fn notify(&self, event: &JoinEvent) -> Result<()> {
        let Some(url) = &self.url else {
            tracing::info!(event = event.event, user_id = %event.user_id, "join event (no webhook)");
            return Ok(());
        };

        let response = self.client.post(url).json(event).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Webhook {
                status: status.as_u16(),
            });
        }
        tracing::debug!(event = event.event, user_id = %event.user_id, "webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::{DiscordUser, GuildMember};
    use chrono::TimeZone;
    use serde_json::json;

    fn join(code: Option<&str>, kind: MatchKind) -> JoinMatch {
        JoinMatch {
            member: GuildMember {
                user: DiscordUser {
                    id: "42".into(),
                    username: "sprinter".into(),
                    global_name: None,
                },
                joined_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            },
            invite_code: code.map(str::to_string),
            kind,
        }
    }

    #[test]
    fn matched_event_payload() {
        let athlete = InvitedAthlete {
            id: Uuid::nil(),
            full_name: "Maya Fields".into(),
            email: Some("maya@example.com".into()),
        };
        let event = JoinEvent::new("g1", &join(Some("aaa"), MatchKind::Exact), Some(&athlete));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "member_joined",
                "userId": "42",
                "username": "sprinter",
                "inviteCode": "aaa",
                "athleteId": "00000000-0000-0000-0000-000000000000",
                "athleteName": "Maya Fields",
                "athleteEmail": "maya@example.com",
                "guildId": "g1",
                "joinedAt": "2024-05-01T12:00:00Z",
                "match": "exact",
            })
        );
    }

    #[test]
    fn unmatched_event_keeps_nulls() {
        let event = JoinEvent::new("g1", &join(None, MatchKind::Unknown), None);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "member_joined_unmatched");
        assert!(value["athleteId"].is_null());
        assert!(value["inviteCode"].is_null());
        assert_eq!(value["match"], "unknown");
    }

    #[tokio::test]
    async fn notify_without_url_is_a_no_op() {
        let notifier = WebhookNotifier::new(None);
        let event = JoinEvent::new("g1", &join(None, MatchKind::Unknown), None);
        notifier.notify(&event).await.unwrap();
    }

    #[test]
    fn config_picks_dev_url_outside_production() {
        let config = WebhookConfig {
            url: Some("https://prod".into()),
            dev_url: Some("https://dev".into()),
            environment: "development".into(),
        };
        assert_eq!(
            WebhookNotifier::from_config(&config).url.as_deref(),
            Some("https://dev")
        );
    }
}

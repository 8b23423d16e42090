//! Discord REST v10 client
//!
//! Only the two reads the invite matcher needs: the guild's invites with
//! their use counts, and the guild's members.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{BotError, Result};

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Largest page `GET /guilds/{id}/members` returns
const MEMBER_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Invite {
    pub code: String,
    #[serde(default)]
    pub uses: u32,
    #[serde(default)]
    pub max_uses: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildMember {
    pub user: DiscordUser,
    pub joined_at: DateTime<Utc>,
}

/// Where invite counts and member joins come from
#[async_trait]
pub trait InviteSource: Send + Sync {
    async fn fetch_invites(&self, guild_id: &str) -> Result<Vec<Invite>>;

    /// Members who joined strictly after `after`, oldest first.
    async fn recent_members(
        &self,
        guild_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<GuildMember>>;
}

pub struct DiscordRest {
    client: Client,
    base_url: String,
    token: String,
}

impl DiscordRest {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DISCORD_API_BASE)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bot {}", self.token))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Discord {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl InviteSource for DiscordRest {
    async fn fetch_invites(&self, guild_id: &str) -> Result<Vec<Invite>> {
        self.get(&format!("/guilds/{guild_id}/invites"), &[]).await
    }

    async fn recent_members(
        &self,
        guild_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<GuildMember>> {
        // The members endpoint pages by user id, not join time, so walk
        // every page and keep the new joins.
        let path = format!("/guilds/{guild_id}/members");
        let mut cursor: Option<String> = None;
        let mut joined = Vec::new();
        loop {
            let mut query = vec![("limit", MEMBER_PAGE_LIMIT.to_string())];
            if let Some(cursor) = &cursor {
                query.push(("after", cursor.clone()));
            }
            let page: Vec<GuildMember> = self.get(&path, &query).await?;
            let full_page = page.len() == MEMBER_PAGE_LIMIT;
            cursor = page.last().map(|m| m.user.id.clone());
            joined.extend(page.into_iter().filter(|m| m.joined_at > after));
            if !full_page || cursor.is_none() {
                break;
            }
        }
        joined.sort_by_key(|m| m.joined_at);
        tracing::debug!(guild_id, count = joined.len(), "fetched new guild members");
        Ok(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_without_counts_defaults_to_zero() {
        let invite: Invite = serde_json::from_str(r#"{"code":"abc123"}"#).unwrap();
        assert_eq!(invite.uses, 0);
        assert_eq!(invite.max_uses, 0);
    }

    #[test]
    fn member_parses_discord_timestamp() {
        let member: GuildMember = serde_json::from_str(
            r#"{"user":{"id":"42","username":"sprinter"},"joined_at":"2024-05-01T12:30:00.123000+00:00"}"#,
        )
        .unwrap();
        assert_eq!(member.user.username, "sprinter");
        assert_eq!(member.joined_at.to_rfc3339(), "2024-05-01T12:30:00.123+00:00");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let rest = DiscordRest::with_base_url("token", "http://localhost:9999/");
        assert_eq!(rest.base_url, "http://localhost:9999");
    }
}

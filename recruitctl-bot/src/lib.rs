//! recruitctl-bot: Discord invite matcher
//!
//! Polls a guild for new members, works out which invite each one used,
//! links the matching athlete to the Discord account, and notifies the
//! automation webhook.
//!
//! - `discord`: REST v10 invite and member source
//! - `invites`: snapshot diffing and join pairing
//! - `directory`: athlete lookup by invite code
//! - `webhook`: join event delivery

pub mod directory;
pub mod discord;
pub mod error;
pub mod invites;
pub mod webhook;

use std::time::Duration;

use chrono::{DateTime, Utc};
use recruitctl_core::RecruitConfig;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

pub use directory::{AthleteDirectory, InvitedAthlete, PgDirectory};
pub use discord::{DiscordRest, GuildMember, Invite, InviteSource};
pub use error::{BotError, Result};
pub use invites::{diff_invites, InviteTracker, JoinMatch, MatchKind};
pub use webhook::{JoinEvent, WebhookNotifier};

pub struct InviteBot<S, D> {
    tracker: InviteTracker<S>,
    directory: D,
    notifier: WebhookNotifier,
    guild_id: String,
    poll_interval: Duration,
    last_join: DateTime<Utc>,
}

impl<S: InviteSource, D: AthleteDirectory> InviteBot<S, D> {
    pub fn new(
        source: S,
        directory: D,
        notifier: WebhookNotifier,
        guild_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            tracker: InviteTracker::new(source),
            directory,
            notifier,
            guild_id: guild_id.into(),
            poll_interval,
            last_join: Utc::now(),
        }
    }

    /// Only members who join after `since` are handled.
    pub fn starting_from(mut self, since: DateTime<Utc>) -> Self {
        self.last_join = since;
        self
    }

    pub async fn prime(&self) -> Result<usize> {
        self.tracker.prime(&self.guild_id).await
    }

    /// Fetch joins since the last seen one and handle them as one batch.
    pub async fn poll_once(&mut self) -> Result<Vec<JoinEvent>> {
        let joins = self
            .tracker
            .source()
            .recent_members(&self.guild_id, self.last_join)
            .await?;
        let Some(newest) = joins.iter().map(|m| m.joined_at).max() else {
            return Ok(Vec::new());
        };
        let events = self.handle_joins(joins).await?;
        self.last_join = newest;
        Ok(events)
    }

    /// Match a batch of joins to invites and athletes, then notify.
    #[tracing::instrument(skip_all, name = "bot.handle_joins", fields(joins = joins.len()))]
    pub async fn handle_joins(&self, joins: Vec<GuildMember>) -> Result<Vec<JoinEvent>> {
        let matches = self.tracker.resolve_joins(&self.guild_id, joins).await?;

        let mut events = Vec::with_capacity(matches.len());
        for join in &matches {
            let athlete = self.lookup(join).await;
            if let Some(athlete) = &athlete {
                let user = &join.member.user;
                if let Err(e) = self
                    .directory
                    .record_discord_identity(athlete.id, &user.id, &user.username)
                    .await
                {
                    tracing::warn!(athlete_id = %athlete.id, error = %e, "could not store discord identity");
                }
            }

            let event = JoinEvent::new(&self.guild_id, join, athlete.as_ref());
            tracing::info!(
                event = event.event,
                user_id = %event.user_id,
                invite_code = ?event.invite_code,
                match_kind = ?event.match_kind,
                "member joined"
            );
            if let Err(e) = self.notifier.notify(&event).await {
                tracing::warn!(user_id = %event.user_id, error = %e, "webhook delivery failed");
            }
            events.push(event);
        }
        Ok(events)
    }

    async fn lookup(&self, join: &JoinMatch) -> Option<InvitedAthlete> {
        let code = join.invite_code.as_deref()?;
        match self.directory.find_by_invite_code(code).await {
            Ok(found) => {
                if found.is_none() {
                    tracing::debug!(invite_code = code, "no athlete holds this invite");
                }
                found
            }
            Err(e) => {
                tracing::warn!(invite_code = code, error = %e, "athlete lookup failed");
                None
            }
        }
    }

    /// Prime the invite cache, then poll until `shutdown` is cancelled.
    #[tracing::instrument(skip_all, name = "bot.run")]
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        self.prime().await?;
        tracing::info!(
            guild_id = %self.guild_id,
            poll_interval_secs = self.poll_interval.as_secs(),
            "Starting invite matcher"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.cancelled() => break,
            }
            if let Err(e) = self.poll_once().await {
                tracing::error!(error = %e, "member poll failed");
            }
        }

        tracing::info!("Invite matcher stopped");
        Ok(())
    }
}

/// Build the Discord, database and webhook clients from `config` and run.
pub async fn run_bot(
    config: &RecruitConfig,
    pool: PgPool,
    shutdown: CancellationToken,
) -> Result<()> {
    let token = config
        .discord
        .bot_token
        .as_deref()
        .ok_or(BotError::Config("DISCORD_BOT_TOKEN"))?;
    let guild_id = config
        .discord
        .guild_id
        .as_deref()
        .ok_or(BotError::Config("DISCORD_GUILD_ID"))?;

    let bot = InviteBot::new(
        DiscordRest::new(token),
        PgDirectory::new(pool),
        WebhookNotifier::from_config(&config.webhook),
        guild_id,
        Duration::from_secs(config.discord.poll_interval_secs.max(1)),
    );
    bot.run(shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use crate::discord::DiscordUser;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FakeSource {
        invites: Mutex<Vec<Vec<Invite>>>,
        members: Vec<GuildMember>,
    }

    #[async_trait]
    impl InviteSource for FakeSource {
        async fn fetch_invites(&self, _: &str) -> Result<Vec<Invite>> {
            let mut invites = self.invites.lock().unwrap();
            Ok(if invites.len() > 1 {
                invites.remove(0)
            } else {
                invites[0].clone()
            })
        }

        async fn recent_members(&self, _: &str, after: DateTime<Utc>) -> Result<Vec<GuildMember>> {
            Ok(self
                .members
                .iter()
                .filter(|m| m.joined_at > after)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeDirectory {
        recorded: Mutex<Vec<(Uuid, String)>>,
    }

    #[async_trait]
    impl AthleteDirectory for FakeDirectory {
        async fn find_by_invite_code(&self, code: &str) -> Result<Option<InvitedAthlete>> {
            Ok((code == "maya").then(|| InvitedAthlete {
                id: Uuid::nil(),
                full_name: "Maya Fields".into(),
                email: None,
            }))
        }

        async fn record_discord_identity(&self, id: Uuid, user_id: &str, _: &str) -> Result<()> {
            self.recorded.lock().unwrap().push((id, user_id.to_string()));
            Ok(())
        }
    }

    fn invite(code: &str, uses: u32) -> Invite {
        Invite {
            code: code.into(),
            uses,
            max_uses: 0,
        }
    }

    fn member(id: &str, minute: u32) -> GuildMember {
        GuildMember {
            user: DiscordUser {
                id: id.into(),
                username: format!("user{id}"),
                global_name: None,
            },
            joined_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        }
    }

    fn bot(invites: Vec<Vec<Invite>>, members: Vec<GuildMember>) -> InviteBot<FakeSource, FakeDirectory> {
        InviteBot::new(
            FakeSource {
                invites: Mutex::new(invites),
                members,
            },
            FakeDirectory::default(),
            WebhookNotifier::new(None),
            "g1",
            Duration::from_secs(1),
        )
        .starting_from(Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn matched_join_records_identity() {
        let mut bot = bot(
            vec![vec![invite("maya", 0)], vec![invite("maya", 1)]],
            vec![member("42", 5)],
        );
        bot.prime().await.unwrap();

        let events = bot.poll_once().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "member_joined");
        assert_eq!(events[0].athlete_name.as_deref(), Some("Maya Fields"));
        assert_eq!(events[0].match_kind, MatchKind::Exact);
        assert_eq!(
            bot.directory.recorded.lock().unwrap().as_slice(),
            &[(Uuid::nil(), "42".to_string())]
        );
    }

    #[tokio::test]
    async fn unknown_code_is_unmatched() {
        let mut bot = bot(
            vec![vec![invite("other", 0)], vec![invite("other", 1)]],
            vec![member("42", 5)],
        );
        bot.prime().await.unwrap();

        let events = bot.poll_once().await.unwrap();
        assert_eq!(events[0].event, "member_joined_unmatched");
        assert_eq!(events[0].invite_code.as_deref(), Some("other"));
        assert!(bot.directory.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn joins_are_handled_once() {
        let mut bot = bot(
            vec![vec![invite("maya", 0)], vec![invite("maya", 1)]],
            vec![member("42", 5)],
        );
        bot.prime().await.unwrap();

        assert_eq!(bot.poll_once().await.unwrap().len(), 1);
        assert!(bot.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_bot_requires_token() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let err = run_bot(&RecruitConfig::default(), pool, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Config("DISCORD_BOT_TOKEN")));
    }
}

//! Athlete lookups by invite code

use async_trait::async_trait;
use recruitctl_server::db::repos::AthleteRepo;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

/// The athlete fields a join notification carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitedAthlete {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait AthleteDirectory: Send + Sync {
    async fn find_by_invite_code(&self, code: &str) -> Result<Option<InvitedAthlete>>;

    async fn record_discord_identity(
        &self,
        athlete_id: Uuid,
        discord_user_id: &str,
        discord_username: &str,
    ) -> Result<()>;
}

pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AthleteDirectory for PgDirectory {
    async fn find_by_invite_code(&self, code: &str) -> Result<Option<InvitedAthlete>> {
        let athlete = AthleteRepo::new(&self.pool).find_by_invite_code(code).await?;
        Ok(athlete.map(|a| InvitedAthlete {
            id: a.id,
            full_name: a.full_name,
            email: a.email,
        }))
    }

    async fn record_discord_identity(
        &self,
        athlete_id: Uuid,
        discord_user_id: &str,
        discord_username: &str,
    ) -> Result<()> {
        AthleteRepo::new(&self.pool)
            .record_discord_identity(athlete_id, discord_user_id, discord_username)
            .await?;
        Ok(())
    }
}

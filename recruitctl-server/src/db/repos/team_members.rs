//! Team members (agency staff)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::db::{DbError, Entity, EntityRepo, EntityWrite, Payload, SqlValue, Values};
use crate::models::fields::{self, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub const ROLES: &[&str] = &["admin", "manager", "member"];

pub struct TeamMembers;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub job_title: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for TeamMembers {
    type Row = TeamMember;

    const TABLE: &'static str = "team_members";
    const RESOURCE: &'static str = "team member";
    const FROM: &'static str = "team_members t";
    const SELECT: &'static str =
        "t.id, t.full_name, t.email, t.job_title, t.role, t.is_active, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("full_name", "t.full_name"),
        ColumnDef::text("email", "t.email"),
        ColumnDef::text("job_title", "t.job_title"),
        ColumnDef::select("role", "t.role"),
        ColumnDef::boolean("is_active", "t.is_active"),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const DEFAULT_SORT: &'static str = "t.full_name ASC";
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTeamMember {
    pub full_name: String,
    pub email: String,
    pub job_title: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl Payload for NewTeamMember {
    fn into_values(self) -> Result<Values, ValidationError> {
        let role = match self.role {
            Some(role) => fields::one_of("role", &role, ROLES)?,
            None => "member".to_string(),
        };
        let mut values = Values::new();
        values
            .set("full_name", fields::required_text("full_name", &self.full_name, MAX_TEXT)?)
            .set("email", fields::required_email("email", &self.email)?)
            .set("job_title", fields::optional_text("job_title", self.job_title, MAX_TEXT)?)
            .set("role", role)
            .set("is_active", self.is_active.unwrap_or(true));
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamMemberPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub job_title: Option<Option<String>>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl Payload for TeamMemberPatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set_some(
                "full_name",
                self.full_name
                    .map(|n| fields::required_text("full_name", &n, MAX_TEXT))
                    .transpose()?,
            )
            .set_some(
                "email",
                self.email
                    .map(|e| fields::required_email("email", &e))
                    .transpose()?,
            )
            .set_some(
                "job_title",
                self.job_title
                    .map(|v| fields::optional_text("job_title", v, MAX_TEXT))
                    .transpose()?,
            )
            .set_some(
                "role",
                self.role
                    .map(|r| fields::one_of("role", &r, ROLES))
                    .transpose()?,
            )
            .set_some("is_active", self.is_active);
        Ok(values)
    }
}

async fn ensure_email_free(
    conn: &mut PgConnection,
    values: &Values,
    exclude: Option<Uuid>,
) -> Result<(), DbError> {
    let Some(SqlValue::Text(Some(email))) = values.get("email") else {
        return Ok(());
    };

    let (taken,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM team_members
            WHERE LOWER(email) = LOWER($1)
              AND is_deleted = FALSE
              AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(email)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await?;

    if taken {
        return Err(ValidationError::Duplicate {
            resource: "a team member",
            fields: &["email"],
        }
        .into());
    }
    Ok(())
}

#[async_trait]
impl EntityWrite for TeamMembers {
    type New = NewTeamMember;
    type Patch = TeamMemberPatch;

    async fn create(
        repo: &EntityRepo<'_, Self>,
        new: NewTeamMember,
    ) -> Result<TeamMember, DbError> {
        let values = new.into_values()?;
        let mut tx = repo.pool().begin().await?;
        ensure_email_free(&mut tx, &values, None).await?;
        let id = EntityRepo::<Self>::insert_in(&mut tx, values).await?;
        let member = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(member)
    }

    async fn update(
        repo: &EntityRepo<'_, Self>,
        id: Uuid,
        patch: TeamMemberPatch,
    ) -> Result<TeamMember, DbError> {
        let values = patch.into_values()?;
        let mut tx = repo.pool().begin().await?;
        ensure_email_free(&mut tx, &values, Some(id)).await?;
        EntityRepo::<Self>::update_in(&mut tx, id, values).await?;
        let member = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_active_member() {
        let new: NewTeamMember = serde_json::from_value(json!({
            "full_name": "Alex Kim",
            "email": " Alex@Agency.com "
        }))
        .unwrap();
        let values = new.into_values().unwrap();
        assert_eq!(values.get("role"), Some(&SqlValue::Text(Some("member".into()))));
        assert_eq!(values.get("is_active"), Some(&SqlValue::Bool(Some(true))));
        assert_eq!(
            values.get("email"),
            Some(&SqlValue::Text(Some("alex@agency.com".into())))
        );
    }

    #[test]
    fn email_is_required() {
        let new: NewTeamMember =
            serde_json::from_value(json!({"full_name": "Alex", "email": "  "})).unwrap();
        assert!(new.into_values().is_err());
    }

    #[test]
    fn patch_rejects_unknown_role() {
        let patch: TeamMemberPatch = serde_json::from_value(json!({"role": "owner"})).unwrap();
        assert!(matches!(
            patch.into_values(),
            Err(ValidationError::InvalidVariant { field: "role", .. })
        ));
    }
}

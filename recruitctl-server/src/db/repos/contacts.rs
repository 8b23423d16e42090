//! Contacts (parents, guardians) and their links to athletes

use chrono::{DateTime, Utc};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::{require_live, DbError, Entity, EntityWrite, Payload, Values};
use crate::models::fields::{self, MAX_LONG_TEXT, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub const CONTACT_METHODS: &[&str] = &["email", "phone", "text"];

pub struct Contacts;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub preferred_contact_method: Option<String>,
    pub notes: Option<String>,
    pub athlete_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ATHLETE_COUNT: &str = "(SELECT COUNT(*) FROM contact_athletes ca \
    JOIN athletes a ON a.id = ca.athlete_id \
    WHERE ca.contact_id = t.id AND a.is_deleted = FALSE)";

impl Entity for Contacts {
    type Row = Contact;

    const TABLE: &'static str = "contacts";
    const RESOURCE: &'static str = "contact";
    const FROM: &'static str = "contacts t";
    const SELECT: &'static str = "t.id, t.full_name, t.email, t.phone, \
        t.preferred_contact_method, t.notes, \
        (SELECT COUNT(*) FROM contact_athletes ca \
        JOIN athletes a ON a.id = ca.athlete_id \
        WHERE ca.contact_id = t.id AND a.is_deleted = FALSE) AS athlete_count, \
        t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("full_name", "t.full_name"),
        ColumnDef::text("email", "t.email"),
        ColumnDef::text("phone", "t.phone"),
        ColumnDef::select("preferred_contact_method", "t.preferred_contact_method"),
        ColumnDef::number("athlete_count", ATHLETE_COUNT),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const DEFAULT_SORT: &'static str = "t.full_name ASC";
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewContact {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub preferred_contact_method: Option<String>,
    pub notes: Option<String>,
}

impl Payload for NewContact {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set("full_name", fields::required_text("full_name", &self.full_name, MAX_TEXT)?)
            .set("email", fields::optional_email("email", self.email)?)
            .set("phone", fields::optional_text("phone", self.phone, 64)?)
            .set(
                "preferred_contact_method",
                fields::optional_one_of(
                    "preferred_contact_method",
                    self.preferred_contact_method,
                    CONTACT_METHODS,
                )?,
            )
            .set("notes", fields::optional_text("notes", self.notes, MAX_LONG_TEXT)?);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPatch {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub preferred_contact_method: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl Payload for ContactPatch {
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
                    .map(|e| fields::optional_email("email", e))
                    .transpose()?,
            )
            .set_some(
                "phone",
                self.phone
                    .map(|v| fields::optional_text("phone", v, 64))
                    .transpose()?,
            )
            .set_some(
                "preferred_contact_method",
                self.preferred_contact_method
                    .map(|v| {
                        fields::optional_one_of("preferred_contact_method", v, CONTACT_METHODS)
                    })
                    .transpose()?,
            )
            .set_some(
                "notes",
                self.notes
                    .map(|v| fields::optional_text("notes", v, MAX_LONG_TEXT))
                    .transpose()?,
            );
        Ok(values)
    }
}

impl EntityWrite for Contacts {
    type New = NewContact;
    type Patch = ContactPatch;
}

/// An athlete linked to a contact
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContactAthlete {
    pub contact_id: Uuid,
    pub athlete_id: Uuid,
    pub athlete_name: String,
    pub relationship: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /contacts/{id}/athletes`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkAthlete {
    pub athlete_id: Uuid,
    pub relationship: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

pub struct ContactRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Live athletes linked to a live contact.
    pub async fn list_athletes(&self, contact_id: Uuid) -> Result<Vec<ContactAthlete>, DbError> {
        let mut conn = self.pool.acquire().await?;
        if !live_contact(&mut conn, contact_id).await? {
            return Err(DbError::not_found(Contacts::RESOURCE, contact_id));
        }

        let links = sqlx::query_as::<_, ContactAthlete>(
            r#"
            SELECT ca.contact_id, ca.athlete_id, a.full_name AS athlete_name,
                   ca.relationship, ca.is_primary, ca.created_at
            FROM contact_athletes ca
            JOIN athletes a ON a.id = ca.athlete_id
            WHERE ca.contact_id = $1 AND a.is_deleted = FALSE
            ORDER BY ca.is_primary DESC, a.full_name
            "#,
        )
        .bind(contact_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(links)
    }

    /// Link an athlete, or update the relationship of an existing link.
    pub async fn link_athlete(
        &self,
        contact_id: Uuid,
        link: LinkAthlete,
    ) -> Result<ContactAthlete, DbError> {
        let relationship = fields::optional_text("relationship", link.relationship, MAX_TEXT)?;

        let mut tx = self.pool.begin().await?;
        if !live_contact(&mut tx, contact_id).await? {
            return Err(DbError::not_found(Contacts::RESOURCE, contact_id));
        }
        require_live(&mut tx, "athlete_id", "athletes", link.athlete_id).await?;

        sqlx::query(
            r#"
            INSERT INTO contact_athletes (contact_id, athlete_id, relationship, is_primary)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (contact_id, athlete_id)
            DO UPDATE SET relationship = EXCLUDED.relationship,
                          is_primary = EXCLUDED.is_primary
            "#,
        )
        .bind(contact_id)
        .bind(link.athlete_id)
        .bind(relationship)
        .bind(link.is_primary)
        .execute(&mut *tx)
        .await?;

        let linked = sqlx::query_as::<_, ContactAthlete>(
            r#"
            SELECT ca.contact_id, ca.athlete_id, a.full_name AS athlete_name,
                   ca.relationship, ca.is_primary, ca.created_at
            FROM contact_athletes ca
            JOIN athletes a ON a.id = ca.athlete_id
            WHERE ca.contact_id = $1 AND ca.athlete_id = $2
            "#,
        )
        .bind(contact_id)
        .bind(link.athlete_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(%contact_id, athlete_id = %link.athlete_id, "linked athlete to contact");
        Ok(linked)
    }

    /// Remove a link. A missing link is not-found.
    pub async fn unlink_athlete(&self, contact_id: Uuid, athlete_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query(
            "DELETE FROM contact_athletes WHERE contact_id = $1 AND athlete_id = $2",
        )
        .bind(contact_id)
        .bind(athlete_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "contact athlete link",
                format!("{contact_id}/{athlete_id}"),
            ));
        }
        tracing::info!(%contact_id, %athlete_id, "unlinked athlete from contact");
        Ok(())
    }
}

async fn live_contact(conn: &mut sqlx::PgConnection, id: Uuid) -> Result<bool, DbError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM contacts WHERE id = $1 AND is_deleted = FALSE)",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;
    use serde_json::json;

    #[test]
    fn contact_method_is_normalized() {
        let new: NewContact = serde_json::from_value(json!({
            "full_name": "Pat Rivera",
            "preferred_contact_method": "Text"
        }))
        .unwrap();
        let values = new.into_values().unwrap();
        assert_eq!(
            values.get("preferred_contact_method"),
            Some(&SqlValue::Text(Some("text".into())))
        );
    }

    #[test]
    fn unknown_contact_method_rejected() {
        let new: NewContact = serde_json::from_value(json!({
            "full_name": "Pat Rivera",
            "preferred_contact_method": "pigeon"
        }))
        .unwrap();
        assert!(new.into_values().is_err());
    }

    #[test]
    fn link_defaults_to_not_primary() {
        let link: LinkAthlete =
            serde_json::from_value(json!({"athlete_id": Uuid::new_v4()})).unwrap();
        assert!(!link.is_primary);
        assert!(link.relationship.is_none());
    }
}

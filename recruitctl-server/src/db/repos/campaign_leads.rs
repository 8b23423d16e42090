//! Campaign leads: one university (and optionally program and coach)
//! targeted by a campaign

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recruitctl_core::{ColumnDef, ColumnKind};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::programs::require_program_of;
use crate::db::{require_live, DbError, Entity, EntityRepo, EntityWrite, Payload, SqlValue, Values};
use crate::models::fields::{self, MAX_LONG_TEXT};
use crate::models::{nullable, ValidationError};

pub const STATUSES: &[&str] = &["pending", "sent", "opened", "replied", "bounced", "unsubscribed"];

/// Upper bound on leads per bulk request
pub const MAX_BULK_LEADS: usize = 500;

pub struct CampaignLeads;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampaignLead {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub campaign_name: String,
    pub university_id: Uuid,
    pub university_name: String,
    pub program_id: Option<Uuid>,
    pub coach_id: Option<Uuid>,
    pub coach_name: Option<String>,
    pub coach_email: Option<String>,
    pub status: String,
    pub first_sent_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CampaignLeads {
    type Row = CampaignLead;

    const TABLE: &'static str = "campaign_leads";
    const RESOURCE: &'static str = "campaign lead";
    const FROM: &'static str = "campaign_leads t \
        JOIN campaigns c ON c.id = t.campaign_id \
        JOIN universities u ON u.id = t.university_id \
        LEFT JOIN coaches co ON co.id = t.coach_id";
    const SELECT: &'static str = "t.id, t.campaign_id, c.name AS campaign_name, \
        t.university_id, u.name AS university_name, t.program_id, t.coach_id, \
        co.full_name AS coach_name, co.email AS coach_email, t.status, t.first_sent_at, \
        t.replied_at, t.notes, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("university_name", "u.name"),
        ColumnDef::text("coach_name", "co.full_name"),
        ColumnDef::text("campaign_name", "c.name"),
        ColumnDef::select("status", "t.status"),
        ColumnDef::select("division", "u.division"),
        ColumnDef::date("first_sent_at", "t.first_sent_at"),
        ColumnDef::date("replied_at", "t.replied_at"),
        ColumnDef::date("created_at", "t.created_at"),
        // filter-only: a campaign's detail page lists its leads
        ColumnDef {
            id: "campaign_id",
            expr: "t.campaign_id",
            kind: ColumnKind::Select,
            sortable: false,
            facetable: false,
            searchable: false,
        },
    ];
    const DEFAULT_SORT: &'static str = "u.name ASC";
    const REFERENCES: &'static [(&'static str, &'static str)] = &[
        ("campaign_id", "campaigns"),
        ("university_id", "universities"),
        ("coach_id", "coaches"),
    ];
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaignLead {
    pub campaign_id: Uuid,
    pub university_id: Uuid,
    pub program_id: Option<Uuid>,
    pub coach_id: Option<Uuid>,
    pub status: Option<String>,
    pub first_sent_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Payload for NewCampaignLead {
    fn into_values(self) -> Result<Values, ValidationError> {
        let status = match self.status {
            Some(status) => fields::one_of("status", &status, STATUSES)?,
            None => STATUSES[0].to_string(),
        };
        let mut values = Values::new();
        values
            .set("campaign_id", self.campaign_id)
            .set("university_id", self.university_id)
            .set("program_id", self.program_id)
            .set("coach_id", self.coach_id)
            .set("status", status)
            .set("first_sent_at", self.first_sent_at)
            .set("replied_at", self.replied_at)
            .set("notes", fields::optional_text("notes", self.notes, MAX_LONG_TEXT)?);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignLeadPatch {
    pub university_id: Option<Uuid>,
    #[serde(default, deserialize_with = "nullable")]
    pub program_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub coach_id: Option<Option<Uuid>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub first_sent_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub replied_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl Payload for CampaignLeadPatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set_some("university_id", self.university_id)
            .set_some("program_id", self.program_id)
            .set_some("coach_id", self.coach_id)
            .set_some(
                "status",
                self.status
                    .map(|s| fields::one_of("status", &s, STATUSES))
                    .transpose()?,
            )
            .set_some("first_sent_at", self.first_sent_at)
            .set_some("replied_at", self.replied_at)
            .set_some(
                "notes",
                self.notes
                    .map(|v| fields::optional_text("notes", v, MAX_LONG_TEXT))
                    .transpose()?,
            );
        Ok(values)
    }
}

/// Program must belong to the lead's university.
async fn check_program(
    conn: &mut PgConnection,
    university_id: Uuid,
    program_id: Option<Uuid>,
) -> Result<(), DbError> {
    match program_id {
        Some(program_id) => require_program_of(conn, program_id, university_id).await,
        None => Ok(()),
    }
}

async fn insert_lead(conn: &mut PgConnection, values: Values) -> Result<Uuid, DbError> {
    let university_id = values
        .get("university_id")
        .and_then(SqlValue::as_uuid)
        .ok_or(ValidationError::Empty {
            field: "university_id",
        })?;
    let program_id = values.get("program_id").and_then(SqlValue::as_uuid);
    check_program(conn, university_id, program_id).await?;
    EntityRepo::<CampaignLeads>::insert_in(conn, values).await
}

#[async_trait]
impl EntityWrite for CampaignLeads {
    type New = NewCampaignLead;
    type Patch = CampaignLeadPatch;

    async fn create(
        repo: &EntityRepo<'_, Self>,
        new: NewCampaignLead,
    ) -> Result<CampaignLead, DbError> {
        let values = new.into_values()?;
        let mut tx = repo.pool().begin().await?;
        let id = insert_lead(&mut tx, values).await?;
        let lead = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(lead)
    }

    async fn update(
        repo: &EntityRepo<'_, Self>,
        id: Uuid,
        patch: CampaignLeadPatch,
    ) -> Result<CampaignLead, DbError> {
        let values = patch.into_values()?;
        let mut tx = repo.pool().begin().await?;

        if values.contains("university_id") || values.contains("program_id") {
            let stored: Option<(Uuid, Option<Uuid>)> = sqlx::query_as(
                r#"
                SELECT university_id, program_id FROM campaign_leads
                WHERE id = $1 AND is_deleted = FALSE
                FOR UPDATE
                "#,
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
            let (stored_university, stored_program) =
                stored.ok_or_else(|| DbError::not_found(Self::RESOURCE, id))?;

            let university_id = values
                .get("university_id")
                .and_then(SqlValue::as_uuid)
                .unwrap_or(stored_university);
            let program_id = match values.get("program_id") {
                Some(value) => value.as_uuid(),
                None => stored_program,
            };
            check_program(&mut tx, university_id, program_id).await?;
        }

        EntityRepo::<Self>::update_in(&mut tx, id, values).await?;
        let lead = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(lead)
    }
}

/// One lead in a bulk request; the campaign comes from the request.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkLead {
    pub university_id: Uuid,
    pub program_id: Option<Uuid>,
    pub coach_id: Option<Uuid>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Body of `POST /campaign-leads/bulk`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkLeadsRequest {
    pub campaign_id: Uuid,
    pub leads: Vec<BulkLead>,
}

/// Create many leads for one campaign in a single transaction.
///
/// Any invalid lead rolls back the whole batch.
pub async fn bulk_create(
    pool: &PgPool,
    request: BulkLeadsRequest,
) -> Result<Vec<CampaignLead>, DbError> {
    if request.leads.is_empty() {
        return Err(ValidationError::Empty { field: "leads" }.into());
    }
    if request.leads.len() > MAX_BULK_LEADS {
        return Err(ValidationError::OutOfRange {
            field: "leads",
            min: 1.0,
            max: MAX_BULK_LEADS as f64,
        }
        .into());
    }

    let campaign_id = request.campaign_id;
    let mut tx = pool.begin().await?;
    require_live(&mut tx, "campaign_id", "campaigns", campaign_id).await?;

    let mut ids = Vec::with_capacity(request.leads.len());
    for lead in request.leads {
        let values = NewCampaignLead {
            campaign_id,
            university_id: lead.university_id,
            program_id: lead.program_id,
            coach_id: lead.coach_id,
            status: lead.status,
            first_sent_at: None,
            replied_at: None,
            notes: lead.notes,
        }
        .into_values()?;
        ids.push(insert_lead(&mut tx, values).await?);
    }

    let mut leads = Vec::with_capacity(ids.len());
    for id in ids {
        leads.push(EntityRepo::<CampaignLeads>::fetch_in(&mut tx, id).await?);
    }
    tx.commit().await?;

    tracing::info!(%campaign_id, count = leads.len(), "bulk created campaign leads");
    Ok(leads)
}

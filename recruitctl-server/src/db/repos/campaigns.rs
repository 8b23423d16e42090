//! Outreach campaigns

use chrono::{DateTime, NaiveDate, Utc};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{Entity, EntityWrite, Payload, Values};
use crate::models::fields::{self, MAX_LONG_TEXT, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub const KINDS: &[&str] = &["email", "sms", "dm"];
pub const STATUSES: &[&str] = &["draft", "active", "paused", "completed"];

pub struct Campaigns;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub status: String,
    pub athlete_id: Option<Uuid>,
    pub athlete_name: Option<String>,
    pub sending_tool: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lead_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Campaigns {
    type Row = Campaign;

    const TABLE: &'static str = "campaigns";
    const RESOURCE: &'static str = "campaign";
    const FROM: &'static str = "campaigns t LEFT JOIN athletes a ON a.id = t.athlete_id";
    const SELECT: &'static str = "t.id, t.name, t.kind, t.status, t.athlete_id, \
        a.full_name AS athlete_name, t.sending_tool, t.start_date, t.end_date, t.notes, \
        (SELECT COUNT(*) FROM campaign_leads l WHERE l.campaign_id = t.id AND l.is_deleted = FALSE) \
        AS lead_count, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("name", "t.name"),
        ColumnDef::select("kind", "t.kind"),
        ColumnDef::select("status", "t.status"),
        ColumnDef::text("athlete_name", "a.full_name"),
        ColumnDef::select("sending_tool", "t.sending_tool"),
        ColumnDef::date("start_date", "t.start_date"),
        ColumnDef::date("end_date", "t.end_date"),
        ColumnDef::number(
            "lead_count",
            "(SELECT COUNT(*) FROM campaign_leads l WHERE l.campaign_id = t.id AND l.is_deleted = FALSE)",
        ),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const REFERENCES: &'static [(&'static str, &'static str)] = &[("athlete_id", "athletes")];
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub athlete_id: Option<Uuid>,
    pub sending_tool: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Payload for NewCampaign {
    fn into_values(self) -> Result<Values, ValidationError> {
        fields::date_order("end_date", self.start_date, self.end_date)?;
        let kind = match self.kind {
            Some(kind) => fields::one_of("kind", &kind, KINDS)?,
            None => KINDS[0].to_string(),
        };
        let status = match self.status {
            Some(status) => fields::one_of("status", &status, STATUSES)?,
            None => STATUSES[0].to_string(),
        };

        let mut values = Values::new();
        values
            .set("name", fields::required_text("name", &self.name, MAX_TEXT)?)
            .set("kind", kind)
            .set("status", status)
            .set("athlete_id", self.athlete_id)
            .set(
                "sending_tool",
                fields::optional_text("sending_tool", self.sending_tool, MAX_TEXT)?,
            )
            .set("start_date", self.start_date)
            .set("end_date", self.end_date)
            .set("notes", fields::optional_text("notes", self.notes, MAX_LONG_TEXT)?);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub athlete_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub sending_tool: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl Payload for CampaignPatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            fields::date_order("end_date", start, end)?;
        }
        let mut values = Values::new();
        values
            .set_some(
                "name",
                self.name
                    .map(|n| fields::required_text("name", &n, MAX_TEXT))
                    .transpose()?,
            )
            .set_some(
                "kind",
                self.kind
                    .map(|k| fields::one_of("kind", &k, KINDS))
                    .transpose()?,
            )
            .set_some(
                "status",
                self.status
                    .map(|s| fields::one_of("status", &s, STATUSES))
                    .transpose()?,
            )
            .set_some("athlete_id", self.athlete_id)
            .set_some(
                "sending_tool",
                self.sending_tool
                    .map(|v| fields::optional_text("sending_tool", v, MAX_TEXT))
                    .transpose()?,
            )
            .set_some("start_date", self.start_date)
            .set_some("end_date", self.end_date)
            .set_some(
                "notes",
                self.notes
                    .map(|v| fields::optional_text("notes", v, MAX_LONG_TEXT))
                    .transpose()?,
            );
        Ok(values)
    }
}

impl EntityWrite for Campaigns {
    type New = NewCampaign;
    type Patch = CampaignPatch;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;
    use serde_json::json;

    #[test]
    fn defaults_to_draft_email() {
        let new: NewCampaign = serde_json::from_value(json!({"name": "Fall D1 push"})).unwrap();
        let values = new.into_values().unwrap();
        assert_eq!(values.get("kind"), Some(&SqlValue::Text(Some("email".into()))));
        assert_eq!(values.get("status"), Some(&SqlValue::Text(Some("draft".into()))));
    }

    #[test]
    fn rejects_unknown_kind() {
        let new: NewCampaign =
            serde_json::from_value(json!({"name": "x", "kind": "fax"})).unwrap();
        assert!(matches!(
            new.into_values(),
            Err(ValidationError::InvalidVariant { field: "kind", .. })
        ));
    }
}

//! Clients: athletes under a paid agency contract

use chrono::{DateTime, NaiveDate, Utc};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{Entity, EntityWrite, Payload, Values};
use crate::models::fields::{self, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub const STATUSES: &[&str] = &["active", "paused", "completed", "cancelled"];

const MAX_AMOUNT: f64 = 10_000_000.0;

pub struct Clients;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub athlete_name: String,
    pub package: Option<String>,
    pub status: String,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub amount_paid: Option<f64>,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Clients {
    type Row = Client;

    const TABLE: &'static str = "clients";
    const RESOURCE: &'static str = "client";
    const FROM: &'static str = "clients t \
        JOIN athletes a ON a.id = t.athlete_id \
        LEFT JOIN team_members m ON m.id = t.assigned_to";
    const SELECT: &'static str = "t.id, t.athlete_id, a.full_name AS athlete_name, t.package, \
        t.status, t.contract_start, t.contract_end, t.amount_paid, t.assigned_to, \
        m.full_name AS assigned_to_name, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("athlete_name", "a.full_name"),
        ColumnDef::select("package", "t.package"),
        ColumnDef::select("status", "t.status"),
        ColumnDef::date("contract_start", "t.contract_start"),
        ColumnDef::date("contract_end", "t.contract_end"),
        ColumnDef::number("amount_paid", "t.amount_paid"),
        ColumnDef::select("assigned_to_name", "m.full_name"),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const REFERENCES: &'static [(&'static str, &'static str)] = &[
        ("athlete_id", "athletes"),
        ("assigned_to", "team_members"),
    ];
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub athlete_id: Uuid,
    pub package: Option<String>,
    pub status: Option<String>,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub amount_paid: Option<f64>,
    pub assigned_to: Option<Uuid>,
}

impl Payload for NewClient {
    fn into_values(self) -> Result<Values, ValidationError> {
        fields::date_order("contract_end", self.contract_start, self.contract_end)?;
        let status = match self.status {
            Some(status) => fields::one_of("status", &status, STATUSES)?,
            None => STATUSES[0].to_string(),
        };
        let mut values = Values::new();
        values
            .set("athlete_id", self.athlete_id)
            .set("package", fields::optional_text("package", self.package, MAX_TEXT)?)
            .set("status", status)
            .set("contract_start", self.contract_start)
            .set("contract_end", self.contract_end)
            .set(
                "amount_paid",
                fields::optional_in_range("amount_paid", self.amount_paid, 0.0, MAX_AMOUNT)?,
            )
            .set("assigned_to", self.assigned_to);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientPatch {
    #[serde(default, deserialize_with = "nullable")]
    pub package: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub contract_start: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contract_end: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub amount_paid: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub assigned_to: Option<Option<Uuid>>,
}

impl Payload for ClientPatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        if let (Some(start), Some(end)) = (self.contract_start, self.contract_end) {
            fields::date_order("contract_end", start, end)?;
        }
        let mut values = Values::new();
        values
            .set_some(
                "package",
                self.package
                    .map(|v| fields::optional_text("package", v, MAX_TEXT))
                    .transpose()?,
            )
            .set_some(
                "status",
                self.status
                    .map(|s| fields::one_of("status", &s, STATUSES))
                    .transpose()?,
            )
            .set_some("contract_start", self.contract_start)
            .set_some("contract_end", self.contract_end)
            .set_some(
                "amount_paid",
                self.amount_paid
                    .map(|v| fields::optional_in_range("amount_paid", v, 0.0, MAX_AMOUNT))
                    .transpose()?,
            )
            .set_some("assigned_to", self.assigned_to);
        Ok(values)
    }
}

impl EntityWrite for Clients {
    type New = NewClient;
    type Patch = ClientPatch;
}

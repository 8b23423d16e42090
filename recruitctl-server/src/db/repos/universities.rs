//! Universities

use chrono::{DateTime, Utc};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::{DbError, Entity, EntityWrite, Payload, Values};
use crate::models::fields::{self, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub struct Universities;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct University {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub region: Option<String>,
    pub division: Option<String>,
    pub conference: Option<String>,
    pub acceptance_rate: Option<f64>,
    pub in_state_tuition: Option<i32>,
    pub out_state_tuition: Option<i32>,
    pub undergrad_enrollment: Option<i32>,
    pub us_news_ranking: Option<i32>,
    pub website: Option<String>,
    pub program_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Universities {
    type Row = University;

    const TABLE: &'static str = "universities";
    const RESOURCE: &'static str = "university";
    const FROM: &'static str = "universities t";
    const SELECT: &'static str = "t.id, t.name, t.city, t.state, t.region, t.division, \
        t.conference, t.acceptance_rate, t.in_state_tuition, t.out_state_tuition, \
        t.undergrad_enrollment, t.us_news_ranking, t.website, \
        (SELECT COUNT(*) FROM programs p WHERE p.university_id = t.id AND p.is_deleted = FALSE) \
        AS program_count, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("name", "t.name"),
        ColumnDef::text("city", "t.city"),
        ColumnDef::select("state", "t.state"),
        ColumnDef::select("region", "t.region"),
        ColumnDef::select("division", "t.division"),
        ColumnDef::select("conference", "t.conference"),
        ColumnDef::number("acceptance_rate", "t.acceptance_rate"),
        ColumnDef::number("in_state_tuition", "t.in_state_tuition"),
        ColumnDef::number("out_state_tuition", "t.out_state_tuition"),
        ColumnDef::number("undergrad_enrollment", "t.undergrad_enrollment"),
        ColumnDef::number("us_news_ranking", "t.us_news_ranking"),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const DEFAULT_SORT: &'static str = "t.name ASC";
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUniversity {
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub region: Option<String>,
    pub division: Option<String>,
    pub conference: Option<String>,
    pub acceptance_rate: Option<f64>,
    pub in_state_tuition: Option<i32>,
    pub out_state_tuition: Option<i32>,
    pub undergrad_enrollment: Option<i32>,
    pub us_news_ranking: Option<i32>,
    pub website: Option<String>,
}

impl Payload for NewUniversity {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set("name", fields::required_text("name", &self.name, MAX_TEXT)?)
            .set("city", fields::optional_text("city", self.city, MAX_TEXT)?)
            .set("state", fields::optional_text("state", self.state, MAX_TEXT)?)
            .set("region", fields::optional_text("region", self.region, MAX_TEXT)?)
            .set("division", fields::optional_text("division", self.division, MAX_TEXT)?)
            .set("conference", fields::optional_text("conference", self.conference, MAX_TEXT)?)
            .set("acceptance_rate", acceptance_rate(self.acceptance_rate)?)
            .set("in_state_tuition", non_negative("in_state_tuition", self.in_state_tuition)?)
            .set("out_state_tuition", non_negative("out_state_tuition", self.out_state_tuition)?)
            .set(
                "undergrad_enrollment",
                non_negative("undergrad_enrollment", self.undergrad_enrollment)?,
            )
            .set("us_news_ranking", non_negative("us_news_ranking", self.us_news_ranking)?)
            .set("website", fields::optional_text("website", self.website, MAX_TEXT)?);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UniversityPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub region: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub division: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub conference: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub acceptance_rate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub in_state_tuition: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub out_state_tuition: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub undergrad_enrollment: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub us_news_ranking: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub website: Option<Option<String>>,
}

impl Payload for UniversityPatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        let text = |field, v: Option<Option<String>>| {
            v.map(|v| fields::optional_text(field, v, MAX_TEXT)).transpose()
        };
        let count = |field, v: Option<Option<i32>>| v.map(|v| non_negative(field, v)).transpose();

        let mut values = Values::new();
        values
            .set_some(
                "name",
                self.name
                    .map(|n| fields::required_text("name", &n, MAX_TEXT))
                    .transpose()?,
            )
            .set_some("city", text("city", self.city)?)
            .set_some("state", text("state", self.state)?)
            .set_some("region", text("region", self.region)?)
            .set_some("division", text("division", self.division)?)
            .set_some("conference", text("conference", self.conference)?)
            .set_some(
                "acceptance_rate",
                self.acceptance_rate.map(acceptance_rate).transpose()?,
            )
            .set_some("in_state_tuition", count("in_state_tuition", self.in_state_tuition)?)
            .set_some("out_state_tuition", count("out_state_tuition", self.out_state_tuition)?)
            .set_some(
                "undergrad_enrollment",
                count("undergrad_enrollment", self.undergrad_enrollment)?,
            )
            .set_some("us_news_ranking", count("us_news_ranking", self.us_news_ranking)?)
            .set_some("website", text("website", self.website)?);
        Ok(values)
    }
}

/// Stored as a percentage; a fraction such as `0.45` is scaled to `45`.
fn acceptance_rate(rate: Option<f64>) -> Result<Option<f64>, ValidationError> {
    let rate = rate.map(|r| if r > 0.0 && r <= 1.0 { r * 100.0 } else { r });
    fields::optional_in_range("acceptance_rate", rate, 0.0, 100.0)
}

fn non_negative(field: &'static str, value: Option<i32>) -> Result<Option<i32>, ValidationError> {
    fields::optional_in_range(field, value, 0, i32::MAX)
}

impl EntityWrite for Universities {
    type New = NewUniversity;
    type Patch = UniversityPatch;
}

/// Live university id by case-insensitive name.
pub async fn find_id_by_name(pool: &PgPool, name: &str) -> Result<Option<Uuid>, DbError> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM universities
        WHERE LOWER(name) = LOWER($1) AND is_deleted = FALSE
        ORDER BY created_at
        LIMIT 1
        "#,
    )
    .bind(name.trim())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id,)| id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;

    #[test]
    fn new_university_validates() {
        let new: NewUniversity = serde_json::from_value(serde_json::json!({
            "name": "  State University ",
            "acceptance_rate": 0.45,
            "state": " "
        }))
        .unwrap();
        let values = new.into_values().unwrap();
        assert_eq!(
            values.get("name"),
            Some(&SqlValue::Text(Some("State University".into())))
        );
        assert_eq!(values.get("acceptance_rate"), Some(&SqlValue::Float(Some(45.0))));
        assert_eq!(values.get("state"), Some(&SqlValue::Text(None)));
    }

    #[test]
    fn negative_tuition_rejected() {
        let new: NewUniversity =
            serde_json::from_value(serde_json::json!({"name": "U", "in_state_tuition": -1}))
                .unwrap();
        assert!(matches!(
            new.into_values(),
            Err(ValidationError::OutOfRange { field: "in_state_tuition", .. })
        ));
    }

    #[test]
    fn patch_only_sets_present_fields() {
        let patch: UniversityPatch =
            serde_json::from_value(serde_json::json!({"division": null, "city": "Austin"}))
                .unwrap();
        let values = patch.into_values().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("division"), Some(&SqlValue::Text(None)));
        assert!(!values.contains("name"));
    }
}

//! Ball knowledge: free-form notes about universities and coaches

use chrono::{DateTime, Utc};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{Entity, EntityWrite, Payload, Values};
use crate::models::fields::{self, MAX_LONG_TEXT, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub struct BallKnowledge;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct KnowledgeNote {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub university_id: Option<Uuid>,
    pub university_name: Option<String>,
    pub coach_id: Option<Uuid>,
    pub coach_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for BallKnowledge {
    type Row = KnowledgeNote;

    const TABLE: &'static str = "ball_knowledge";
    const RESOURCE: &'static str = "ball knowledge note";
    const FROM: &'static str = "ball_knowledge t \
        LEFT JOIN universities u ON u.id = t.university_id \
        LEFT JOIN coaches c ON c.id = t.coach_id";
    const SELECT: &'static str = "t.id, t.title, t.content, t.tags, t.source, \
        t.university_id, u.name AS university_name, t.coach_id, c.full_name AS coach_name, \
        t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("title", "t.title"),
        ColumnDef::text("content", "t.content"),
        ColumnDef::multi_select("tags", "t.tags"),
        ColumnDef::select("source", "t.source"),
        ColumnDef::text("university_name", "u.name"),
        ColumnDef::text("coach_name", "c.full_name"),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const REFERENCES: &'static [(&'static str, &'static str)] = &[
        ("university_id", "universities"),
        ("coach_id", "coaches"),
    ];
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewKnowledgeNote {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub university_id: Option<Uuid>,
    pub coach_id: Option<Uuid>,
}

impl Payload for NewKnowledgeNote {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set("title", fields::required_text("title", &self.title, MAX_TEXT)?)
            .set("content", fields::required_text("content", &self.content, MAX_LONG_TEXT)?)
            .set("tags", fields::text_list(self.tags))
            .set("source", fields::optional_text("source", self.source, MAX_TEXT)?)
            .set("university_id", self.university_id)
            .set("coach_id", self.coach_id);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeNotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub source: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub university_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub coach_id: Option<Option<Uuid>>,
}

impl Payload for KnowledgeNotePatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set_some(
                "title",
                self.title
                    .map(|v| fields::required_text("title", &v, MAX_TEXT))
                    .transpose()?,
            )
            .set_some(
                "content",
                self.content
                    .map(|v| fields::required_text("content", &v, MAX_LONG_TEXT))
                    .transpose()?,
            )
            .set_some("tags", self.tags.map(fields::text_list))
            .set_some(
                "source",
                self.source
                    .map(|v| fields::optional_text("source", v, MAX_TEXT))
                    .transpose()?,
            )
            .set_some("university_id", self.university_id)
            .set_some("coach_id", self.coach_id);
        Ok(values)
    }
}

impl EntityWrite for BallKnowledge {
    type New = NewKnowledgeNote;
    type Patch = KnowledgeNotePatch;
}

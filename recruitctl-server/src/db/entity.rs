//! Generic entity repository
//!
//! Every table shares the same lifecycle: insert, update, soft delete, and
//! a filtered list that never shows soft-deleted rows. An `Entity` describes
//! one table (its FROM clause with joins, its SELECT list, its filterable
//! columns) and `EntityRepo` runs the shared queries against it.
//!
//! Entity-specific invariants live in the per-entity repos under `repos/`,
//! which run their pre-checks inside the same transaction as the write.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use recruitctl_core::facets::facet_columns;
use recruitctl_core::filters::{compile, compile_sort, without_column, FilterError, Predicate};
use recruitctl_core::{Facet, FacetMap, FacetRequest, FacetStrategy, ListQuery};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::query::{push_order_by, push_where};
use crate::models::{Paginated, Pagination, ValidationError};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {message}")]
    Conflict {
        resource: &'static str,
        message: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error() {
            if db.is_unique_violation() {
                return Self::Conflict {
                    resource: "record",
                    message: format!(
                        "duplicate value violates {}",
                        db.constraint().unwrap_or("a unique constraint")
                    ),
                };
            }
            if db.is_foreign_key_violation() {
                return Self::Conflict {
                    resource: "record",
                    message: "referenced record does not exist".to_string(),
                };
            }
        }
        Self::Sqlx(e)
    }
}

impl DbError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// One table exposed through the generic repository.
pub trait Entity: Send + Sync + 'static {
    /// Row as returned by list and get, joins included
    type Row: for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static;

    /// Base table; aliased `t` in `FROM`
    const TABLE: &'static str;
    /// Name used in not-found errors
    const RESOURCE: &'static str;
    /// `FROM` body, base table first as `t`
    const FROM: &'static str;
    /// Select list producing `Row`
    const SELECT: &'static str;
    /// Filterable, sortable, searchable and facetable columns
    const COLUMNS: &'static [recruitctl_core::ColumnDef];
    /// Tie-breaker ordering after the requested sort
    const DEFAULT_SORT: &'static str = "t.created_at DESC";
    /// Foreign key columns and the tables they point at; checked on write
    const REFERENCES: &'static [(&'static str, &'static str)] = &[];
}

/// Create and patch payloads of an entity, plus its write hooks.
///
/// The default hooks are plain insert/update; entities with invariants
/// override them and run their checks in the write transaction.
#[async_trait]
pub trait EntityWrite: Entity + Sized {
    type New: Payload;
    type Patch: Payload;

    async fn create(repo: &EntityRepo<'_, Self>, new: Self::New) -> Result<Self::Row, DbError> {
        repo.insert(new.into_values()?).await
    }

    async fn update(
        repo: &EntityRepo<'_, Self>,
        id: Uuid,
        patch: Self::Patch,
    ) -> Result<Self::Row, DbError> {
        repo.update(id, patch.into_values()?).await
    }
}

/// A request body that validates into column values.
pub trait Payload: DeserializeOwned + Send + 'static {
    fn into_values(self) -> Result<Values, ValidationError>;
}

/// A bindable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Int(Option<i32>),
    Float(Option<f64>),
    Bool(Option<bool>),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
    Uuid(Option<Uuid>),
    TextArray(Vec<String>),
}

impl SqlValue {
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(id) => *id,
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => *b,
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => *d,
            _ => None,
        }
    }

    pub fn push_bind(self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Self::Text(v) => builder.push_bind(v),
            Self::Int(v) => builder.push_bind(v),
            Self::Float(v) => builder.push_bind(v),
            Self::Bool(v) => builder.push_bind(v),
            Self::Date(v) => builder.push_bind(v),
            Self::Timestamp(v) => builder.push_bind(v),
            Self::Uuid(v) => builder.push_bind(v),
            Self::TextArray(v) => builder.push_bind(v),
        };
    }
}

macro_rules! sql_value_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for SqlValue {
            fn from(v: $ty) -> Self {
                Self::$variant(Some(v))
            }
        }
        impl From<Option<$ty>> for SqlValue {
            fn from(v: Option<$ty>) -> Self {
                Self::$variant(v)
            }
        }
    };
}

sql_value_from!(Text, String);
sql_value_from!(Int, i32);
sql_value_from!(Float, f64);
sql_value_from!(Bool, bool);
sql_value_from!(Date, NaiveDate);
sql_value_from!(Timestamp, DateTime<Utc>);
sql_value_from!(Uuid, Uuid);

impl From<Vec<String>> for SqlValue {
    fn from(v: Vec<String>) -> Self {
        Self::TextArray(v)
    }
}

/// Column values for one insert or update, in payload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values(Vec<(&'static str, SqlValue)>);

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        let value = value.into();
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
        self
    }

    /// Set only when the patch carries the field.
    pub fn set_some<V: Into<SqlValue>>(
        &mut self,
        column: &'static str,
        value: Option<V>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(c, _)| *c)
    }
}

impl IntoIterator for Values {
    type Item = (&'static str, SqlValue);
    type IntoIter = std::vec::IntoIter<(&'static str, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Fail with `UnknownReference` unless `table` has a live row `id`.
pub async fn require_live(
    conn: &mut PgConnection,
    field: &'static str,
    table: &'static str,
    id: Uuid,
) -> Result<(), DbError> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND is_deleted = FALSE)",
        table
    );
    let (exists,): (bool,) = sqlx::query_as(&sql).bind(id).fetch_one(&mut *conn).await?;
    if !exists {
        return Err(ValidationError::UnknownReference { field, id }.into());
    }
    Ok(())
}

/// Generic repository over one entity
pub struct EntityRepo<'a, E> {
    pool: &'a PgPool,
    entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> EntityRepo<'a, E> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            entity: PhantomData,
        }
    }

    pub fn pool(&self) -> &'a PgPool {
        self.pool
    }

    fn select_from() -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("SELECT ");
        builder.push(E::SELECT);
        builder.push(" FROM ");
        builder.push(E::FROM);
        builder
    }

    /// Live row with joins.
    pub async fn get(&self, id: Uuid) -> Result<E::Row, DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_in(&mut conn, id).await
    }

    /// Live row with joins, on an open connection or transaction.
    pub async fn fetch_in(conn: &mut PgConnection, id: Uuid) -> Result<E::Row, DbError> {
        let mut builder = Self::select_from();
        builder.push(" WHERE t.is_deleted = FALSE AND t.id = ");
        builder.push_bind(id);

        builder
            .build_query_as::<E::Row>()
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(E::RESOURCE, id))
    }

    /// Filtered, searched, sorted and paginated list.
    ///
    /// `COUNT(*) OVER()` carries the total alongside the page; an empty page
    /// past the first falls back to a separate count.
    pub async fn list(&self, query: &ListQuery) -> Result<Paginated<E::Row>, DbError> {
        let predicates = compile(E::COLUMNS, &query.filters)?;
        let sort = compile_sort(E::COLUMNS, &query.sort)?;
        let page = Pagination::from_parts(query.page, query.per_page);

        let mut builder = QueryBuilder::new("SELECT ");
        builder.push(E::SELECT);
        builder.push(", COUNT(*) OVER() AS total_count FROM ");
        builder.push(E::FROM);
        push_where(&mut builder, &predicates, E::COLUMNS, query.search_term());
        push_order_by(&mut builder, &sort, E::DEFAULT_SORT);
        builder.push(" LIMIT ");
        builder.push_bind(page.limit());
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        let rows = builder.build().fetch_all(self.pool).await?;
        let total = match rows.first() {
            Some(row) => row.try_get::<i64, _>("total_count")?,
            None if page.offset() > 0 => {
                self.count(&predicates, query.search_term()).await?
            }
            None => 0,
        };
        let items = rows
            .iter()
            .map(E::Row::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            entity = E::TABLE,
            filters = predicates.len(),
            total,
            "listed rows"
        );
        Ok(Paginated::new(items, total, page))
    }

    /// Matching row count, for pages past the end where the window total is absent.
    async fn count(&self, predicates: &[Predicate], search: Option<&str>) -> Result<i64, DbError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM ");
        builder.push(E::FROM);
        push_where(&mut builder, predicates, E::COLUMNS, search);
        let (total,) = builder
            .build_query_as::<(i64,)>()
            .fetch_one(self.pool)
            .await?;
        Ok(total)
    }

    /// Facet counts and ranges, each computed without its own column's filter.
    pub async fn facets(&self, request: &FacetRequest) -> Result<FacetMap, DbError> {
        let predicates = compile(E::COLUMNS, &request.filters)?;
        let columns = facet_columns(E::COLUMNS, &request.columns)?;
        let search = request
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut facets = FacetMap::new();
        for column in columns {
            let others = without_column(&predicates, column.id);
            let facet = self.facet(&column, &others, search).await?;
            facets.insert(column.id.to_string(), facet);
        }
        Ok(facets)
    }

    async fn facet(
        &self,
        column: &recruitctl_core::ColumnDef,
        predicates: &[Predicate],
        search: Option<&str>,
    ) -> Result<Facet, DbError> {
        let mut builder = QueryBuilder::new("SELECT ");
        match FacetStrategy::for_kind(column.kind) {
            FacetStrategy::Counts => {
                builder.push(format!("({})::text AS value, COUNT(*) AS n FROM ", column.expr));
                builder.push(E::FROM);
                push_where(&mut builder, predicates, E::COLUMNS, search);
                builder.push(" GROUP BY 1");
            }
            FacetStrategy::UnnestCounts => {
                builder.push("facet.value::text AS value, COUNT(*) AS n FROM ");
                builder.push(E::FROM);
                builder.push(format!(
                    " CROSS JOIN LATERAL unnest({}) AS facet(value)",
                    column.expr
                ));
                push_where(&mut builder, predicates, E::COLUMNS, search);
                builder.push(" GROUP BY 1");
            }
            FacetStrategy::Range => {
                builder.push(format!(
                    "to_jsonb(MIN({expr})) AS min, to_jsonb(MAX({expr})) AS max FROM ",
                    expr = column.expr
                ));
                builder.push(E::FROM);
                push_where(&mut builder, predicates, E::COLUMNS, search);

                let (min, max): (Option<serde_json::Value>, Option<serde_json::Value>) =
                    builder.build_query_as().fetch_one(self.pool).await?;
                return Ok(Facet::Range { min, max });
            }
        }

        let rows: Vec<(Option<String>, i64)> =
            builder.build_query_as().fetch_all(self.pool).await?;
        Ok(Facet::from_counts(rows))
    }

    /// Insert and return the re-read row.
    pub async fn insert(&self, values: Values) -> Result<E::Row, DbError> {
        let mut tx = self.pool.begin().await?;
        let id = Self::insert_in(&mut tx, values).await?;
        let row = Self::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Insert on an open transaction; checks references first.
    pub async fn insert_in(conn: &mut PgConnection, values: Values) -> Result<Uuid, DbError> {
        if values.is_empty() {
            return Err(ValidationError::NoChanges.into());
        }
        Self::check_references(conn, &values).await?;

        let mut builder = QueryBuilder::new(format!("INSERT INTO {} (", E::TABLE));
        let mut columns = builder.separated(", ");
        for column in values.columns() {
            columns.push(column);
        }
        builder.push(") VALUES (");
        let mut first = true;
        for (_, value) in values {
            if !first {
                builder.push(", ");
            }
            first = false;
            value.push_bind(&mut builder);
        }
        builder.push(") RETURNING id");

        let (id,): (Uuid,) = builder.build_query_as().fetch_one(&mut *conn).await?;
        tracing::info!(entity = E::TABLE, %id, "inserted row");
        Ok(id)
    }

    /// Update a live row and return the re-read row.
    pub async fn update(&self, id: Uuid, values: Values) -> Result<E::Row, DbError> {
        let mut tx = self.pool.begin().await?;
        Self::update_in(&mut tx, id, values).await?;
        let row = Self::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Update on an open transaction. An empty update is rejected.
    pub async fn update_in(
        conn: &mut PgConnection,
        id: Uuid,
        values: Values,
    ) -> Result<(), DbError> {
        if values.is_empty() {
            return Err(ValidationError::NoChanges.into());
        }
        Self::check_references(conn, &values).await?;

        let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", E::TABLE));
        for (column, value) in values {
            builder.push(column);
            builder.push(" = ");
            value.push_bind(&mut builder);
            builder.push(", ");
        }
        builder.push("updated_at = NOW() WHERE is_deleted = FALSE AND id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(E::RESOURCE, id));
        }
        tracing::info!(entity = E::TABLE, %id, "updated row");
        Ok(())
    }

    /// Soft delete. Deleting an already-deleted row is not-found.
    pub async fn soft_delete(&self, id: Uuid) -> Result<(), DbError> {
        let sql = format!(
            "UPDATE {} SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND is_deleted = FALSE",
            E::TABLE
        );
        let result = sqlx::query(&sql).bind(id).execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(E::RESOURCE, id));
        }
        tracing::info!(entity = E::TABLE, %id, "soft-deleted row");
        Ok(())
    }

    async fn check_references(conn: &mut PgConnection, values: &Values) -> Result<(), DbError> {
        for &(column, table) in E::REFERENCES {
            if let Some(id) = values.get(column).and_then(SqlValue::as_uuid) {
                require_live(conn, column, table, id).await?;
            }
        }
        Ok(())
    }
}

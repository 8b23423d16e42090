//! Custom Axum extractors
//!
//! Rejections are turned into `ApiError` so malformed ids, bodies and
//! query strings get the same JSON error body as everything else.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::error::ApiError;

fn parse_uuid(field: &'static str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest {
        message: format!("{}: invalid UUID format", field),
    })
}

fn missing_path(field: &'static str) -> ApiError {
    ApiError::BadRequest {
        message: format!("{}: missing path parameter", field),
    }
}

/// Extract and validate a UUID from path
pub struct ValidUuid(pub Uuid);

impl<S> FromRequestParts<S> for ValidUuid
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| missing_path("id"))?;

        Ok(Self(parse_uuid("id", &id)?))
    }
}

/// Two UUIDs from a nested path such as `/contacts/{id}/athletes/{athlete_id}`
pub struct ValidUuidPair(pub Uuid, pub Uuid);

impl<S> FromRequestParts<S> for ValidUuidPair
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((first, second)): Path<(String, String)> =
            Path::from_request_parts(parts, state)
                .await
                .map_err(|_| missing_path("id"))?;

        Ok(Self(parse_uuid("id", &first)?, parse_uuid("athlete_id", &second)?))
    }
}

/// JSON body whose rejection is a 400 in the API error shape
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ApiError::BadRequest {
                message: e.body_text(),
            })?;
        Ok(Self(value))
    }
}

/// Query string whose rejection is a 400 in the API error shape
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| ApiError::BadRequest {
                message: e.body_text(),
            })?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_parse_error_names_field() {
        let err = parse_uuid("athlete_id", "not-a-uuid").err().unwrap();
        assert!(matches!(
            err,
            ApiError::BadRequest { message } if message == "athlete_id: invalid UUID format"
        ));
    }

    #[test]
    fn uuid_parses() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid("id", &id.to_string()).ok(), Some(id));
    }
}

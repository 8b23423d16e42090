//! Tri-state patch fields
//!
//! In a PATCH body an absent field leaves the column alone while an explicit
//! `null` clears it. Fields declared as
//! `#[serde(default, deserialize_with = "nullable")] Option<Option<T>>`
//! decode to `None` (absent), `Some(None)` (null) or `Some(Some(v))`.

use serde::{Deserialize, Deserializer};

pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

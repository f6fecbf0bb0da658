//! Schema definitions for Agentry SurrealDB tables
//!
//! Tables:
//! - candidates: imported candidate listings (unique source_url)
//! - attempts: contact attempt ledger (unique target_url + channel)
//! - opt_outs: do-not-contact domains (unique domain)
//! - invites: single-use invite tokens (unique token)
//! - principals: system identities (unique slug)
//!
//! Rows store enums as their snake_case string form; conversion to the
//! `storage_traits` types happens at the store boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Module for serializing chrono DateTime to SurrealDB datetime format
pub(crate) mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
pub(crate) mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

/// Row in the `candidates` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRow {
    pub candidate_id: String,
    pub source_url: String,
    pub name: String,
    pub description: Option<String>,
    pub skills: Vec<String>,
    pub endpoint_url: Option<String>,
    pub website_url: Option<String>,
    pub source_platform: String,
    pub source_data: serde_json::Value,
    pub status: String,
    #[serde(with = "surreal_datetime")]
    pub imported_at: DateTime<Utc>,
}

/// Row in the `attempts` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRow {
    pub attempt_id: String,
    pub candidate_id: String,
    pub target_name: String,
    pub target_url: String,
    pub contact_url: String,
    pub channel: String,
    pub attempt_number: u32,
    pub status: String,
    pub request_payload: serde_json::Value,
    pub response_payload: Option<serde_json::Value>,
    pub response_status: Option<u16>,
    pub error: Option<String>,
    #[serde(default, with = "surreal_datetime_opt")]
    pub next_retry_at: Option<DateTime<Utc>>,
    pub campaign: String,
    pub invite_token: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Row in the `opt_outs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptOutRow {
    pub domain: String,
    pub reason: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Row in the `invites` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteRow {
    pub token: String,
    pub campaign: String,
    pub agent_name: Option<String>,
    pub agent_data: Option<serde_json::Value>,
    pub max_uses: u32,
    pub used_count: u32,
    #[serde(default, with = "surreal_datetime_opt")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Row in the `principals` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalRow {
    pub principal_id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub skills: Vec<String>,
    pub protocols: Vec<String>,
    pub api_key_id: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

//! SurrealDB-backed implementation of the recruitment storage traits
//!
//! One `SurrealStore` handle implements `CandidateStore`, `AttemptLedger`,
//! `OptOutRegistry`, `InviteStore`, and `PrincipalRegistry`, converting
//! between `schema` rows and `storage_traits` types at the boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use surrealdb::engine::any::Any;
use surrealdb::sql::Datetime as SurrealDatetime;
use surrealdb::Surreal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StorageError;
use crate::migrations;
use crate::schema::{AttemptRow, CandidateRow, InviteRow, OptOutRow, PrincipalRow};
use crate::storage_traits::*;

/// SurrealDB-backed store for all recruitment persistence.
pub struct SurrealStore {
    db: Surreal<Any>,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

fn parse_status(raw: &str) -> StorageResult<AttemptStatus> {
    match raw {
        "pending" => Ok(AttemptStatus::Pending),
        "sent" => Ok(AttemptStatus::Sent),
        "delivered" => Ok(AttemptStatus::Delivered),
        "interested" => Ok(AttemptStatus::Interested),
        "registered" => Ok(AttemptStatus::Registered),
        "declined" => Ok(AttemptStatus::Declined),
        "failed" => Ok(AttemptStatus::Failed),
        "opted_out" => Ok(AttemptStatus::OptedOut),
        other => Err(StorageError::Backend(format!(
            "unknown attempt status: {other}"
        ))),
    }
}

fn parse_channel(raw: &str) -> StorageResult<ContactChannel> {
    raw.parse().map_err(StorageError::Backend)
}

fn parse_candidate_status(raw: &str) -> StorageResult<CandidateStatus> {
    match raw {
        "unclaimed" => Ok(CandidateStatus::Unclaimed),
        "claim_pending" => Ok(CandidateStatus::ClaimPending),
        "claimed" => Ok(CandidateStatus::Claimed),
        "rejected" => Ok(CandidateStatus::Rejected),
        other => Err(StorageError::Backend(format!(
            "unknown candidate status: {other}"
        ))),
    }
}

fn candidate_status_str(status: CandidateStatus) -> &'static str {
    match status {
        CandidateStatus::Unclaimed => "unclaimed",
        CandidateStatus::ClaimPending => "claim_pending",
        CandidateStatus::Claimed => "claimed",
        CandidateStatus::Rejected => "rejected",
    }
}

impl SurrealStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `agentry/main`, and runs `init_schema`.
    pub async fn in_memory() -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect("mem://")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        db.use_ns("agentry")
            .use_db("main")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealStore connected (in-memory)");
        Ok(Self { db })
    }

    /// Create from environment.
    ///
    /// Honors `SURREALDB_URL`; otherwise falls back to local persistence
    /// under `.agentry/db` via surrealkv.
    pub async fn from_env() -> StorageResult<Self> {
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            let db = surrealdb::engine::any::connect(&url)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

            db.use_ns("agentry")
                .use_db("main")
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

            migrations::init_schema(&db).await?;
            info!("SurrealStore connected ({})", url);
            return Ok(Self { db });
        }

        let path = ".agentry/db";
        std::fs::create_dir_all(path).map_err(|e| {
            StorageError::Connection(format!("Failed to create database directory {path}: {e}"))
        })?;
        let url = format!("surrealkv://{path}");
        info!("No SURREALDB_URL found, using local persistence: {}", url);

        let db = surrealdb::engine::any::connect(&url)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect to {url}: {e}")))?;

        db.use_ns("agentry")
            .use_db("main")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        Ok(Self { db })
    }

    // -- row conversions -----------------------------------------------------

    fn row_to_candidate(row: CandidateRow) -> StorageResult<Candidate> {
        Ok(Candidate {
            id: row.candidate_id,
            source_url: row.source_url,
            name: row.name,
            description: row.description,
            skills: row.skills,
            endpoint_url: row.endpoint_url,
            website_url: row.website_url,
            source_platform: row.source_platform,
            source_data: row.source_data,
            status: parse_candidate_status(&row.status)?,
            imported_at: row.imported_at,
        })
    }

    fn row_to_attempt(row: AttemptRow) -> StorageResult<AttemptRecord> {
        Ok(AttemptRecord {
            id: row.attempt_id,
            candidate_id: row.candidate_id,
            target_name: row.target_name,
            target_url: row.target_url,
            contact_url: row.contact_url,
            channel: parse_channel(&row.channel)?,
            attempt_number: row.attempt_number,
            status: parse_status(&row.status)?,
            request_payload: row.request_payload,
            response_payload: row.response_payload,
            response_status: row.response_status,
            error: row.error,
            next_retry_at: row.next_retry_at,
            campaign: row.campaign,
            invite_token: row.invite_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn row_to_invite(row: InviteRow) -> InviteRecord {
        InviteRecord {
            token: row.token,
            campaign: row.campaign,
            agent_name: row.agent_name,
            agent_data: row.agent_data,
            max_uses: row.max_uses,
            used_count: row.used_count,
            expires_at: row.expires_at,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }

    fn row_to_principal(row: PrincipalRow) -> PrincipalRecord {
        PrincipalRecord {
            id: row.principal_id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            skills: row.skills,
            protocols: row.protocols,
            api_key_id: row.api_key_id,
            created_at: row.created_at,
        }
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_candidate_by_source(
        &self,
        source_url: &str,
    ) -> StorageResult<Option<CandidateRow>> {
        let url_owned = source_url.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM candidates WHERE source_url = $url")
            .bind(("url", url_owned))
            .await?;
        let rows: Vec<CandidateRow> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_attempt_row(
        &self,
        target_url: &str,
        channel: ContactChannel,
    ) -> StorageResult<Option<AttemptRow>> {
        let url_owned = target_url.to_string();
        let channel_owned = channel.as_str().to_string();
        let mut res = self
            .db
            .query("SELECT * FROM attempts WHERE target_url = $url AND channel = $channel")
            .bind(("url", url_owned))
            .bind(("channel", channel_owned))
            .await?;
        let rows: Vec<AttemptRow> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn group_counts(&self, column: &str) -> StorageResult<std::collections::BTreeMap<String, u64>> {
        #[derive(Debug, Deserialize)]
        struct GroupRow {
            key: String,
            count: u64,
        }

        let sql = format!("SELECT {column} AS key, count() AS count FROM attempts GROUP BY key");
        let mut res = self.db.query(sql).await?;
        let rows: Vec<GroupRow> = res.take(0)?;
        Ok(rows.into_iter().map(|r| (r.key, r.count)).collect())
    }
}

#[async_trait]
impl CandidateStore for SurrealStore {
    async fn upsert(&self, draft: CandidateDraft) -> StorageResult<Candidate> {
        let existing = self.fetch_candidate_by_source(&draft.source_url).await?;

        let row = match existing {
            Some(prev) => CandidateRow {
                name: draft.name,
                description: draft.description,
                skills: draft.skills,
                endpoint_url: draft.endpoint_url,
                website_url: draft.website_url,
                source_platform: draft.source_platform,
                source_data: draft.source_data,
                ..prev
            },
            None => CandidateRow {
                candidate_id: Uuid::new_v4().to_string(),
                source_url: draft.source_url.clone(),
                name: draft.name,
                description: draft.description,
                skills: draft.skills,
                endpoint_url: draft.endpoint_url,
                website_url: draft.website_url,
                source_platform: draft.source_platform,
                source_data: draft.source_data,
                status: candidate_status_str(CandidateStatus::Unclaimed).to_string(),
                imported_at: Utc::now(),
            },
        };

        debug!(source_url = %row.source_url, "upserting candidate");

        let url_owned = row.source_url.clone();
        self.db
            .query("DELETE FROM candidates WHERE source_url = $url")
            .bind(("url", url_owned))
            .await?;
        let _created: Option<CandidateRow> = self.db.create("candidates").content(row.clone()).await?;

        Self::row_to_candidate(row)
    }

    async fn get(&self, id: &str) -> StorageResult<Candidate> {
        let id_owned = id.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM candidates WHERE candidate_id = $id")
            .bind(("id", id_owned))
            .await?;
        let rows: Vec<CandidateRow> = res.take(0)?;
        rows.into_iter()
            .next()
            .map(Self::row_to_candidate)
            .transpose()?
            .ok_or_else(|| StorageError::CandidateNotFound { id: id.to_string() })
    }

    async fn list_unclaimed(&self, filter: CandidateFilter) -> StorageResult<Vec<Candidate>> {
        let mut sql = String::from("SELECT * FROM candidates WHERE status = 'unclaimed'");
        if filter.source_platform.is_some() {
            sql.push_str(" AND source_platform = $platform");
        }
        if filter.ids.is_some() {
            sql.push_str(" AND candidate_id IN $ids");
        }
        sql.push_str(" ORDER BY imported_at DESC LIMIT $limit");

        let mut query = self.db.query(sql).bind(("limit", filter.limit as i64));
        if let Some(platform) = filter.source_platform {
            query = query.bind(("platform", platform));
        }
        if let Some(ids) = filter.ids {
            query = query.bind(("ids", ids));
        }

        let mut res = query.await?;
        let rows: Vec<CandidateRow> = res.take(0)?;
        rows.into_iter().map(Self::row_to_candidate).collect()
    }
}

#[async_trait]
impl AttemptLedger for SurrealStore {
    async fn find(
        &self,
        target_url: &str,
        channel: ContactChannel,
    ) -> StorageResult<Option<AttemptRecord>> {
        self.fetch_attempt_row(target_url, channel)
            .await?
            .map(Self::row_to_attempt)
            .transpose()
    }

    async fn upsert(&self, draft: AttemptDraft) -> StorageResult<AttemptRecord> {
        let existing = self.fetch_attempt_row(&draft.target_url, draft.channel).await?;
        let now = Utc::now();

        let row = match existing {
            Some(prev) => AttemptRow {
                attempt_id: prev.attempt_id.clone(),
                candidate_id: draft.candidate_id,
                target_name: draft.target_name,
                target_url: draft.target_url,
                contact_url: draft.contact_url,
                channel: draft.channel.as_str().to_string(),
                attempt_number: prev.attempt_number + 1,
                status: draft.status.as_str().to_string(),
                request_payload: draft.request_payload,
                response_payload: draft.response_payload,
                response_status: draft.response_status,
                error: draft.error,
                next_retry_at: draft.next_retry_at,
                campaign: draft.campaign,
                invite_token: draft.invite_token,
                created_at: prev.created_at,
                updated_at: now,
            },
            None => AttemptRow {
                attempt_id: Uuid::new_v4().to_string(),
                candidate_id: draft.candidate_id,
                target_name: draft.target_name,
                target_url: draft.target_url,
                contact_url: draft.contact_url,
                channel: draft.channel.as_str().to_string(),
                attempt_number: 1,
                status: draft.status.as_str().to_string(),
                request_payload: draft.request_payload,
                response_payload: draft.response_payload,
                response_status: draft.response_status,
                error: draft.error,
                next_retry_at: draft.next_retry_at,
                campaign: draft.campaign,
                invite_token: draft.invite_token,
                created_at: now,
                updated_at: now,
            },
        };

        debug!(
            target_url = %row.target_url,
            channel = %row.channel,
            attempt = row.attempt_number,
            status = %row.status,
            "upserting attempt",
        );

        let id_owned = row.attempt_id.clone();
        self.db
            .query("DELETE FROM attempts WHERE attempt_id = $id")
            .bind(("id", id_owned))
            .await?;
        let _created: Option<AttemptRow> = self.db.create("attempts").content(row.clone()).await?;

        Self::row_to_attempt(row)
    }

    async fn count_active_since(&self, since: DateTime<Utc>) -> StorageResult<u64> {
        let mut res = self
            .db
            .query(
                "SELECT count() AS count FROM attempts \
                 WHERE created_at >= $since AND status != 'pending' GROUP ALL",
            )
            .bind(("since", SurrealDatetime::from(since)))
            .await?;
        let rows: Vec<CountRow> = res.take(0)?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0))
    }

    async fn contacts_since(
        &self,
        since: DateTime<Utc>,
        statuses: &[AttemptStatus],
    ) -> StorageResult<Vec<ContactedRef>> {
        let status_strs: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let mut res = self
            .db
            .query(
                "SELECT target_url, contact_url FROM attempts \
                 WHERE created_at >= $since AND status IN $statuses",
            )
            .bind(("since", SurrealDatetime::from(since)))
            .bind(("statuses", status_strs))
            .await?;
        let refs: Vec<ContactedRef> = res.take(0)?;
        Ok(refs)
    }

    async fn target_contacted_since(
        &self,
        target_url: &str,
        since: DateTime<Utc>,
        statuses: &[AttemptStatus],
    ) -> StorageResult<bool> {
        let status_strs: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let url_owned = target_url.to_string();
        let mut res = self
            .db
            .query(
                "SELECT count() AS count FROM attempts \
                 WHERE target_url = $url AND created_at >= $since AND status IN $statuses \
                 GROUP ALL",
            )
            .bind(("url", url_owned))
            .bind(("since", SurrealDatetime::from(since)))
            .bind(("statuses", status_strs))
            .await?;
        let rows: Vec<CountRow> = res.take(0)?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0) > 0)
    }

    async fn retire_domain(&self, domain: &str, note: &str) -> StorageResult<u64> {
        let domain_owned = domain.to_string();
        let note_owned = note.to_string();
        let mut res = self
            .db
            .query(
                "UPDATE attempts SET \
                     status = 'opted_out', \
                     next_retry_at = NONE, \
                     error = $note, \
                     updated_at = $now \
                 WHERE status != 'opted_out' \
                   AND (string::contains(target_url, $domain) \
                        OR string::contains(contact_url, $domain)) \
                 RETURN AFTER",
            )
            .bind(("note", note_owned))
            .bind(("now", SurrealDatetime::from(Utc::now())))
            .bind(("domain", domain_owned))
            .await?;
        let rows: Vec<AttemptRow> = res.take(0)?;
        Ok(rows.len() as u64)
    }

    async fn stats(&self) -> StorageResult<LedgerStats> {
        let mut res = self
            .db
            .query("SELECT count() AS count FROM attempts GROUP ALL")
            .await?;
        let totals: Vec<CountRow> = res.take(0)?;

        Ok(LedgerStats {
            total: totals.first().map(|r| r.count).unwrap_or(0),
            by_status: self.group_counts("status").await?,
            by_channel: self.group_counts("channel").await?,
            by_campaign: self.group_counts("campaign").await?,
        })
    }

    async fn recent(&self, limit: usize) -> StorageResult<Vec<AttemptRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM attempts ORDER BY updated_at DESC LIMIT $limit")
            .bind(("limit", limit as i64))
            .await?;
        let rows: Vec<AttemptRow> = res.take(0)?;
        rows.into_iter().map(Self::row_to_attempt).collect()
    }
}

#[async_trait]
impl OptOutRegistry for SurrealStore {
    async fn add(&self, domain: &str, reason: Option<String>) -> StorageResult<OptOutRecord> {
        let existing = OptOutRegistry::get(self, domain).await?;
        let record = match existing {
            Some(prev) => OptOutRecord { reason, ..prev },
            None => OptOutRecord {
                domain: domain.to_string(),
                reason,
                created_at: Utc::now(),
            },
        };

        let row = OptOutRow {
            domain: record.domain.clone(),
            reason: record.reason.clone(),
            created_at: record.created_at,
        };
        let domain_owned = domain.to_string();
        self.db
            .query("DELETE FROM opt_outs WHERE domain = $domain")
            .bind(("domain", domain_owned))
            .await?;
        let _created: Option<OptOutRow> = self.db.create("opt_outs").content(row).await?;

        Ok(record)
    }

    async fn contains_any(&self, domains: &[String]) -> StorageResult<bool> {
        let domains_owned = domains.to_vec();
        let mut res = self
            .db
            .query("SELECT count() AS count FROM opt_outs WHERE domain IN $domains GROUP ALL")
            .bind(("domains", domains_owned))
            .await?;
        let rows: Vec<CountRow> = res.take(0)?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0) > 0)
    }

    async fn get(&self, domain: &str) -> StorageResult<Option<OptOutRecord>> {
        let domain_owned = domain.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM opt_outs WHERE domain = $domain")
            .bind(("domain", domain_owned))
            .await?;
        let rows: Vec<OptOutRow> = res.take(0)?;
        Ok(rows.into_iter().next().map(|r| OptOutRecord {
            domain: r.domain,
            reason: r.reason,
            created_at: r.created_at,
        }))
    }

    async fn list(&self) -> StorageResult<Vec<OptOutRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM opt_outs ORDER BY created_at DESC")
            .await?;
        let rows: Vec<OptOutRow> = res.take(0)?;
        Ok(rows
            .into_iter()
            .map(|r| OptOutRecord {
                domain: r.domain,
                reason: r.reason,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn remove(&self, domain: &str) -> StorageResult<bool> {
        let domain_owned = domain.to_string();
        let mut res = self
            .db
            .query("DELETE FROM opt_outs WHERE domain = $domain RETURN BEFORE")
            .bind(("domain", domain_owned))
            .await?;
        let rows: Vec<OptOutRow> = res.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn count(&self) -> StorageResult<u64> {
        let mut res = self
            .db
            .query("SELECT count() AS count FROM opt_outs GROUP ALL")
            .await?;
        let rows: Vec<CountRow> = res.take(0)?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0))
    }
}

#[async_trait]
impl InviteStore for SurrealStore {
    async fn create(&self, draft: InviteDraft) -> StorageResult<InviteRecord> {
        let row = InviteRow {
            token: draft.token,
            campaign: draft.campaign,
            agent_name: draft.agent_name,
            agent_data: draft.agent_data,
            max_uses: draft.max_uses,
            used_count: 0,
            expires_at: draft.expires_at,
            created_by: draft.created_by,
            created_at: Utc::now(),
        };

        let _created: Option<InviteRow> = self.db.create("invites").content(row.clone()).await?;
        Ok(Self::row_to_invite(row))
    }

    async fn get(&self, token: &str) -> StorageResult<Option<InviteRecord>> {
        let token_owned = token.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM invites WHERE token = $token")
            .bind(("token", token_owned))
            .await?;
        let rows: Vec<InviteRow> = res.take(0)?;
        Ok(rows.into_iter().next().map(Self::row_to_invite))
    }

    async fn redeem(&self, token: &str) -> StorageResult<InviteRecord> {
        let record = InviteStore::get(self, token)
            .await?
            .ok_or_else(|| StorageError::InviteNotFound {
                token: token.to_string(),
            })?;

        let expired = record
            .expires_at
            .map(|at| at <= Utc::now())
            .unwrap_or(false);
        if expired || record.used_count >= record.max_uses {
            return Err(StorageError::InviteExhausted {
                token: token.to_string(),
            });
        }

        let token_owned = token.to_string();
        let mut res = self
            .db
            .query("UPDATE invites SET used_count = used_count + 1 WHERE token = $token RETURN AFTER")
            .bind(("token", token_owned))
            .await?;
        let rows: Vec<InviteRow> = res.take(0)?;
        rows.into_iter()
            .next()
            .map(Self::row_to_invite)
            .ok_or_else(|| StorageError::InviteNotFound {
                token: token.to_string(),
            })
    }
}

#[async_trait]
impl PrincipalRegistry for SurrealStore {
    async fn ensure(&self, profile: &PrincipalProfile) -> StorageResult<EnsuredPrincipal> {
        let existing = PrincipalRegistry::get(self, &profile.slug).await?;

        if let Some(prev) = existing {
            let row = PrincipalRow {
                principal_id: prev.id,
                slug: prev.slug,
                name: profile.name.clone(),
                description: profile.description.clone(),
                skills: profile.skills.clone(),
                protocols: profile.protocols.clone(),
                api_key_id: prev.api_key_id,
                created_at: prev.created_at,
            };
            let slug_owned = profile.slug.clone();
            self.db
                .query("UPDATE principals CONTENT $row WHERE slug = $slug")
                .bind(("row", row.clone()))
                .bind(("slug", slug_owned))
                .await?;
            return Ok(EnsuredPrincipal {
                principal: Self::row_to_principal(row),
                minted_api_key: None,
            });
        }

        let row = PrincipalRow {
            principal_id: Uuid::new_v4().to_string(),
            slug: profile.slug.clone(),
            name: profile.name.clone(),
            description: profile.description.clone(),
            skills: profile.skills.clone(),
            protocols: profile.protocols.clone(),
            api_key_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        };
        let _created: Option<PrincipalRow> = self.db.create("principals").content(row.clone()).await?;

        Ok(EnsuredPrincipal {
            principal: Self::row_to_principal(row),
            minted_api_key: Some(format!("ak_{}", Uuid::new_v4().simple())),
        })
    }

    async fn get(&self, slug: &str) -> StorageResult<Option<PrincipalRecord>> {
        let slug_owned = slug.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM principals WHERE slug = $slug")
            .bind(("slug", slug_owned))
            .await?;
        let rows: Vec<PrincipalRow> = res.take(0)?;
        Ok(rows.into_iter().next().map(Self::row_to_principal))
    }
}

//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryCandidateStore`, `MemoryAttemptLedger`,
//! `MemoryOptOutRegistry`, `MemoryInviteStore`, and
//! `MemoryPrincipalRegistry` satisfying the trait contracts without any
//! external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryCandidateStore
// ---------------------------------------------------------------------------

/// In-memory candidate store keyed by `source_url`.
#[derive(Debug, Default)]
pub struct MemoryCandidateStore {
    rows: Mutex<HashMap<String, Candidate>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed candidate, bypassing the draft path.
    /// Useful for constructing historical fixtures in tests.
    pub fn seed(&self, candidate: Candidate) {
        let mut rows = self.rows.lock().unwrap();
        rows.insert(candidate.source_url.clone(), candidate);
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn upsert(&self, draft: CandidateDraft) -> StorageResult<Candidate> {
        let mut rows = self.rows.lock().unwrap();
        let candidate = match rows.get(&draft.source_url) {
            Some(existing) => Candidate {
                name: draft.name,
                description: draft.description,
                skills: draft.skills,
                endpoint_url: draft.endpoint_url,
                website_url: draft.website_url,
                source_platform: draft.source_platform,
                source_data: draft.source_data,
                ..existing.clone()
            },
            None => Candidate {
                id: Uuid::new_v4().to_string(),
                source_url: draft.source_url.clone(),
                name: draft.name,
                description: draft.description,
                skills: draft.skills,
                endpoint_url: draft.endpoint_url,
                website_url: draft.website_url,
                source_platform: draft.source_platform,
                source_data: draft.source_data,
                status: CandidateStatus::Unclaimed,
                imported_at: Utc::now(),
            },
        };
        rows.insert(candidate.source_url.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn get(&self, id: &str) -> StorageResult<Candidate> {
        let rows = self.rows.lock().unwrap();
        rows.values()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StorageError::CandidateNotFound { id: id.to_string() })
    }

    async fn list_unclaimed(&self, filter: CandidateFilter) -> StorageResult<Vec<Candidate>> {
        let rows = self.rows.lock().unwrap();
        let mut matched: Vec<Candidate> = rows
            .values()
            .filter(|c| c.status == CandidateStatus::Unclaimed)
            .filter(|c| {
                filter
                    .source_platform
                    .as_ref()
                    .map(|p| &c.source_platform == p)
                    .unwrap_or(true)
            })
            .filter(|c| {
                filter
                    .ids
                    .as_ref()
                    .map(|ids| ids.iter().any(|id| id == &c.id))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.imported_at.cmp(&a.imported_at));
        matched.truncate(filter.limit);
        Ok(matched)
    }
}

// ---------------------------------------------------------------------------
// MemoryAttemptLedger
// ---------------------------------------------------------------------------

/// In-memory attempt ledger keyed by (target_url, channel).
#[derive(Debug, Default)]
pub struct MemoryAttemptLedger {
    rows: Mutex<HashMap<(String, ContactChannel), AttemptRecord>>,
}

impl MemoryAttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed row, bypassing the upsert path. Useful for
    /// constructing ledger history with arbitrary timestamps in tests.
    pub fn seed(&self, record: AttemptRecord) {
        let mut rows = self.rows.lock().unwrap();
        rows.insert((record.target_url.clone(), record.channel), record);
    }

    /// Number of rows currently held. Test helper.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AttemptLedger for MemoryAttemptLedger {
    async fn find(
        &self,
        target_url: &str,
        channel: ContactChannel,
    ) -> StorageResult<Option<AttemptRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&(target_url.to_string(), channel)).cloned())
    }

    async fn upsert(&self, draft: AttemptDraft) -> StorageResult<AttemptRecord> {
        let mut rows = self.rows.lock().unwrap();
        let key = (draft.target_url.clone(), draft.channel);
        let now = Utc::now();
        let record = match rows.get(&key) {
            Some(existing) => AttemptRecord {
                id: existing.id.clone(),
                candidate_id: draft.candidate_id,
                target_name: draft.target_name,
                target_url: draft.target_url,
                contact_url: draft.contact_url,
                channel: draft.channel,
                attempt_number: existing.attempt_number + 1,
                status: draft.status,
                request_payload: draft.request_payload,
                response_payload: draft.response_payload,
                response_status: draft.response_status,
                error: draft.error,
                next_retry_at: draft.next_retry_at,
                campaign: draft.campaign,
                invite_token: draft.invite_token,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => AttemptRecord {
                id: Uuid::new_v4().to_string(),
                candidate_id: draft.candidate_id,
                target_name: draft.target_name,
                target_url: draft.target_url,
                contact_url: draft.contact_url,
                channel: draft.channel,
                attempt_number: 1,
                status: draft.status,
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
        rows.insert(key, record.clone());
        Ok(record)
    }

    async fn count_active_since(&self, since: chrono::DateTime<Utc>) -> StorageResult<u64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|r| r.created_at >= since && r.status != AttemptStatus::Pending)
            .count() as u64)
    }

    async fn contacts_since(
        &self,
        since: chrono::DateTime<Utc>,
        statuses: &[AttemptStatus],
    ) -> StorageResult<Vec<ContactedRef>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|r| r.created_at >= since && statuses.contains(&r.status))
            .map(|r| ContactedRef {
                target_url: r.target_url.clone(),
                contact_url: r.contact_url.clone(),
            })
            .collect())
    }

    async fn target_contacted_since(
        &self,
        target_url: &str,
        since: chrono::DateTime<Utc>,
        statuses: &[AttemptStatus],
    ) -> StorageResult<bool> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().any(|r| {
            r.target_url == target_url && r.created_at >= since && statuses.contains(&r.status)
        }))
    }

    async fn retire_domain(&self, domain: &str, note: &str) -> StorageResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut retired = 0;
        for record in rows.values_mut() {
            if record.status == AttemptStatus::OptedOut {
                continue;
            }
            if record.target_url.contains(domain) || record.contact_url.contains(domain) {
                record.status = AttemptStatus::OptedOut;
                record.next_retry_at = None;
                record.error = Some(note.to_string());
                record.updated_at = Utc::now();
                retired += 1;
            }
        }
        Ok(retired)
    }

    async fn stats(&self) -> StorageResult<LedgerStats> {
        let rows = self.rows.lock().unwrap();
        let mut stats = LedgerStats {
            total: rows.len() as u64,
            ..Default::default()
        };
        for record in rows.values() {
            *stats
                .by_status
                .entry(record.status.as_str().to_string())
                .or_default() += 1;
            *stats
                .by_channel
                .entry(record.channel.as_str().to_string())
                .or_default() += 1;
            *stats
                .by_campaign
                .entry(record.campaign.clone())
                .or_default() += 1;
        }
        Ok(stats)
    }

    async fn recent(&self, limit: usize) -> StorageResult<Vec<AttemptRecord>> {
        let rows = self.rows.lock().unwrap();
        let mut records: Vec<AttemptRecord> = rows.values().cloned().collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records.truncate(limit);
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// MemoryOptOutRegistry
// ---------------------------------------------------------------------------

/// In-memory opt-out registry keyed by normalized domain.
#[derive(Debug, Default)]
pub struct MemoryOptOutRegistry {
    rows: Mutex<HashMap<String, OptOutRecord>>,
}

impl MemoryOptOutRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OptOutRegistry for MemoryOptOutRegistry {
    async fn add(&self, domain: &str, reason: Option<String>) -> StorageResult<OptOutRecord> {
        let mut rows = self.rows.lock().unwrap();
        let record = match rows.get(domain) {
            Some(existing) => OptOutRecord {
                reason,
                ..existing.clone()
            },
            None => OptOutRecord {
                domain: domain.to_string(),
                reason,
                created_at: Utc::now(),
            },
        };
        rows.insert(domain.to_string(), record.clone());
        Ok(record)
    }

    async fn contains_any(&self, domains: &[String]) -> StorageResult<bool> {
        let rows = self.rows.lock().unwrap();
        Ok(domains.iter().any(|d| rows.contains_key(d)))
    }

    async fn get(&self, domain: &str) -> StorageResult<Option<OptOutRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(domain).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<OptOutRecord>> {
        let rows = self.rows.lock().unwrap();
        let mut records: Vec<OptOutRecord> = rows.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn remove(&self, domain: &str) -> StorageResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.remove(domain).is_some())
    }

    async fn count(&self) -> StorageResult<u64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// MemoryInviteStore
// ---------------------------------------------------------------------------

/// In-memory invite store keyed by token.
#[derive(Debug, Default)]
pub struct MemoryInviteStore {
    rows: Mutex<HashMap<String, InviteRecord>>,
}

impl MemoryInviteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invites minted so far. Test helper.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl InviteStore for MemoryInviteStore {
    async fn create(&self, draft: InviteDraft) -> StorageResult<InviteRecord> {
        let record = InviteRecord {
            token: draft.token.clone(),
            campaign: draft.campaign,
            agent_name: draft.agent_name,
            agent_data: draft.agent_data,
            max_uses: draft.max_uses,
            used_count: 0,
            expires_at: draft.expires_at,
            created_by: draft.created_by,
            created_at: Utc::now(),
        };
        let mut rows = self.rows.lock().unwrap();
        rows.insert(draft.token, record.clone());
        Ok(record)
    }

    async fn get(&self, token: &str) -> StorageResult<Option<InviteRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(token).cloned())
    }

    async fn redeem(&self, token: &str) -> StorageResult<InviteRecord> {
        let mut rows = self.rows.lock().unwrap();
        let record = rows
            .get_mut(token)
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
        record.used_count += 1;
        Ok(record.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryPrincipalRegistry
// ---------------------------------------------------------------------------

/// In-memory principal registry keyed by slug.
#[derive(Debug, Default)]
pub struct MemoryPrincipalRegistry {
    rows: Mutex<HashMap<String, PrincipalRecord>>,
}

impl MemoryPrincipalRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalRegistry for MemoryPrincipalRegistry {
    async fn ensure(&self, profile: &PrincipalProfile) -> StorageResult<EnsuredPrincipal> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.get_mut(&profile.slug) {
            existing.name = profile.name.clone();
            existing.description = profile.description.clone();
            existing.skills = profile.skills.clone();
            existing.protocols = profile.protocols.clone();
            return Ok(EnsuredPrincipal {
                principal: existing.clone(),
                minted_api_key: None,
            });
        }

        let record = PrincipalRecord {
            id: Uuid::new_v4().to_string(),
            slug: profile.slug.clone(),
            name: profile.name.clone(),
            description: profile.description.clone(),
            skills: profile.skills.clone(),
            protocols: profile.protocols.clone(),
            api_key_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        };
        rows.insert(profile.slug.clone(), record.clone());
        Ok(EnsuredPrincipal {
            principal: record,
            minted_api_key: Some(format!("ak_{}", Uuid::new_v4().simple())),
        })
    }

    async fn get(&self, slug: &str) -> StorageResult<Option<PrincipalRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(slug).cloned())
    }
}

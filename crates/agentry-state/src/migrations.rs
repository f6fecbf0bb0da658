//! SurrealDB schema migrations and initialization
//!
//! Sets up all recruitment tables with their uniqueness constraints and
//! indexes. The (target_url, channel) and domain uniqueness invariants
//! live here, in the store schema, not in application logic.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::storage_traits::StorageResult;

/// Initialize all Agentry tables in SurrealDB.
///
/// Called once on connection. Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing Agentry SurrealDB schema");

    init_candidates_table(db).await?;
    init_attempts_table(db).await?;
    init_opt_outs_table(db).await?;
    init_invites_table(db).await?;
    init_principals_table(db).await?;

    info!("Agentry schema initialization complete");
    Ok(())
}

async fn run(db: &Surreal<Any>, sql: &str) -> StorageResult<()> {
    db.query(sql)
        .await
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    Ok(())
}

/// `candidates`: one row per discovered listing, keyed by source URL.
///
/// Upserts are delete-then-create, so the delete permission stays open.
async fn init_candidates_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing candidates table");

    let sql = r#"
        DEFINE TABLE candidates
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete FULL;

        -- A listing is identified by its source URL
        DEFINE INDEX idx_candidate_source_url ON TABLE candidates COLUMNS source_url UNIQUE;

        -- Batch selection filters on lifecycle status and platform
        DEFINE INDEX idx_candidate_status ON TABLE candidates COLUMNS status;
        DEFINE INDEX idx_candidate_platform ON TABLE candidates COLUMNS source_platform;
    "#;

    run(db, sql).await
}

/// `attempts`: the contact attempt ledger.
///
/// The composite unique index is the serialization mechanism for the whole
/// orchestrator: at most one evolving row per (target_url, channel).
/// Upserts are delete-then-create, so the delete permission stays open.
async fn init_attempts_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing attempts table");

    let sql = r#"
        DEFINE TABLE attempts
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete FULL;

        -- One ledger row per (target, channel) pair
        DEFINE INDEX idx_attempt_pair ON TABLE attempts COLUMNS target_url, channel UNIQUE;

        -- Rate guard and status report scans
        DEFINE INDEX idx_attempt_status ON TABLE attempts COLUMNS status;
        DEFINE INDEX idx_attempt_created ON TABLE attempts COLUMNS created_at;
        DEFINE INDEX idx_attempt_campaign ON TABLE attempts COLUMNS campaign;
    "#;

    run(db, sql).await
}

/// `opt_outs`: do-not-contact domains, unique on normalized domain.
async fn init_opt_outs_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing opt_outs table");

    let sql = r#"
        DEFINE TABLE opt_outs
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete FULL;

        DEFINE INDEX idx_opt_out_domain ON TABLE opt_outs COLUMNS domain UNIQUE;
    "#;

    run(db, sql).await
}

/// `invites`: single-use invite tokens, unique on token.
async fn init_invites_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing invites table");

    let sql = r#"
        DEFINE TABLE invites
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX idx_invite_token ON TABLE invites COLUMNS token UNIQUE;
        DEFINE INDEX idx_invite_campaign ON TABLE invites COLUMNS campaign;
    "#;

    run(db, sql).await
}

/// `principals`: system identities, unique on slug.
async fn init_principals_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing principals table");

    let sql = r#"
        DEFINE TABLE principals
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX idx_principal_slug ON TABLE principals COLUMNS slug UNIQUE;
    "#;

    run(db, sql).await
}

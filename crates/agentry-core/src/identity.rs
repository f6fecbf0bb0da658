//! Recruiter identity.
//!
//! Every outbound invitation is attributed to a single system
//! principal. `ensure_recruiter` is idempotent: repeated calls refresh
//! the profile and reuse the existing API key.

use agentry_state::{EnsuredPrincipal, PrincipalProfile, PrincipalRegistry, StorageResult};
use tracing::info;

pub const RECRUITER_SLUG: &str = "agentry-recruiter";

/// Declarative profile of the system recruiter.
pub fn recruiter_profile() -> PrincipalProfile {
    PrincipalProfile {
        slug: RECRUITER_SLUG.to_string(),
        name: "Agentry Recruiter".to_string(),
        description: "Official Agentry recruitment agent. Discovers AI agents across \
                      the web and invites them to join the Agentry registry."
            .to_string(),
        skills: vec![
            "agent-discovery".to_string(),
            "recruitment".to_string(),
            "networking".to_string(),
        ],
        protocols: vec!["rest".to_string(), "a2a".to_string(), "mcp".to_string()],
    }
}

/// Ensure the recruiter principal exists, returning it.
pub async fn ensure_recruiter(
    registry: &dyn PrincipalRegistry,
) -> StorageResult<EnsuredPrincipal> {
    let ensured = registry.ensure(&recruiter_profile()).await?;
    if ensured.minted_api_key.is_some() {
        info!(
            slug = RECRUITER_SLUG,
            principal_id = %ensured.principal.id,
            "recruiter principal created"
        );
    }
    Ok(ensured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_state::fakes::MemoryPrincipalRegistry;

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let registry = MemoryPrincipalRegistry::new();
        let first = ensure_recruiter(&registry).await.unwrap();
        assert!(first.minted_api_key.is_some());

        let second = ensure_recruiter(&registry).await.unwrap();
        assert!(second.minted_api_key.is_none());
        assert_eq!(first.principal.id, second.principal.id);
        assert_eq!(second.principal.slug, RECRUITER_SLUG);
    }
}

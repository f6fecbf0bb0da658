//! Invite token minting.

use rand::RngCore;

/// Mint a fresh invite token: `inv_` plus 12 hex characters.
pub fn mint_invite_token() -> String {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("inv_{}", hex::encode(bytes))
}

/// Registration URL a recruited agent should visit.
pub fn invite_url(base_url: &str, token: &str) -> String {
    format!("{}/join/{}", base_url.trim_end_matches('/'), token)
}

//! On-chain identity resolution.
//!
//! A viewer is logged in when their local session is fresh AND their wallet
//! address has a profile hash stored on chain; the session alone proves
//! nothing and is re-validated here on every page mount.
//!
//! The hash query fails closed: an unreachable chain reads as "no account",
//! never as access. A profile document that will not decode leaves
//! `has_profile` true with `profile` absent; the inconsistency is reported,
//! not repaired. Each step runs exactly once per resolution.

use tracing::warn;

use crate::errors::Result;
use crate::ipfs::{parse_document, ContentStore};
use crate::models::{Address, UserProfile};
use crate::provider::Provider;
use crate::AppEnv;

#[derive(Debug, Clone)]
pub struct Identity {
    pub address: Address,
    pub is_logged_in: bool,
    pub has_profile: bool,
    pub profile: Option<UserProfile>,
    pub is_admin: bool,
}

impl Identity {
    pub fn username(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.username.as_str())
    }
}

/// Resolve the identity behind `address`.
pub async fn resolve<P: Provider, C: ContentStore>(
    env: &AppEnv<P, C>,
    address: &Address,
) -> Identity {
    // Admin status is configured, not derived from the profile, and is
    // evaluated independently of the login path.
    let is_admin = env.config.is_admin(address);

    if env.session.expired() {
        return Identity {
            address: address.clone(),
            is_logged_in: false,
            has_profile: false,
            profile: None,
            is_admin,
        };
    }

    let has_profile = match env.chain.hash_storage().account_has_hash(address).await {
        Ok(stored) => stored,
        Err(e) => {
            warn!("hash query for {address} failed, treating as unregistered: {e}");
            false
        }
    };

    let profile = if has_profile {
        match fetch_profile(env, address).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("profile for {address} did not resolve: {e}");
                None
            }
        }
    } else {
        None
    };

    Identity {
        address: address.clone(),
        is_logged_in: has_profile,
        has_profile,
        profile,
        is_admin,
    }
}

/// Fetch and decode the profile document behind an account's stored hash.
pub async fn fetch_profile<P: Provider, C: ContentStore>(
    env: &AppEnv<P, C>,
    address: &Address,
) -> Result<UserProfile> {
    let hash = env.chain.hash_storage().account_hash(address).await?;
    let bytes = env.content.cat(&hash).await?;
    parse_document(&bytes)
}

/// Display name for an address: the profile username, or empty when the
/// account is unregistered or its document does not resolve.
pub async fn display_name<P: Provider, C: ContentStore>(
    env: &AppEnv<P, C>,
    address: &Address,
) -> String {
    match fetch_profile(env, address).await {
        Ok(profile) => profile.username,
        Err(e) => {
            warn!("no display name for {address}: {e}");
            String::new()
        }
    }
}

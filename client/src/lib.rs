//! CrowdFund headless client.
//!
//! Orchestrates the client side of the CrowdFund platform without owning
//! any markup: a time-boxed local session, a gateway over the wallet /
//! provider boundary, a content-addressed document store for profiles and
//! project metadata, on-chain identity resolution, and one view-state
//! controller per page.
//!
//! The smart contracts, the wallet and the IPFS node are external
//! collaborators consumed through narrow async interfaces; this crate
//! assumes they are correct and concerns itself with sequencing, failure
//! containment and view state.

pub mod chain;
pub mod config;
pub mod errors;
pub mod identity;
pub mod ipfs;
pub mod models;
pub mod pages;
pub mod pagination;
pub mod provider;
pub mod session;
pub mod view;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::{ClientError, Result};

use chain::ChainGateway;
use config::{Config, Deployments};
use ipfs::{ContentStore, IpfsClient};
use provider::{HttpProvider, Provider};
use session::{FileSlot, SessionService, SystemClock};

/// Everything a page controller needs, constructed once at application
/// start and passed by reference. Injecting the session service and the
/// stores here (rather than reaching for globals) is what lets tests swap
/// in fakes for the clock, the chain and the content store.
pub struct AppEnv<P, C> {
    pub config: Config,
    pub session: SessionService,
    pub chain: ChainGateway<P>,
    pub content: C,
}

impl AppEnv<HttpProvider, IpfsClient> {
    /// Wire the production environment: wallet RPC provider (or the fixed
    /// local fallback endpoint), IPFS HTTP API client, file-backed session
    /// slot and the deployments table from disk.
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let deployments = Deployments::load(&config.deployments_path)?;

        let provider = HttpProvider::new(config.wallet_rpc_url.clone())?;
        let chain = ChainGateway::connect(provider, &deployments).await?;

        let content = IpfsClient::new(config.ipfs_api_url.clone())?;
        let session = SessionService::new(
            Box::new(FileSlot::new(config.session_path.clone())),
            Box::new(SystemClock),
        );

        Ok(AppEnv {
            config,
            session,
            chain,
            content,
        })
    }
}

impl<P: Provider, C: ContentStore> AppEnv<P, C> {
    pub fn new(config: Config, session: SessionService, chain: ChainGateway<P>, content: C) -> Self {
        AppEnv {
            config,
            session,
            chain,
            content,
        }
    }
}

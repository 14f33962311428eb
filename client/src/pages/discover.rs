//! Project directory: every approved project on the platform, four cards
//! to a page, with each owner's display name resolved through hash storage
//! and the content store.
//!
//! The directory is public; a viewer without a session still sees it.

use tracing::{error, warn};

use crate::chain::{CROWDSALE, HASH_STORAGE, PROJECT_LEDGER};
use crate::errors::Result;
use crate::identity;
use crate::ipfs::ContentStore;
use crate::models::TokenQuote;
use crate::provider::Provider;
use crate::view::{ListView, Phase, PhaseEvent};
use crate::AppEnv;

pub const CARDS_PER_PAGE: usize = 4;

/// One approved project as shown on the directory grid.
#[derive(Debug, Clone)]
pub struct ProjectCard {
    pub id: u64,
    pub name: String,
    pub owner_name: String,
    pub goal: u128,
    pub balance: u128,
    pub open: bool,
    pub percent_funded: u128,
}

#[derive(Debug, Clone)]
pub struct DiscoverPage {
    pub phase: Phase,
    pub quote: Option<TokenQuote>,
    pub projects: ListView<ProjectCard>,
}

impl DiscoverPage {
    pub async fn mount<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Self {
        match Self::load(env).await {
            Ok(page) => page,
            Err(e) => {
                error!("discover mount failed: {e}");
                DiscoverPage {
                    phase: Phase::Loading.on(PhaseEvent::ConnectFailed),
                    quote: None,
                    projects: ListView::new(CARDS_PER_PAGE),
                }
            }
        }
    }

    async fn load<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Result<Self> {
        env.chain.active_account()?;
        env.chain.require(&[PROJECT_LEDGER, HASH_STORAGE, CROWDSALE])?;
        let quote = env.chain.token_quote().await?;

        // One project at a time; a bad item is skipped, not fatal.
        let last = env.chain.ledger().last_project_id().await?;
        let mut cards = Vec::new();
        for id in 0..last {
            match Self::fetch_card(env, id, &quote).await {
                Ok(Some(card)) => cards.push(card),
                Ok(None) => {}
                Err(e) => warn!("skipping project {id}: {e}"),
            }
        }

        Ok(DiscoverPage {
            // Public page: no authentication gate.
            phase: Phase::Ready,
            quote: Some(quote),
            projects: ListView::new(CARDS_PER_PAGE).loaded(cards),
        })
    }

    /// One directory card; `None` for projects still awaiting approval.
    async fn fetch_card<P: Provider, C: ContentStore>(
        env: &AppEnv<P, C>,
        id: u64,
        quote: &TokenQuote,
    ) -> Result<Option<ProjectCard>> {
        let project = env.chain.ledger().project(id).await?;
        if !project.approved {
            return Ok(None);
        }

        let owner_name = identity::display_name(env, &project.owner).await;

        Ok(Some(ProjectCard {
            id,
            name: project.name,
            owner_name,
            goal: project.goal,
            balance: project.balance,
            open: project.open,
            percent_funded: quote.percent_funded(project.balance, project.goal),
        }))
    }

    pub fn page_clicked(self, page: usize) -> Self {
        DiscoverPage {
            projects: self.projects.page_clicked(page),
            ..self
        }
    }
}

//! The viewer's own account: wallet summary, projects they created and
//! projects they funded, each list four to a page.

use tracing::{error, warn};

use crate::chain::{CROWDSALE, HASH_STORAGE, PROJECT_LEDGER};
use crate::errors::Result;
use crate::identity;
use crate::ipfs::ContentStore;
use crate::models::{Address, Project, TokenQuote, UserProfile};
use crate::provider::Provider;
use crate::view::{ListView, Phase, PhaseEvent};
use crate::AppEnv;

pub const PROJECTS_PER_PAGE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountTab {
    #[default]
    Wallet,
    Created,
    Funded,
}

/// A project the viewer backed, with their share of its funds.
#[derive(Debug, Clone)]
pub struct FundedProject {
    pub project: Project,
    pub funder_balance: u128,
}

#[derive(Debug, Clone)]
pub struct AccountPage {
    pub phase: Phase,
    pub tab: AccountTab,
    pub address: Option<Address>,
    pub profile: Option<UserProfile>,
    pub quote: Option<TokenQuote>,
    /// Viewer's token balance in base units.
    pub account_balance: u128,
    pub created: ListView<Project>,
    pub funded: ListView<FundedProject>,
}

impl AccountPage {
    fn unloaded(phase: Phase) -> Self {
        AccountPage {
            phase,
            tab: AccountTab::default(),
            address: None,
            profile: None,
            quote: None,
            account_balance: 0,
            created: ListView::new(PROJECTS_PER_PAGE),
            funded: ListView::new(PROJECTS_PER_PAGE),
        }
    }

    pub async fn mount<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Self {
        match Self::load(env).await {
            Ok(page) => page,
            Err(e) => {
                error!("account mount failed: {e}");
                Self::unloaded(Phase::Loading.on(PhaseEvent::ConnectFailed))
            }
        }
    }

    async fn load<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Result<Self> {
        let account = env.chain.active_account()?.clone();
        env.chain.require(&[PROJECT_LEDGER, HASH_STORAGE, CROWDSALE])?;

        let viewer = identity::resolve(env, &account).await;
        if !viewer.is_logged_in {
            return Ok(Self::unloaded(Phase::Loading.on(PhaseEvent::NotLoggedIn)));
        }

        let quote = env.chain.token_quote().await?;
        let token_address = env.chain.crowdsale().token_address().await?;
        let account_balance = env
            .chain
            .token_at(token_address)
            .balance_of(&account)
            .await?;

        let mut created = Vec::new();
        for id in env.chain.ledger().owner_projects(&account).await? {
            match env.chain.ledger().project(id).await {
                Ok(project) => created.push(project),
                Err(e) => warn!("skipping created project {id}: {e}"),
            }
        }

        let mut funded = Vec::new();
        for id in env.chain.ledger().funded_projects(&account).await? {
            match Self::fetch_funded(env, id, &account).await {
                Ok(row) => funded.push(row),
                Err(e) => warn!("skipping funded project {id}: {e}"),
            }
        }

        Ok(AccountPage {
            phase: Phase::Loading.on(PhaseEvent::LoggedIn),
            tab: AccountTab::default(),
            address: Some(account),
            profile: viewer.profile,
            quote: Some(quote),
            account_balance,
            created: ListView::new(PROJECTS_PER_PAGE).loaded(created),
            funded: ListView::new(PROJECTS_PER_PAGE).loaded(funded),
        })
    }

    async fn fetch_funded<P: Provider, C: ContentStore>(
        env: &AppEnv<P, C>,
        id: u64,
        viewer: &Address,
    ) -> Result<FundedProject> {
        let project = env.chain.ledger().project(id).await?;
        let funder_balance = env.chain.ledger().funder_balance(id, viewer).await?;
        Ok(FundedProject {
            project,
            funder_balance,
        })
    }

    pub fn tab_selected(self, tab: AccountTab) -> Self {
        AccountPage { tab, ..self }
    }

    /// Each list pages independently.
    pub fn page_clicked(self, tab: AccountTab, page: usize) -> Self {
        match tab {
            AccountTab::Created => AccountPage {
                created: self.created.page_clicked(page),
                ..self
            },
            AccountTab::Funded => AccountPage {
                funded: self.funded.page_clicked(page),
                ..self
            },
            AccountTab::Wallet => self,
        }
    }
}

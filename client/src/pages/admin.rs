//! Administrative control panel, gated by the configured admin
//! allow-list: the full project ledger (pending projects included, so
//! they can be approved) and the registered-user roster.

use tracing::{error, warn};

use crate::chain::{CROWDSALE, HASH_STORAGE, PROJECT_LEDGER};
use crate::errors::Result;
use crate::identity;
use crate::ipfs::ContentStore;
use crate::models::{Address, Project, TokenQuote, UserProfile};
use crate::provider::Provider;
use crate::view::{FormStatus, ListView, Phase, PhaseEvent};
use crate::AppEnv;

pub const ROWS_PER_PAGE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminTab {
    #[default]
    Projects,
    Users,
}

/// One registered account on the user roster.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub address: Address,
    pub profile: UserProfile,
    /// Token balance in base units.
    pub balance: u128,
}

#[derive(Debug, Clone)]
pub struct AdminPage {
    pub phase: Phase,
    pub tab: AdminTab,
    pub quote: Option<TokenQuote>,
    pub projects: ListView<Project>,
    pub users: ListView<UserRow>,
    pub approve_status: FormStatus,
}

impl AdminPage {
    fn unloaded(phase: Phase) -> Self {
        AdminPage {
            phase,
            tab: AdminTab::default(),
            quote: None,
            projects: ListView::new(ROWS_PER_PAGE),
            users: ListView::new(ROWS_PER_PAGE),
            approve_status: FormStatus::default(),
        }
    }

    pub async fn mount<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Self {
        match Self::load(env).await {
            Ok(page) => page,
            Err(e) => {
                error!("admin mount failed: {e}");
                Self::unloaded(Phase::Loading.on(PhaseEvent::ConnectFailed))
            }
        }
    }

    async fn load<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Result<Self> {
        let account = env.chain.active_account()?.clone();
        env.chain.require(&[PROJECT_LEDGER, HASH_STORAGE, CROWDSALE])?;

        let viewer = identity::resolve(env, &account).await;
        if !viewer.is_logged_in || !viewer.is_admin {
            return Ok(Self::unloaded(Phase::Loading.on(PhaseEvent::NotLoggedIn)));
        }

        let quote = env.chain.token_quote().await?;
        let token_address = env.chain.crowdsale().token_address().await?;

        let last = env.chain.ledger().last_project_id().await?;
        let mut projects = Vec::new();
        for id in 0..last {
            match env.chain.ledger().project(id).await {
                Ok(project) => projects.push(project),
                Err(e) => warn!("skipping project {id}: {e}"),
            }
        }

        let mut users = Vec::new();
        for address in env.chain.hash_storage().accounts().await? {
            match Self::fetch_user(env, &token_address, &address).await {
                Ok(row) => users.push(row),
                Err(e) => warn!("skipping user {address}: {e}"),
            }
        }

        Ok(AdminPage {
            phase: Phase::Loading.on(PhaseEvent::LoggedIn),
            tab: AdminTab::default(),
            quote: Some(quote),
            projects: ListView::new(ROWS_PER_PAGE).loaded(projects),
            users: ListView::new(ROWS_PER_PAGE).loaded(users),
            approve_status: FormStatus::default(),
        })
    }

    async fn fetch_user<P: Provider, C: ContentStore>(
        env: &AppEnv<P, C>,
        token_address: &Address,
        address: &Address,
    ) -> Result<UserRow> {
        let profile = identity::fetch_profile(env, address).await?;
        let balance = env
            .chain
            .token_at(token_address.clone())
            .balance_of(address)
            .await?;
        Ok(UserRow {
            address: address.clone(),
            profile,
            balance,
        })
    }

    pub fn tab_selected(self, tab: AdminTab) -> Self {
        AdminPage { tab, ..self }
    }

    /// Each tab pages independently.
    pub fn page_clicked(self, tab: AdminTab, page: usize) -> Self {
        match tab {
            AdminTab::Projects => AdminPage {
                projects: self.projects.page_clicked(page),
                ..self
            },
            AdminTab::Users => AdminPage {
                users: self.users.page_clicked(page),
                ..self
            },
        }
    }

    /// Approve one pending project and re-query the flag it flipped.
    pub async fn approve<P: Provider, C: ContentStore>(
        mut self,
        env: &AppEnv<P, C>,
        id: u64,
    ) -> Self {
        if self.approve_status.is_submitting() {
            return self;
        }
        let Some(index) = self.projects.items().iter().position(|p| p.id == id) else {
            return self;
        };

        self.approve_status = FormStatus::Submitting;

        let flipped: Result<bool> = async {
            env.chain.ledger().approve(id).await?;
            env.chain.ledger().is_approved(id).await
        }
        .await;

        match flipped {
            Ok(approved) => {
                self.approve_status = FormStatus::Succeeded;
                self.projects = self.projects.with_item(index, |p| p.approved = approved);
            }
            Err(e) => self.approve_status = FormStatus::failed(e.to_string()),
        }
        self
    }
}

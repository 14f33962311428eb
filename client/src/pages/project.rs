//! One project in detail: funding progress, the deposit and withdraw
//! flows, and the owner's controls (closing the project and posting
//! updates to its metadata document).
//!
//! The detail view itself is public; every mutating action requires a
//! live session. Deposits run a token approval for the ledger followed by
//! the ledger deposit; withdrawals run the ledger withdrawal followed by
//! a transfer pulling the tokens back out of the ledger's custody.

use chrono::Utc;
use tracing::{error, warn};

use crate::chain::{CROWDSALE, HASH_STORAGE, PROJECT_LEDGER};
use crate::errors::Result;
use crate::identity;
use crate::ipfs::{self, ContentStore};
use crate::models::{Address, Project, ProjectMetadata, ProjectUpdate, TokenQuote};
use crate::provider::Provider;
use crate::view::{FormStatus, Phase, PhaseEvent};
use crate::AppEnv;

/// Mutually exclusive sub-views. `Owner` is only reachable when the
/// viewer owns the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectTab {
    #[default]
    Deposit,
    Withdraw,
    Owner,
}

#[derive(Debug, Clone)]
pub struct ProjectDetail {
    pub project: Project,
    pub owner_name: String,
    /// Portion of the raised funds attributable to the viewer.
    pub funder_balance: u128,
    pub metadata: Option<ProjectMetadata>,
}

/// Amount entry in display units plus its submit state.
#[derive(Debug, Clone, Default)]
pub struct AmountForm {
    pub amount: u128,
    pub status: FormStatus,
}

/// Owner update entry.
#[derive(Debug, Clone, Default)]
pub struct UpdateForm {
    pub body: String,
    pub status: FormStatus,
}

#[derive(Debug, Clone)]
pub struct ProjectPage {
    pub phase: Phase,
    pub tab: ProjectTab,
    pub quote: Option<TokenQuote>,
    /// Viewer's token balance in base units.
    pub account_balance: u128,
    /// `None` when the id is out of range, unapproved, or failed to read.
    pub detail: Option<ProjectDetail>,
    pub logged_in: bool,
    pub is_owner: bool,
    pub deposit_form: AmountForm,
    pub withdraw_form: AmountForm,
    pub update_form: UpdateForm,
    pub close_status: FormStatus,
    viewer: Option<Address>,
    token_address: Option<Address>,
}

impl ProjectPage {
    fn unloaded(phase: Phase) -> Self {
        ProjectPage {
            phase,
            tab: ProjectTab::default(),
            quote: None,
            account_balance: 0,
            detail: None,
            logged_in: false,
            is_owner: false,
            deposit_form: AmountForm::default(),
            withdraw_form: AmountForm::default(),
            update_form: UpdateForm::default(),
            close_status: FormStatus::default(),
            viewer: None,
            token_address: None,
        }
    }

    pub async fn mount<P: Provider, C: ContentStore>(env: &AppEnv<P, C>, project_id: u64) -> Self {
        match Self::load(env, project_id).await {
            Ok(page) => page,
            Err(e) => {
                error!("project {project_id} mount failed: {e}");
                Self::unloaded(Phase::Loading.on(PhaseEvent::ConnectFailed))
            }
        }
    }

    async fn load<P: Provider, C: ContentStore>(
        env: &AppEnv<P, C>,
        project_id: u64,
    ) -> Result<Self> {
        let account = env.chain.active_account()?.clone();
        env.chain.require(&[PROJECT_LEDGER, HASH_STORAGE, CROWDSALE])?;

        let quote = env.chain.token_quote().await?;
        let token_address = env.chain.crowdsale().token_address().await?;
        let account_balance = env
            .chain
            .token_at(token_address.clone())
            .balance_of(&account)
            .await?;

        let viewer = identity::resolve(env, &account).await;
        let detail = Self::fetch_detail(env, project_id, &account).await;
        let is_owner = detail.as_ref().is_some_and(|d| d.project.owner == account);

        Ok(ProjectPage {
            phase: Phase::Ready,
            tab: ProjectTab::default(),
            quote: Some(quote),
            account_balance,
            detail,
            logged_in: viewer.is_logged_in,
            is_owner,
            deposit_form: AmountForm::default(),
            withdraw_form: AmountForm::default(),
            update_form: UpdateForm::default(),
            close_status: FormStatus::default(),
            viewer: Some(account),
            token_address: Some(token_address),
        })
    }

    /// The project body, or `None` when the id is out of range, the
    /// project is not approved, or its reads fail.
    async fn fetch_detail<P: Provider, C: ContentStore>(
        env: &AppEnv<P, C>,
        id: u64,
        viewer: &Address,
    ) -> Option<ProjectDetail> {
        let fetched: Result<Option<ProjectDetail>> = async {
            let ledger = env.chain.ledger();

            if id >= ledger.last_project_id().await? {
                return Ok(None);
            }
            let project = ledger.project(id).await?;
            if !project.approved {
                return Ok(None);
            }

            let funder_balance = ledger.funder_balance(id, viewer).await?;
            let owner_name = identity::display_name(env, &project.owner).await;
            let metadata = match project.ipfs_hash.as_deref() {
                Some(hash) => Self::fetch_metadata(env, hash).await,
                None => None,
            };

            Ok(Some(ProjectDetail {
                project,
                owner_name,
                funder_balance,
                metadata,
            }))
        }
        .await;

        match fetched {
            Ok(detail) => detail,
            Err(e) => {
                warn!("project {id} did not load: {e}");
                None
            }
        }
    }

    /// A metadata document that is missing or does not decode reads as
    /// "no metadata", never a fault.
    async fn fetch_metadata<P: Provider, C: ContentStore>(
        env: &AppEnv<P, C>,
        hash: &str,
    ) -> Option<ProjectMetadata> {
        let bytes = match env.content.cat(hash).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("metadata {hash} unreachable: {e}");
                return None;
            }
        };
        match ipfs::parse_document(&bytes) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("metadata {hash} did not decode: {e}");
                None
            }
        }
    }

    // ── snapshot transitions ──────────────────────────────

    /// Switch sub-views; the owner tab is ignored for non-owners.
    pub fn tab_selected(self, tab: ProjectTab) -> Self {
        if tab == ProjectTab::Owner && !self.is_owner {
            return self;
        }
        ProjectPage { tab, ..self }
    }

    /// Deposit entry accepts 1..=viewer token balance in display units;
    /// zero clears, anything else leaves the previous entry.
    pub fn deposit_amount_changed(mut self, amount: u128) -> Self {
        let max = self.display_balance();
        Self::set_amount(&mut self.deposit_form, amount, max);
        self
    }

    /// Withdraw entry is bounded by the viewer's funder balance, the
    /// quantity actually withdrawable.
    pub fn withdraw_amount_changed(mut self, amount: u128) -> Self {
        let max = self.display_funder_balance();
        Self::set_amount(&mut self.withdraw_form, amount, max);
        self
    }

    pub fn update_body_changed(mut self, body: String) -> Self {
        self.update_form.body = body;
        self
    }

    fn set_amount(form: &mut AmountForm, amount: u128, max: u128) {
        if amount == 0 {
            form.amount = 0;
        } else if (1..=max).contains(&amount) {
            form.amount = amount;
        }
    }

    fn display_balance(&self) -> u128 {
        self.quote
            .as_ref()
            .map_or(0, |q| q.to_display(self.account_balance))
    }

    fn display_funder_balance(&self) -> u128 {
        match (&self.quote, &self.detail) {
            (Some(quote), Some(detail)) => quote.to_display(detail.funder_balance),
            _ => 0,
        }
    }

    // ── mutating actions ──────────────────────────────────

    /// Token approval for the ledger, then the ledger deposit, then a
    /// re-query of every balance the transaction moved.
    pub async fn deposit<P: Provider, C: ContentStore>(mut self, env: &AppEnv<P, C>) -> Self {
        if self.deposit_form.status.is_submitting() {
            return self;
        }
        let Some(detail) = self.detail.as_ref() else {
            return self;
        };
        let (id, open) = (detail.project.id, detail.project.open);
        let (Some(quote), Some(token_address)) = (self.quote.clone(), self.token_address.clone())
        else {
            return self;
        };

        if !self.logged_in || !open {
            self.deposit_form.status = FormStatus::failed("project is not open for funding");
            return self;
        }
        if self.deposit_form.amount == 0 {
            self.deposit_form.status = FormStatus::failed("enter an amount to deposit");
            return self;
        }
        let base = match quote.to_base(self.deposit_form.amount) {
            Ok(base) => base,
            Err(e) => {
                self.deposit_form.status = FormStatus::failed(e.to_string());
                return self;
            }
        };

        self.deposit_form.status = FormStatus::Submitting;

        let sent: Result<()> = async {
            let ledger_address = env.chain.address_of(PROJECT_LEDGER)?.clone();
            env.chain
                .token_at(token_address)
                .approve(&ledger_address, base)
                .await?;
            env.chain.ledger().deposit(id, base).await?;
            Ok(())
        }
        .await;

        match sent {
            Ok(()) => {
                self.deposit_form.amount = 0;
                self.deposit_form.status = FormStatus::Succeeded;
                if let Err(e) = self.refresh_balances(env).await {
                    warn!("balance re-query after deposit failed: {e}");
                }
            }
            // Input stays put so the human can retry.
            Err(e) => self.deposit_form.status = FormStatus::failed(e.to_string()),
        }
        self
    }

    /// Ledger withdrawal, then the token transfer back to the viewer.
    pub async fn withdraw<P: Provider, C: ContentStore>(mut self, env: &AppEnv<P, C>) -> Self {
        if self.withdraw_form.status.is_submitting() {
            return self;
        }
        let Some(detail) = self.detail.as_ref() else {
            return self;
        };
        let (id, open) = (detail.project.id, detail.project.open);
        let (Some(quote), Some(viewer), Some(token_address)) = (
            self.quote.clone(),
            self.viewer.clone(),
            self.token_address.clone(),
        ) else {
            return self;
        };

        if !self.logged_in || !open {
            self.withdraw_form.status = FormStatus::failed("project is not open for withdrawals");
            return self;
        }
        if self.withdraw_form.amount == 0 {
            self.withdraw_form.status = FormStatus::failed("enter an amount to withdraw");
            return self;
        }
        let base = match quote.to_base(self.withdraw_form.amount) {
            Ok(base) => base,
            Err(e) => {
                self.withdraw_form.status = FormStatus::failed(e.to_string());
                return self;
            }
        };

        self.withdraw_form.status = FormStatus::Submitting;

        let sent: Result<()> = async {
            let ledger_address = env.chain.address_of(PROJECT_LEDGER)?.clone();
            env.chain.ledger().withdraw(id, base).await?;
            env.chain
                .token_at(token_address)
                .transfer_from(&ledger_address, &viewer, base)
                .await?;
            Ok(())
        }
        .await;

        match sent {
            Ok(()) => {
                self.withdraw_form.amount = 0;
                self.withdraw_form.status = FormStatus::Succeeded;
                if let Err(e) = self.refresh_balances(env).await {
                    warn!("balance re-query after withdrawal failed: {e}");
                }
            }
            Err(e) => self.withdraw_form.status = FormStatus::failed(e.to_string()),
        }
        self
    }

    /// Owner closes the project once the goal is fully funded.
    pub async fn close<P: Provider, C: ContentStore>(mut self, env: &AppEnv<P, C>) -> Self {
        if self.close_status.is_submitting() {
            return self;
        }
        if !self.is_owner || !self.logged_in {
            return self;
        }
        let Some(detail) = self.detail.as_ref() else {
            return self;
        };
        if !detail.project.open {
            self.close_status = FormStatus::failed("project is already closed");
            return self;
        }
        if !detail.project.goal_reached() {
            self.close_status = FormStatus::failed("funding goal not reached yet");
            return self;
        }
        let id = detail.project.id;

        self.close_status = FormStatus::Submitting;

        match env.chain.ledger().close(id).await {
            Ok(_) => {
                self.close_status = FormStatus::Succeeded;
                if let Some(detail) = self.detail.as_mut() {
                    detail.project.open = false;
                }
            }
            Err(e) => self.close_status = FormStatus::failed(e.to_string()),
        }
        self
    }

    /// Replace the metadata document wholesale with the new update
    /// appended, then re-link its hash on the ledger.
    pub async fn post_update<P: Provider, C: ContentStore>(mut self, env: &AppEnv<P, C>) -> Self {
        if self.update_form.status.is_submitting() {
            return self;
        }
        if !self.is_owner || !self.logged_in {
            return self;
        }
        let Some(detail) = self.detail.as_ref() else {
            return self;
        };
        let body = self.update_form.body.trim().to_string();
        if body.is_empty() {
            self.update_form.status = FormStatus::failed("nothing to post");
            return self;
        }
        let id = detail.project.id;
        let mut metadata = detail.metadata.clone().unwrap_or_default();
        metadata.updates.push(ProjectUpdate {
            posted_at: Utc::now(),
            body,
        });

        self.update_form.status = FormStatus::Submitting;

        let stored: Result<String> = async {
            let bytes = ipfs::to_document(&metadata)?;
            let hash = env.content.add(bytes).await?;
            env.chain.ledger().set_ipfs_hash(id, &hash).await?;
            Ok(hash)
        }
        .await;

        match stored {
            Ok(hash) => {
                if let Some(detail) = self.detail.as_mut() {
                    detail.project.ipfs_hash = Some(hash);
                    detail.metadata = Some(metadata);
                }
                self.update_form = UpdateForm {
                    body: String::new(),
                    status: FormStatus::Succeeded,
                };
            }
            Err(e) => self.update_form.status = FormStatus::failed(e.to_string()),
        }
        self
    }

    async fn refresh_balances<P: Provider, C: ContentStore>(
        &mut self,
        env: &AppEnv<P, C>,
    ) -> Result<()> {
        let (Some(viewer), Some(token_address)) = (self.viewer.clone(), self.token_address.clone())
        else {
            return Ok(());
        };
        if let Some(detail) = self.detail.as_mut() {
            let id = detail.project.id;
            detail.project.balance = env.chain.ledger().balance(id).await?;
            detail.funder_balance = env.chain.ledger().funder_balance(id, &viewer).await?;
        }
        self.account_balance = env
            .chain
            .token_at(token_address)
            .balance_of(&viewer)
            .await?;
        Ok(())
    }
}

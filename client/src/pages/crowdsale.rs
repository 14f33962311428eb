//! Token crowdsale: the current quote, the viewer's balance, and the buy
//! flow attaching wei to the crowdsale's `buyTokens`.

use tracing::{error, warn};

use crate::chain::{CROWDSALE, HASH_STORAGE};
use crate::errors::Result;
use crate::identity;
use crate::ipfs::ContentStore;
use crate::models::{Address, TokenQuote};
use crate::provider::Provider;
use crate::view::{FormStatus, Phase, PhaseEvent};
use crate::AppEnv;

#[derive(Debug, Clone)]
pub struct CrowdsalePage {
    pub phase: Phase,
    pub quote: Option<TokenQuote>,
    /// Viewer's token balance in base units.
    pub account_balance: u128,
    pub logged_in: bool,
    /// Wei the viewer intends to spend.
    pub wei_amount: u128,
    pub status: FormStatus,
    viewer: Option<Address>,
    token_address: Option<Address>,
}

impl CrowdsalePage {
    fn unloaded(phase: Phase) -> Self {
        CrowdsalePage {
            phase,
            quote: None,
            account_balance: 0,
            logged_in: false,
            wei_amount: 0,
            status: FormStatus::default(),
            viewer: None,
            token_address: None,
        }
    }

    pub async fn mount<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Self {
        match Self::load(env).await {
            Ok(page) => page,
            Err(e) => {
                error!("crowdsale mount failed: {e}");
                Self::unloaded(Phase::Loading.on(PhaseEvent::ConnectFailed))
            }
        }
    }

    async fn load<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Result<Self> {
        let account = env.chain.active_account()?.clone();
        env.chain.require(&[CROWDSALE, HASH_STORAGE])?;

        let quote = env.chain.token_quote().await?;
        let token_address = env.chain.crowdsale().token_address().await?;
        let account_balance = env
            .chain
            .token_at(token_address.clone())
            .balance_of(&account)
            .await?;

        let viewer = identity::resolve(env, &account).await;

        Ok(CrowdsalePage {
            phase: Phase::Ready,
            quote: Some(quote),
            account_balance,
            logged_in: viewer.is_logged_in,
            wei_amount: 0,
            status: FormStatus::default(),
            viewer: Some(account),
            token_address: Some(token_address),
        })
    }

    pub fn amount_changed(mut self, wei: u128) -> Self {
        self.wei_amount = wei;
        self
    }

    /// How many display token units the entered wei buys.
    pub fn token_preview(&self) -> u128 {
        self.quote
            .as_ref()
            .map_or(0, |q| q.token_amount(self.wei_amount))
    }

    /// Buy tokens for the viewer, then re-query the balances the purchase
    /// moved (the viewer's and the crowdsale's remaining stock).
    pub async fn buy<P: Provider, C: ContentStore>(mut self, env: &AppEnv<P, C>) -> Self {
        if self.status.is_submitting() {
            return self;
        }
        let (Some(viewer), Some(token_address)) = (self.viewer.clone(), self.token_address.clone())
        else {
            return self;
        };
        if !self.logged_in {
            self.status = FormStatus::failed("log in to buy tokens");
            return self;
        }
        if self.wei_amount == 0 {
            self.status = FormStatus::failed("enter an amount of wei to spend");
            return self;
        }

        self.status = FormStatus::Submitting;

        match env.chain.crowdsale().buy_tokens(&viewer, self.wei_amount).await {
            Ok(_) => {
                self.wei_amount = 0;
                self.status = FormStatus::Succeeded;

                let refreshed: Result<()> = async {
                    self.account_balance = env
                        .chain
                        .token_at(token_address.clone())
                        .balance_of(&viewer)
                        .await?;
                    let crowdsale_address = env.chain.address_of(CROWDSALE)?.clone();
                    let stock = env
                        .chain
                        .token_at(token_address)
                        .balance_of(&crowdsale_address)
                        .await?;
                    if let Some(quote) = self.quote.as_mut() {
                        quote.tokens_for_sale = stock;
                    }
                    Ok(())
                }
                .await;
                if let Err(e) = refreshed {
                    warn!("balance re-query after purchase failed: {e}");
                }
            }
            Err(e) => self.status = FormStatus::failed(e.to_string()),
        }
        self
    }
}

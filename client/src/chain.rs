//! Chain gateway: named contract handles over the wallet provider boundary.
//!
//! The gateway resolves the active network and account list once at
//! connect time and binds each named contract to its deployed address for
//! that network. A contract missing from the deployments table still yields
//! a handle; its calls fail with [`ClientError::NotDeployed`] at call time.
//!
//! Reads for a single item are issued concurrently (one join per item),
//! while list fetches walk items sequentially, so at most one list fetch is
//! ever outstanding against the provider.

use serde_json::{json, Value};
use tracing::debug;

use crate::config::{Deployments, NetworkContracts};
use crate::errors::{ClientError, Result};
use crate::models::{Address, Project, TokenQuote};
use crate::provider::Provider;

pub const HASH_STORAGE: &str = "hash storage";
pub const PROJECT_LEDGER: &str = "project ledger";
pub const CROWDSALE: &str = "crowdsale";

/// Decoded result of a state-changing call.
#[derive(Debug, Clone, Default)]
pub struct Receipt {
    pub tx_hash: Option<String>,
}

pub struct ChainGateway<P> {
    provider: P,
    network_id: u64,
    accounts: Vec<Address>,
    contracts: NetworkContracts,
}

impl<P: Provider> ChainGateway<P> {
    /// Resolve the provider's network and accounts and bind contract
    /// addresses. Succeeds even when the account list is empty or the
    /// network has no deployments; those surface on first use.
    pub async fn connect(provider: P, deployments: &Deployments) -> Result<Self> {
        let network_id = provider.network_id().await?;
        let accounts = provider.accounts().await?;
        let contracts = deployments.network(network_id);

        debug!(
            "gateway connected: network {network_id}, {} account(s)",
            accounts.len()
        );

        Ok(ChainGateway {
            provider,
            network_id,
            accounts,
            contracts,
        })
    }

    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    /// The wallet account all calls are made as.
    pub fn active_account(&self) -> Result<&Address> {
        self.accounts.first().ok_or(ClientError::NoAccounts)
    }

    /// Verify every named contract has an address on this network.
    pub fn require(&self, contracts: &[&'static str]) -> Result<()> {
        for name in contracts {
            self.address_of(name)?;
        }
        Ok(())
    }

    pub fn address_of(&self, contract: &'static str) -> Result<&Address> {
        let bound = match contract {
            HASH_STORAGE => self.contracts.hash_storage.as_ref(),
            PROJECT_LEDGER => self.contracts.project_ledger.as_ref(),
            CROWDSALE => self.contracts.crowdsale.as_ref(),
            _ => None,
        };
        bound.ok_or(ClientError::NotDeployed {
            contract,
            network: self.network_id.to_string(),
        })
    }

    async fn call(&self, contract: &'static str, method: &str, args: Value) -> Result<Value> {
        let target = self.address_of(contract)?;
        self.provider.call(target, method, args).await
    }

    async fn send(&self, contract: &'static str, method: &str, args: Value) -> Result<Receipt> {
        let target = self.address_of(contract)?;
        let from = self.active_account()?;
        let value = self.provider.send(from, target, method, args, None).await?;
        Ok(as_receipt(value))
    }

    pub fn hash_storage(&self) -> HashStorage<'_, P> {
        HashStorage { gw: self }
    }

    pub fn ledger(&self) -> ProjectLedger<'_, P> {
        ProjectLedger { gw: self }
    }

    pub fn crowdsale(&self) -> Crowdsale<'_, P> {
        Crowdsale { gw: self }
    }

    /// Token handle at an address discovered at runtime (the crowdsale
    /// names its token; it is not in the deployments table).
    pub fn token_at(&self, address: Address) -> Token<'_, P> {
        Token { gw: self, address }
    }

    /// Full quote for the crowdsale token: symbol, decimals, rate and the
    /// remaining supply held by the crowdsale.
    pub async fn token_quote(&self) -> Result<TokenQuote> {
        let crowdsale = self.crowdsale();
        let (rate, token_addr) = tokio::try_join!(crowdsale.rate(), crowdsale.token_address())?;

        let crowdsale_addr = self.address_of(CROWDSALE)?.clone();
        let token = self.token_at(token_addr);
        let (symbol, decimals, for_sale) = tokio::try_join!(
            token.symbol(),
            token.decimals(),
            token.balance_of(&crowdsale_addr)
        )?;

        TokenQuote::new(symbol, decimals, rate, for_sale)
    }
}

// ─────────────────────────────────────────────────────────
// Hash storage
// ─────────────────────────────────────────────────────────

pub struct HashStorage<'a, P> {
    gw: &'a ChainGateway<P>,
}

impl<P: Provider> HashStorage<'_, P> {
    pub async fn account_has_hash(&self, account: &Address) -> Result<bool> {
        let v = self
            .gw
            .call(HASH_STORAGE, "accountHasIpfsHash", json!([account]))
            .await?;
        as_bool(&v)
    }

    pub async fn account_hash(&self, account: &Address) -> Result<String> {
        let v = self
            .gw
            .call(HASH_STORAGE, "getAccountIpfsHash", json!([account]))
            .await?;
        as_string(&v)
    }

    pub async fn set_account_hash(&self, hash: &str) -> Result<Receipt> {
        self.gw
            .send(HASH_STORAGE, "setAccountIpfsHash", json!([hash]))
            .await
    }

    /// Every account that ever stored a hash; the admin user roster.
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        let v = self.gw.call(HASH_STORAGE, "getAccounts", json!([])).await?;
        as_address_list(&v)
    }
}

// ─────────────────────────────────────────────────────────
// Project ledger
// ─────────────────────────────────────────────────────────

pub struct ProjectLedger<'a, P> {
    gw: &'a ChainGateway<P>,
}

impl<P: Provider> ProjectLedger<'_, P> {
    /// One past the highest assigned project id; ids are sequential from 0.
    pub async fn last_project_id(&self) -> Result<u64> {
        let v = self
            .gw
            .call(PROJECT_LEDGER, "getLastProjectId", json!([]))
            .await?;
        as_u64(&v)
    }

    pub async fn owner(&self, id: u64) -> Result<Address> {
        let v = self.gw.call(PROJECT_LEDGER, "getOwner", json!([id])).await?;
        as_address(&v)
    }

    pub async fn name(&self, id: u64) -> Result<String> {
        let v = self.gw.call(PROJECT_LEDGER, "getName", json!([id])).await?;
        as_string(&v)
    }

    pub async fn goal(&self, id: u64) -> Result<u128> {
        let v = self.gw.call(PROJECT_LEDGER, "getGoal", json!([id])).await?;
        as_u128(&v)
    }

    pub async fn balance(&self, id: u64) -> Result<u128> {
        let v = self
            .gw
            .call(PROJECT_LEDGER, "getBalance", json!([id]))
            .await?;
        as_u128(&v)
    }

    pub async fn is_approved(&self, id: u64) -> Result<bool> {
        let v = self
            .gw
            .call(PROJECT_LEDGER, "isApproved", json!([id]))
            .await?;
        as_bool(&v)
    }

    pub async fn is_open(&self, id: u64) -> Result<bool> {
        let v = self.gw.call(PROJECT_LEDGER, "isOpen", json!([id])).await?;
        as_bool(&v)
    }

    /// Metadata document hash; an empty string on chain means none linked.
    pub async fn ipfs_hash(&self, id: u64) -> Result<Option<String>> {
        let v = self
            .gw
            .call(PROJECT_LEDGER, "getIpfsHash", json!([id]))
            .await?;
        let s = as_string(&v)?;
        Ok(if s.is_empty() { None } else { Some(s) })
    }

    pub async fn project_exists(&self, name: &str) -> Result<bool> {
        let v = self
            .gw
            .call(PROJECT_LEDGER, "projectExists", json!([name]))
            .await?;
        as_bool(&v)
    }

    pub async fn funder_balance(&self, id: u64, account: &Address) -> Result<u128> {
        let v = self
            .gw
            .call(PROJECT_LEDGER, "getFunderBalance", json!([id, account]))
            .await?;
        as_u128(&v)
    }

    pub async fn funders(&self, id: u64) -> Result<Vec<Address>> {
        let v = self
            .gw
            .call(PROJECT_LEDGER, "getFunders", json!([id]))
            .await?;
        as_address_list(&v)
    }

    pub async fn owner_projects(&self, account: &Address) -> Result<Vec<u64>> {
        let v = self
            .gw
            .call(PROJECT_LEDGER, "getOwnerProjects", json!([account]))
            .await?;
        as_u64_list(&v)
    }

    pub async fn funded_projects(&self, account: &Address) -> Result<Vec<u64>> {
        let v = self
            .gw
            .call(PROJECT_LEDGER, "getUserFundedProjects", json!([account]))
            .await?;
        as_u64_list(&v)
    }

    /// All field reads for one project, issued concurrently.
    pub async fn project(&self, id: u64) -> Result<Project> {
        let (owner, name, goal, balance, approved, open, ipfs_hash) = tokio::try_join!(
            self.owner(id),
            self.name(id),
            self.goal(id),
            self.balance(id),
            self.is_approved(id),
            self.is_open(id),
            self.ipfs_hash(id),
        )?;
        Ok(Project {
            id,
            owner,
            name,
            goal,
            balance,
            approved,
            open,
            ipfs_hash,
        })
    }

    pub async fn create(&self, name: &str, goal: u128) -> Result<Receipt> {
        self.gw
            .send(PROJECT_LEDGER, "create", json!([name, amount(goal)]))
            .await
    }

    pub async fn approve(&self, id: u64) -> Result<Receipt> {
        self.gw.send(PROJECT_LEDGER, "approve", json!([id])).await
    }

    pub async fn deposit(&self, id: u64, amount_base: u128) -> Result<Receipt> {
        self.gw
            .send(PROJECT_LEDGER, "deposit", json!([id, amount(amount_base)]))
            .await
    }

    pub async fn withdraw(&self, id: u64, amount_base: u128) -> Result<Receipt> {
        self.gw
            .send(PROJECT_LEDGER, "withdraw", json!([id, amount(amount_base)]))
            .await
    }

    pub async fn close(&self, id: u64) -> Result<Receipt> {
        self.gw.send(PROJECT_LEDGER, "close", json!([id])).await
    }

    pub async fn set_ipfs_hash(&self, id: u64, hash: &str) -> Result<Receipt> {
        self.gw
            .send(PROJECT_LEDGER, "setIpfsHash", json!([id, hash]))
            .await
    }
}

// ─────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────

pub struct Token<'a, P> {
    gw: &'a ChainGateway<P>,
    address: Address,
}

impl<P: Provider> Token<'_, P> {
    async fn call(&self, method: &str, args: Value) -> Result<Value> {
        self.gw.provider.call(&self.address, method, args).await
    }

    async fn send(&self, method: &str, args: Value) -> Result<Receipt> {
        let from = self.gw.active_account()?;
        let value = self
            .gw
            .provider
            .send(from, &self.address, method, args, None)
            .await?;
        Ok(as_receipt(value))
    }

    pub async fn symbol(&self) -> Result<String> {
        let v = self.call("symbol", json!([])).await?;
        as_string(&v)
    }

    pub async fn decimals(&self) -> Result<u32> {
        let v = self.call("decimals", json!([])).await?;
        Ok(as_u64(&v)? as u32)
    }

    pub async fn balance_of(&self, account: &Address) -> Result<u128> {
        let v = self.call("balanceOf", json!([account])).await?;
        as_u128(&v)
    }

    pub async fn approve(&self, spender: &Address, amount_base: u128) -> Result<Receipt> {
        self.send("approve", json!([spender, amount(amount_base)]))
            .await
    }

    pub async fn transfer_from(
        &self,
        from: &Address,
        to: &Address,
        amount_base: u128,
    ) -> Result<Receipt> {
        self.send("transferFrom", json!([from, to, amount(amount_base)]))
            .await
    }
}

// ─────────────────────────────────────────────────────────
// Crowdsale
// ─────────────────────────────────────────────────────────

pub struct Crowdsale<'a, P> {
    gw: &'a ChainGateway<P>,
}

impl<P: Provider> Crowdsale<'_, P> {
    /// Wei per token display unit.
    pub async fn rate(&self) -> Result<u128> {
        let v = self.gw.call(CROWDSALE, "rate", json!([])).await?;
        as_u128(&v)
    }

    pub async fn token_address(&self) -> Result<Address> {
        let v = self.gw.call(CROWDSALE, "token", json!([])).await?;
        as_address(&v)
    }

    /// Buy tokens for `beneficiary`, attaching `value` wei.
    pub async fn buy_tokens(&self, beneficiary: &Address, value: u128) -> Result<Receipt> {
        let target = self.gw.address_of(CROWDSALE)?;
        let from = self.gw.active_account()?;
        let receipt = self
            .gw
            .provider
            .send(from, target, "buyTokens", json!([beneficiary]), Some(value))
            .await?;
        Ok(as_receipt(receipt))
    }
}

// ─────────────────────────────────────────────────────────
// Value decoding
// ─────────────────────────────────────────────────────────

/// Amounts cross the wire as decimal strings; u128 does not fit in a JSON
/// number.
fn amount(v: u128) -> Value {
    json!(v.to_string())
}

fn decode_err(wanted: &str, got: &Value) -> ClientError {
    ClientError::Rpc {
        code: 0,
        message: format!("expected {wanted}, got {got}"),
    }
}

fn as_bool(v: &Value) -> Result<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        other => Err(decode_err("bool", other)),
    }
}

fn as_u64(v: &Value) -> Result<u64> {
    if let Some(n) = v.as_u64() {
        return Ok(n);
    }
    if let Some(s) = v.as_str() {
        if let Ok(n) = s.parse::<u64>() {
            return Ok(n);
        }
    }
    Err(decode_err("u64", v))
}

fn as_u128(v: &Value) -> Result<u128> {
    if let Some(n) = v.as_u64() {
        return Ok(n as u128);
    }
    if let Some(s) = v.as_str() {
        if let Ok(n) = s.parse::<u128>() {
            return Ok(n);
        }
    }
    Err(decode_err("u128", v))
}

fn as_string(v: &Value) -> Result<String> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| decode_err("string", v))
}

fn as_address(v: &Value) -> Result<Address> {
    Address::parse(&as_string(v)?)
}

fn as_address_list(v: &Value) -> Result<Vec<Address>> {
    let items = v.as_array().ok_or_else(|| decode_err("address list", v))?;
    items.iter().map(as_address).collect()
}

fn as_u64_list(v: &Value) -> Result<Vec<u64>> {
    let items = v.as_array().ok_or_else(|| decode_err("id list", v))?;
    items.iter().map(as_u64).collect()
}

fn as_receipt(v: Value) -> Receipt {
    let tx_hash = v
        .get("txHash")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| v.as_str().map(str::to_string));
    Receipt { tx_hash }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

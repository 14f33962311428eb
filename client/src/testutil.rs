//! Test doubles shared by the unit tests: a programmable in-memory chain
//! behind the [`Provider`] trait, an in-memory content store, and a fixed
//! clock. The mock chain honours the same observable semantics the real
//! contracts do (balances move on deposit, approvals flip flags, reverts
//! surface as transaction errors) so the controller tests read like the
//! scenarios they verify.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::chain::ChainGateway;
use crate::config::{Config, Deployments, NetworkContracts, DEFAULT_IPFS_API_URL, FALLBACK_RPC_URL};
use crate::errors::{ClientError, Result};
use crate::ipfs::ContentStore;
use crate::models::{Address, UserProfile};
use crate::provider::Provider;
use crate::session::{Clock, MemorySlot, SessionService};
use crate::AppEnv;

// ─────────────────────────────────────────────────────────
// Addresses and wiring
// ─────────────────────────────────────────────────────────

/// Deterministic test address `n`.
pub fn addr(n: u8) -> Address {
    Address::parse(&format!("0x{n:040x}")).unwrap()
}

pub fn hash_storage_addr() -> Address {
    addr(0xA1)
}

pub fn ledger_addr() -> Address {
    addr(0xA2)
}

pub fn crowdsale_addr() -> Address {
    addr(0xA3)
}

pub fn token_addr() -> Address {
    addr(0xA4)
}

pub fn test_deployments() -> Deployments {
    Deployments::single(
        5777,
        NetworkContracts {
            hash_storage: Some(hash_storage_addr()),
            project_ledger: Some(ledger_addr()),
            crowdsale: Some(crowdsale_addr()),
        },
    )
}

pub fn test_config() -> Config {
    Config {
        wallet_rpc_url: FALLBACK_RPC_URL.to_string(),
        ipfs_api_url: DEFAULT_IPFS_API_URL.to_string(),
        deployments_path: "deployments.json".into(),
        session_path: "session".into(),
        admins: Vec::new(),
    }
}

/// Build an [`AppEnv`] over the mock chain and content store, with a fresh
/// in-memory session slot on a fixed clock. Documents seeded through the
/// chain builders are copied into the content store first.
pub async fn test_env(chain: MockChain, content: MemoryContent) -> AppEnv<MockChain, MemoryContent> {
    for (hash, bytes) in chain.seeded_docs() {
        content.put(&hash, bytes);
    }
    let session = SessionService::new(
        Box::new(MemorySlot::default()),
        Box::new(FixedClock::new(1_000_000)),
    );
    let gateway = ChainGateway::connect(chain, &test_deployments())
        .await
        .expect("mock gateway connects");
    AppEnv::new(test_config(), session, gateway, content)
}

// ─────────────────────────────────────────────────────────
// Fixed clock
// ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct FixedClock(Arc<AtomicI64>);

impl FixedClock {
    pub fn new(ms: i64) -> Self {
        FixedClock(Arc::new(AtomicI64::new(ms)))
    }

    pub fn advance(&self, delta_ms: i64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────
// In-memory content store
// ─────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryContent {
    docs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    next: Arc<AtomicU64>,
}

impl MemoryContent {
    pub fn put(&self, hash: &str, bytes: Vec<u8>) {
        self.docs.lock().unwrap().insert(hash.to_string(), bytes);
    }

    pub fn get(&self, hash: &str) -> Option<Vec<u8>> {
        self.docs.lock().unwrap().get(hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }
}

impl ContentStore for MemoryContent {
    fn cat(&self, hash: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let found = self.get(hash);
        async move {
            found.ok_or_else(|| ClientError::ContentDecode(format!("unknown hash {hash}")))
        }
    }

    fn add(&self, bytes: Vec<u8>) -> impl Future<Output = Result<String>> + Send {
        let hash = format!("Qm{:06}", self.next.fetch_add(1, Ordering::SeqCst));
        self.put(&hash, bytes);
        async move { Ok(hash) }
    }
}

// ─────────────────────────────────────────────────────────
// Mock chain
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MockProject {
    pub owner: Address,
    pub name: String,
    pub goal: u128,
    pub balance: u128,
    pub approved: bool,
    pub open: bool,
    pub ipfs_hash: String,
    pub funders: HashMap<Address, u128>,
}

struct ChainData {
    network_id: u64,
    accounts: Vec<Address>,
    hashes: HashMap<Address, String>,
    registered: Vec<Address>,
    projects: Vec<MockProject>,
    balances: HashMap<Address, u128>,
    rate: u128,
    symbol: String,
    decimals: u32,
    fail_methods: HashSet<String>,
    failing_projects: HashSet<u64>,
    reject_sends: bool,
    calls: Vec<String>,
    sends: Vec<String>,
    seeded_docs: Vec<(String, Vec<u8>)>,
}

#[derive(Clone)]
pub struct MockChain {
    data: Arc<Mutex<ChainData>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        MockChain {
            data: Arc::new(Mutex::new(ChainData {
                network_id: 5777,
                accounts: vec![addr(1)],
                hashes: HashMap::new(),
                registered: Vec::new(),
                projects: Vec::new(),
                balances: HashMap::new(),
                rate: 1_000,
                symbol: "CFT".to_string(),
                decimals: 2,
                fail_methods: HashSet::new(),
                failing_projects: HashSet::new(),
                reject_sends: false,
                calls: Vec::new(),
                sends: Vec::new(),
                seeded_docs: Vec::new(),
            })),
        }
    }

    // ── builders ──────────────────────────────────────────

    pub fn with_network_id(self, id: u64) -> Self {
        self.data.lock().unwrap().network_id = id;
        self
    }

    pub fn with_accounts(self, accounts: Vec<Address>) -> Self {
        self.data.lock().unwrap().accounts = accounts;
        self
    }

    /// Register `account` with a stored hash but no document behind it.
    pub fn with_hash(self, account: Address, hash: &str) -> Self {
        {
            let mut d = self.data.lock().unwrap();
            d.hashes.insert(account.clone(), hash.to_string());
            d.registered.push(account);
        }
        self
    }

    /// Register `account` with a full profile document seeded into the
    /// content store by [`test_env`].
    pub fn with_profile(self, account: Address, username: &str, password: &str) -> Self {
        let hash = format!("Qm_{username}");
        let profile = UserProfile {
            username: username.to_string(),
            email: String::new(),
            firstname: String::new(),
            lastname: String::new(),
            password: password.to_string(),
            state: String::new(),
            city: String::new(),
        };
        {
            let mut d = self.data.lock().unwrap();
            d.hashes.insert(account.clone(), hash.clone());
            d.registered.push(account);
            d.seeded_docs
                .push((hash, serde_json::to_vec(&profile).unwrap()));
        }
        self
    }

    pub fn with_project(
        self,
        name: &str,
        owner: Address,
        goal: u128,
        balance: u128,
        approved: bool,
        open: bool,
    ) -> Self {
        self.data.lock().unwrap().projects.push(MockProject {
            owner,
            name: name.to_string(),
            goal,
            balance,
            approved,
            open,
            ipfs_hash: String::new(),
            funders: HashMap::new(),
        });
        self
    }

    /// Link a metadata hash to an already-seeded project.
    pub fn with_project_hash(self, project_id: u64, hash: &str) -> Self {
        self.data.lock().unwrap().projects[project_id as usize].ipfs_hash = hash.to_string();
        self
    }

    pub fn with_balance(self, account: Address, amount: u128) -> Self {
        self.data.lock().unwrap().balances.insert(account, amount);
        self
    }

    pub fn with_funder(self, project_id: u64, account: Address, amount: u128) -> Self {
        {
            let mut d = self.data.lock().unwrap();
            let p = &mut d.projects[project_id as usize];
            p.funders.insert(account, amount);
        }
        self
    }

    pub fn with_rate(self, rate: u128) -> Self {
        self.data.lock().unwrap().rate = rate;
        self
    }

    /// Force every read of `method` to fail with an RPC error.
    pub fn with_failing_method(self, method: &str) -> Self {
        self.data
            .lock()
            .unwrap()
            .fail_methods
            .insert(method.to_string());
        self
    }

    /// Force every per-field read of one project to fail, leaving the rest
    /// of the list healthy.
    pub fn with_failing_project(self, id: u64) -> Self {
        self.data.lock().unwrap().failing_projects.insert(id);
        self
    }

    /// Simulate the operator dismissing every wallet dialog.
    pub fn with_rejecting_sends(self) -> Self {
        self.data.lock().unwrap().reject_sends = true;
        self
    }

    // ── observers ─────────────────────────────────────────

    pub fn calls(&self) -> Vec<String> {
        self.data.lock().unwrap().calls.clone()
    }

    pub fn sends(&self) -> Vec<String> {
        self.data.lock().unwrap().sends.clone()
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        *self
            .data
            .lock()
            .unwrap()
            .balances
            .get(account)
            .unwrap_or(&0)
    }

    pub fn project(&self, id: u64) -> MockProject {
        self.data.lock().unwrap().projects[id as usize].clone()
    }

    pub fn account_hash(&self, account: &Address) -> Option<String> {
        self.data.lock().unwrap().hashes.get(account).cloned()
    }

    fn seeded_docs(&self) -> Vec<(String, Vec<u8>)> {
        self.data.lock().unwrap().seeded_docs.clone()
    }

    // ── dispatch helpers ──────────────────────────────────

    fn read(&self, contract: &Address, method: &str, args: &Value) -> Result<Value> {
        let mut d = self.data.lock().unwrap();
        d.calls.push(method.to_string());
        if d.fail_methods.contains(method) {
            return Err(ClientError::Rpc {
                code: -32000,
                message: format!("forced failure: {method}"),
            });
        }

        if *contract == hash_storage_addr() {
            return match method {
                "accountHasIpfsHash" => Ok(json!(d.hashes.contains_key(&arg_addr(args, 0)?))),
                "getAccountIpfsHash" => {
                    let account = arg_addr(args, 0)?;
                    d.hashes
                        .get(&account)
                        .map(|h| json!(h))
                        .ok_or_else(|| rpc_err("no hash stored"))
                }
                "getAccounts" => Ok(json!(d
                    .registered
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>())),
                _ => Err(rpc_err("unknown hash-storage method")),
            };
        }

        if *contract == ledger_addr() {
            if method == "getLastProjectId" {
                return Ok(json!(d.projects.len()));
            }
            if method == "projectExists" {
                let name = arg_str(args, 0)?;
                return Ok(json!(d.projects.iter().any(|p| p.name == name)));
            }
            if method == "getOwnerProjects" || method == "getUserFundedProjects" {
                let account = arg_addr(args, 0)?;
                let ids: Vec<u64> = d
                    .projects
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| match method {
                        "getOwnerProjects" => p.owner == account,
                        _ => p.funders.contains_key(&account),
                    })
                    .map(|(i, _)| i as u64)
                    .collect();
                return Ok(json!(ids));
            }

            let id = arg_u64(args, 0)? as usize;
            if d.failing_projects.contains(&(id as u64)) {
                return Err(rpc_err("forced per-project failure"));
            }
            let p = d.projects.get(id).ok_or_else(|| rpc_err("no such project"))?;
            return match method {
                "getOwner" => Ok(json!(p.owner.as_str())),
                "getName" => Ok(json!(p.name)),
                "getGoal" => Ok(json!(p.goal.to_string())),
                "getBalance" => Ok(json!(p.balance.to_string())),
                "isApproved" => Ok(json!(p.approved)),
                "isOpen" => Ok(json!(p.open)),
                "getIpfsHash" => Ok(json!(p.ipfs_hash)),
                "getFunders" => Ok(json!(p
                    .funders
                    .keys()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>())),
                "getFunderBalance" => {
                    let account = arg_addr(args, 1)?;
                    Ok(json!(p.funders.get(&account).unwrap_or(&0).to_string()))
                }
                _ => Err(rpc_err("unknown ledger method")),
            };
        }

        if *contract == token_addr() {
            return match method {
                "symbol" => Ok(json!(d.symbol)),
                "decimals" => Ok(json!(d.decimals)),
                "balanceOf" => {
                    let account = arg_addr(args, 0)?;
                    Ok(json!(d.balances.get(&account).unwrap_or(&0).to_string()))
                }
                _ => Err(rpc_err("unknown token method")),
            };
        }

        if *contract == crowdsale_addr() {
            return match method {
                "rate" => Ok(json!(d.rate.to_string())),
                "token" => Ok(json!(token_addr().as_str())),
                _ => Err(rpc_err("unknown crowdsale method")),
            };
        }

        Err(rpc_err("unknown contract"))
    }

    fn write(
        &self,
        from: &Address,
        contract: &Address,
        method: &str,
        args: &Value,
        value: Option<u128>,
    ) -> Result<Value> {
        let mut d = self.data.lock().unwrap();
        d.sends.push(method.to_string());

        if d.reject_sends {
            return Err(ClientError::Transaction(
                "rejected in the wallet dialog".to_string(),
            ));
        }
        if d.fail_methods.contains(method) {
            return Err(ClientError::Transaction(format!("revert: {method}")));
        }

        if *contract == hash_storage_addr() && method == "setAccountIpfsHash" {
            let hash = arg_str(args, 0)?;
            if d.hashes.insert(from.clone(), hash).is_none() {
                d.registered.push(from.clone());
            }
        } else if *contract == ledger_addr() {
            match method {
                "create" => {
                    let name = arg_str(args, 0)?;
                    let goal = arg_amount(args, 1)?;
                    let owner = from.clone();
                    d.projects.push(MockProject {
                        owner,
                        name,
                        goal,
                        balance: 0,
                        approved: false,
                        open: true,
                        ipfs_hash: String::new(),
                        funders: HashMap::new(),
                    });
                }
                "approve" => {
                    let id = arg_u64(args, 0)? as usize;
                    d.projects
                        .get_mut(id)
                        .ok_or_else(|| revert("no such project"))?
                        .approved = true;
                }
                "deposit" => {
                    let id = arg_u64(args, 0)? as usize;
                    let amount = arg_amount(args, 1)?;
                    let held = *d.balances.get(from).unwrap_or(&0);
                    if held < amount {
                        return Err(revert("insufficient token balance"));
                    }
                    d.balances.insert(from.clone(), held - amount);
                    *d.balances.entry(ledger_addr()).or_insert(0) += amount;
                    let p = d
                        .projects
                        .get_mut(id)
                        .ok_or_else(|| revert("no such project"))?;
                    p.balance += amount;
                    *p.funders.entry(from.clone()).or_insert(0) += amount;
                }
                "withdraw" => {
                    let id = arg_u64(args, 0)? as usize;
                    let amount = arg_amount(args, 1)?;
                    let p = d
                        .projects
                        .get_mut(id)
                        .ok_or_else(|| revert("no such project"))?;
                    let funded = *p.funders.get(from).unwrap_or(&0);
                    if funded < amount {
                        return Err(revert("exceeds funder balance"));
                    }
                    p.funders.insert(from.clone(), funded - amount);
                    p.balance -= amount;
                }
                "close" => {
                    let id = arg_u64(args, 0)? as usize;
                    d.projects
                        .get_mut(id)
                        .ok_or_else(|| revert("no such project"))?
                        .open = false;
                }
                "setIpfsHash" => {
                    let id = arg_u64(args, 0)? as usize;
                    let hash = arg_str(args, 1)?;
                    d.projects
                        .get_mut(id)
                        .ok_or_else(|| revert("no such project"))?
                        .ipfs_hash = hash;
                }
                _ => return Err(revert("unknown ledger method")),
            }
        } else if *contract == token_addr() {
            match method {
                "approve" => {
                    // Allowance bookkeeping is not observed by any test.
                }
                "transferFrom" => {
                    let source = arg_addr(args, 0)?;
                    let dest = arg_addr(args, 1)?;
                    let amount = arg_amount(args, 2)?;
                    let held = *d.balances.get(&source).unwrap_or(&0);
                    if held < amount {
                        return Err(revert("transfer exceeds balance"));
                    }
                    d.balances.insert(source, held - amount);
                    *d.balances.entry(dest).or_insert(0) += amount;
                }
                _ => return Err(revert("unknown token method")),
            }
        } else if *contract == crowdsale_addr() && method == "buyTokens" {
            let beneficiary = arg_addr(args, 0)?;
            let paid = value.ok_or_else(|| revert("no value attached"))?;
            if d.rate == 0 {
                return Err(revert("rate not set"));
            }
            let base = (paid / d.rate) * 10u128.pow(d.decimals);
            *d.balances.entry(beneficiary).or_insert(0) += base;
            let stock = d.balances.entry(crowdsale_addr()).or_insert(0);
            *stock = stock.saturating_sub(base);
        } else {
            return Err(revert("unknown contract"));
        }

        Ok(json!({ "txHash": format!("0xmock{:04x}", d.sends.len()) }))
    }
}

impl Provider for MockChain {
    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.data.lock().unwrap().accounts.clone())
    }

    async fn network_id(&self) -> Result<u64> {
        Ok(self.data.lock().unwrap().network_id)
    }

    async fn call(&self, contract: &Address, method: &str, args: Value) -> Result<Value> {
        self.read(contract, method, &args)
    }

    async fn send(
        &self,
        from: &Address,
        contract: &Address,
        method: &str,
        args: Value,
        value: Option<u128>,
    ) -> Result<Value> {
        self.write(from, contract, method, &args, value)
    }
}

// ─────────────────────────────────────────────────────────
// Argument decoding
// ─────────────────────────────────────────────────────────

fn rpc_err(message: &str) -> ClientError {
    ClientError::Rpc {
        code: -32602,
        message: message.to_string(),
    }
}

fn revert(message: &str) -> ClientError {
    ClientError::Transaction(message.to_string())
}

fn arg(args: &Value, index: usize) -> Result<&Value> {
    args.get(index)
        .ok_or_else(|| rpc_err("missing argument"))
}

fn arg_str(args: &Value, index: usize) -> Result<String> {
    arg(args, index)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| rpc_err("expected string argument"))
}

fn arg_addr(args: &Value, index: usize) -> Result<Address> {
    Address::parse(&arg_str(args, index)?)
}

fn arg_u64(args: &Value, index: usize) -> Result<u64> {
    let v = arg(args, index)?;
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| rpc_err("expected integer argument"))
}

fn arg_amount(args: &Value, index: usize) -> Result<u128> {
    let v = arg(args, index)?;
    if let Some(n) = v.as_u64() {
        return Ok(n as u128);
    }
    v.as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| rpc_err("expected amount argument"))
}

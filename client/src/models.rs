//! Domain types shared across the client: account addresses, the
//! content-addressed profile and project-metadata documents, project rows
//! read from the ledger, and the token quote used for all amount math.
//!
//! Amounts are `u128` base units everywhere. Conversion between base units
//! and display units goes through [`TokenQuote`] and is integer-only; no
//! floating point touches a currency path.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ClientError, Result};

// ─────────────────────────────────────────────────────────
// Addresses
// ─────────────────────────────────────────────────────────

/// A checksummed-agnostic account or contract address (`0x` + 40 hex chars),
/// stored lowercased so equality matches the wallet's casing-insensitive
/// behavior.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self> {
        let body = raw
            .strip_prefix("0x")
            .ok_or_else(|| ClientError::InvalidAddress(raw.to_string()))?;
        if body.len() != 40 {
            return Err(ClientError::InvalidAddress(raw.to_string()));
        }
        hex::decode(body).map_err(|_| ClientError::InvalidAddress(raw.to_string()))?;
        Ok(Address(format!("0x{}", body.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = ClientError;

    fn try_from(value: String) -> Result<Self> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> String {
        value.0
    }
}

// ─────────────────────────────────────────────────────────
// Content-addressed documents
// ─────────────────────────────────────────────────────────

/// The user profile document stored off-chain and referenced on-chain by its
/// content hash. Replaced wholesale on every write; there is no partial
/// update. Fields beyond `username` default to empty so a partially-written
/// document still decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
}

/// Project metadata document, linked from the ledger via `setIpfsHash`.
/// Like the profile it is replaced wholesale; posting an update re-stores
/// the full document under a new hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub updates: Vec<ProjectUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub posted_at: DateTime<Utc>,
    pub body: String,
}

// ─────────────────────────────────────────────────────────
// Ledger rows
// ─────────────────────────────────────────────────────────

/// One project as read from the ledger contract. `ipfs_hash` is `None` when
/// the owner never linked a metadata document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub owner: Address,
    pub name: String,
    pub goal: u128,
    pub balance: u128,
    pub approved: bool,
    pub open: bool,
    pub ipfs_hash: Option<String>,
}

impl Project {
    /// The owner may close the project once the goal is fully funded.
    pub fn goal_reached(&self) -> bool {
        self.balance >= self.goal
    }
}

// ─────────────────────────────────────────────────────────
// Token quote and amount math
// ─────────────────────────────────────────────────────────

/// Read-only token facts: display symbol, decimals (kept both as the raw
/// exponent and the 10^n multiplier), the crowdsale rate in wei per token
/// unit, and how much supply the crowdsale still holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenQuote {
    pub symbol: String,
    pub decimals: u32,
    pub multiplier: u128,
    pub rate: u128,
    pub tokens_for_sale: u128,
}

impl TokenQuote {
    pub fn new(symbol: String, decimals: u32, rate: u128, tokens_for_sale: u128) -> Result<Self> {
        let multiplier = 10u128
            .checked_pow(decimals)
            .ok_or_else(|| ClientError::AmountRange(format!("decimals {decimals} too large")))?;
        Ok(TokenQuote {
            symbol,
            decimals,
            multiplier,
            rate,
            tokens_for_sale,
        })
    }

    /// Convert whole display units into base units.
    pub fn to_base(&self, display: u128) -> Result<u128> {
        display
            .checked_mul(self.multiplier)
            .ok_or_else(|| ClientError::AmountRange(display.to_string()))
    }

    /// Convert base units back to display units, truncating any fraction.
    pub fn to_display(&self, base: u128) -> u128 {
        base / self.multiplier
    }

    /// Render a base-unit amount as a decimal string, trailing zeros
    /// trimmed. Integer division and remainder only.
    pub fn format_base(&self, base: u128) -> String {
        let whole = base / self.multiplier;
        let frac = base % self.multiplier;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{:0width$}", frac, width = self.decimals as usize);
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }

    /// Whole-number funding percentage; may exceed 100 for over-funded
    /// projects. A zero goal reports zero rather than dividing by it.
    pub fn percent_funded(&self, balance: u128, goal: u128) -> u128 {
        if goal == 0 {
            return 0;
        }
        (balance / goal).saturating_mul(100) + (balance % goal).saturating_mul(100) / goal
    }

    /// Crowdsale preview: how many display token units a wei value buys.
    pub fn token_amount(&self, value: u128) -> u128 {
        if self.rate == 0 {
            return 0;
        }
        value / self.rate
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(decimals: u32) -> TokenQuote {
        TokenQuote::new("CFT".to_string(), decimals, 1_000, 0).unwrap()
    }

    #[test]
    fn address_parse_normalizes_case() {
        let a = Address::parse("0xAB00000000000000000000000000000000000cd1").unwrap();
        let b = Address::parse("0xab00000000000000000000000000000000000CD1").unwrap();
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("0xab"));
    }

    #[test]
    fn address_parse_rejects_bad_input() {
        assert!(Address::parse("ab00").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzz00000000000000000000000000000000000000").is_err());
    }

    #[test]
    fn profile_decodes_partial_document() {
        let p: UserProfile = serde_json::from_str(r#"{"username":"ana","password":"pw"}"#).unwrap();
        assert_eq!(p.username, "ana");
        assert_eq!(p.email, "");
    }

    #[test]
    fn to_base_and_back() {
        let q = quote(2);
        assert_eq!(q.to_base(7).unwrap(), 700);
        assert_eq!(q.to_display(700), 7);
        assert_eq!(q.to_display(749), 7);
    }

    #[test]
    fn to_base_overflow_is_an_error() {
        let q = quote(18);
        assert!(q.to_base(u128::MAX / 2).is_err());
    }

    #[test]
    fn format_base_trims_fraction() {
        let q = quote(2);
        assert_eq!(q.format_base(700), "7");
        assert_eq!(q.format_base(705), "7.05");
        assert_eq!(q.format_base(750), "7.5");
        assert_eq!(q.format_base(3), "0.03");
    }

    #[test]
    fn percent_funded_is_integer_math() {
        let q = quote(2);
        assert_eq!(q.percent_funded(0, 1_000), 0);
        assert_eq!(q.percent_funded(500, 1_000), 50);
        assert_eq!(q.percent_funded(1_000, 1_000), 100);
        assert_eq!(q.percent_funded(1_500, 1_000), 150);
        assert_eq!(q.percent_funded(333, 1_000), 33);
        assert_eq!(q.percent_funded(1, 0), 0);
    }

    #[test]
    fn percent_funded_survives_large_balances() {
        let q = quote(18);
        let big = u128::MAX / 50;
        assert_eq!(q.percent_funded(big, big), 100);
    }

    #[test]
    fn token_amount_preview() {
        let q = quote(2);
        assert_eq!(q.token_amount(5_000), 5);
        assert_eq!(q.token_amount(999), 0);
        let zero_rate = TokenQuote::new("CFT".into(), 2, 0, 0).unwrap();
        assert_eq!(zero_rate.token_amount(5_000), 0);
    }

    #[test]
    fn goal_reached_at_and_past_goal() {
        let owner = Address::parse("0x0000000000000000000000000000000000000001").unwrap();
        let mut p = Project {
            id: 0,
            owner,
            name: "p".into(),
            goal: 100,
            balance: 99,
            approved: true,
            open: true,
            ipfs_hash: None,
        };
        assert!(!p.goal_reached());
        p.balance = 100;
        assert!(p.goal_reached());
    }
}

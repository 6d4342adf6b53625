//! One-time anti-forgery tokens scoped to an authenticated principal.
//!
//! Token format: `{random_hex}.{issued_at_millis}.{hmac_hex}` where the HMAC-SHA256
//! is computed over `random_hex + issued_at_millis + principal_id`.
//!
//! The guard keeps at most one live token per principal (last issued wins).
//! A token is consumed by its first successful validation; expired records are
//! reclaimed by [`TokenGuard::sweep`], which `jobs::sweep` runs periodically.
//! State is in-process only, so a restart invalidates every outstanding token.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Default validity window for an issued token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Longest validity window the guard accepts.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Bytes of randomness per token (256 bits).
const RANDOM_BYTES: usize = 32;

// ── Clock ────────────────────────────────────────────────────

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Settable clock for tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self(AtomicI64::new(start_millis))
    }

    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Records ──────────────────────────────────────────────────

/// The live token held for one principal.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub token: String,
    /// Absolute expiry, epoch millis.
    pub expires_at: i64,
}

impl TokenRecord {
    fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Outcome of a validation attempt. Only `Accepted` consumes the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    Missing,
    Expired,
    Mismatch,
}

impl Validation {
    pub fn is_accepted(self) -> bool {
        matches!(self, Validation::Accepted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Validation::Accepted => "accepted",
            Validation::Missing => "missing",
            Validation::Expired => "expired",
            Validation::Mismatch => "mismatch",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("CSRF signing secret must not be empty")]
    EmptySecret,

    #[error("CSRF token TTL must be between 1ms and {max_secs}s, got {got_millis}ms")]
    InvalidTtl { got_millis: u128, max_secs: u64 },
}

// ── Guard ────────────────────────────────────────────────────

/// Shared, cheaply-cloneable token store.
#[derive(Clone)]
pub struct TokenGuard {
    records: Arc<DashMap<String, TokenRecord>>,
    mac: HmacSha256,
    ttl_millis: i64,
    clock: Arc<dyn Clock>,
}

impl TokenGuard {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, GuardError> {
        Self::with_clock(secret, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        secret: &[u8],
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GuardError> {
        if secret.is_empty() {
            return Err(GuardError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| GuardError::EmptySecret)?;
        let invalid_ttl = || GuardError::InvalidTtl {
            got_millis: ttl.as_millis(),
            max_secs: MAX_TOKEN_TTL.as_secs(),
        };
        if ttl.is_zero() || ttl > MAX_TOKEN_TTL {
            return Err(invalid_ttl());
        }
        let ttl_millis = i64::try_from(ttl.as_millis()).map_err(|_| invalid_ttl())?;
        Ok(Self {
            records: Arc::new(DashMap::new()),
            mac,
            ttl_millis,
            clock,
        })
    }

    /// Issue a fresh token for `principal_id`, replacing any unconsumed one.
    pub fn issue(&self, principal_id: &str) -> String {
        let mut random = [0u8; RANDOM_BYTES];
        OsRng.fill_bytes(&mut random);
        let random_hex = hex::encode(random);

        let issued_at = self.clock.now_millis();
        let signature = self.sign(&random_hex, issued_at, principal_id);
        let token = format!("{}.{}.{}", random_hex, issued_at, signature);

        let replaced = self
            .records
            .insert(
                principal_id.to_string(),
                TokenRecord {
                    token: token.clone(),
                    expires_at: issued_at.saturating_add(self.ttl_millis),
                },
            )
            .is_some();

        tracing::debug!(principal = principal_id, replaced, "issued csrf token");
        token
    }

    /// Check `candidate` against the live token for `principal_id`.
    ///
    /// On success the record is removed in the same map operation, so concurrent
    /// validations of one token yield a single `Accepted`. Failures leave the
    /// record in place.
    pub fn check(&self, principal_id: &str, candidate: &str) -> Validation {
        let now = self.clock.now_millis();
        let consumed = self.records.remove_if(principal_id, |_, record| {
            !record.is_expired(now) && tokens_match(&record.token, candidate)
        });
        if consumed.is_some() {
            return Validation::Accepted;
        }

        match self.records.get(principal_id) {
            None => Validation::Missing,
            Some(record) if record.is_expired(now) => Validation::Expired,
            Some(_) => Validation::Mismatch,
        }
    }

    /// Boolean form of [`TokenGuard::check`].
    pub fn validate(&self, principal_id: &str, candidate: &str) -> bool {
        self.check(principal_id, candidate).is_accepted()
    }

    /// Live token for `principal_id` without consuming it.
    pub fn peek(&self, principal_id: &str) -> Option<String> {
        let now = self.clock.now_millis();
        self.records
            .get(principal_id)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.token.clone())
    }

    /// Drop every record whose expiry has passed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = record.expires_at >= now;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of records currently held, expired or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sign(&self, random_hex: &str, issued_at: i64, principal_id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(random_hex.as_bytes());
        mac.update(issued_at.to_string().as_bytes());
        mac.update(principal_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

fn tokens_match(stored: &str, candidate: &str) -> bool {
    stored.as_bytes().ct_eq(candidate.as_bytes()).into()
}

// ── Tests ───────────────────────────────────────────────────────

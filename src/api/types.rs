//! Shared types for the API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::core_state::CoreState;
use crate::models::enums::StaffRole;

/// Failed logins before a badge is locked out.
const LOCKOUT_THRESHOLD: u32 = 5;

/// Lockout duration after repeated failures (15 minutes).
const LOCKOUT_SECS: u64 = 900;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus API-specific caches.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub login_lockout: Arc<Mutex<LoginLockout>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
            login_lockout: Arc::new(Mutex::new(LoginLockout::new())),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Staff context — injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated staff context, injected into request extensions
/// by the auth middleware after successful token validation.
#[derive(Debug, Clone)]
pub struct StaffContext {
    pub staff_id: Uuid,
    pub badge: String,
    pub name: String,
    pub role: StaffRole,
    /// Hash of the presented bearer token; logout revokes by it.
    pub token_hash: [u8; 32],
}

// ═══════════════════════════════════════════════════════════
// Token helpers
// ═══════════════════════════════════════════════════════════

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ═══════════════════════════════════════════════════════════
// Rate limiter — sliding windows per source
// ═══════════════════════════════════════════════════════════

const MINUTE_LIMIT: usize = 100;
const HOUR_LIMIT: usize = 1000;

/// Sliding-window rate limiter keyed by request source.
pub struct RateLimiter {
    hits: HashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { hits: HashMap::new() }
    }

    /// Record a hit; `Err(retry_after_secs)` when a window is exhausted.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        let hits = self.hits.entry(key.to_string()).or_default();
        hits.retain(|t| now.duration_since(*t) < Duration::from_secs(3600));

        let last_minute = hits
            .iter()
            .filter(|t| now.duration_since(**t) < Duration::from_secs(60))
            .count();
        if last_minute >= MINUTE_LIMIT {
            return Err(60);
        }
        if hits.len() >= HOUR_LIMIT {
            return Err(3600);
        }
        hits.push(now);
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// Login lockout — per badge
// ═══════════════════════════════════════════════════════════

/// Tracks failed login attempts per badge and locks the badge out after
/// repeated failures.
pub struct LoginLockout {
    failures: HashMap<String, (u32, Instant)>,
}

impl LoginLockout {
    pub fn new() -> Self {
        Self { failures: HashMap::new() }
    }

    pub fn is_locked(&self, badge: &str) -> bool {
        match self.failures.get(badge) {
            Some((count, last)) => {
                *count >= LOCKOUT_THRESHOLD
                    && last.elapsed() < Duration::from_secs(LOCKOUT_SECS)
            }
            None => false,
        }
    }

    pub fn record_failure(&mut self, badge: &str) {
        let entry = self.failures.entry(badge.to_string()).or_insert((0, Instant::now()));
        // A stale failure streak restarts
        if entry.1.elapsed() >= Duration::from_secs(LOCKOUT_SECS) {
            *entry = (0, Instant::now());
        }
        entry.0 += 1;
        entry.1 = Instant::now();
    }

    pub fn clear(&mut self, badge: &str) {
        self.failures.remove(badge);
    }
}

impl Default for LoginLockout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_stable_and_distinct() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), hash_token("other"));
    }

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn rate_limiter_blocks_after_minute_limit() {
        let mut limiter = RateLimiter::new();
        for _ in 0..MINUTE_LIMIT {
            assert!(limiter.check("nurse-station-3").is_ok());
        }
        assert_eq!(limiter.check("nurse-station-3"), Err(60));
        // Other sources are unaffected
        assert!(limiter.check("nurse-station-4").is_ok());
    }

    #[test]
    fn lockout_after_threshold_failures() {
        let mut lockout = LoginLockout::new();
        assert!(!lockout.is_locked("N1001"));
        for _ in 0..LOCKOUT_THRESHOLD {
            lockout.record_failure("N1001");
        }
        assert!(lockout.is_locked("N1001"));
        assert!(!lockout.is_locked("N1002"));

        lockout.clear("N1001");
        assert!(!lockout.is_locked("N1001"));
    }
}

//! Session-stored share unlocks.
//!
//! A browsing session remembers which password-protected links it has
//! unlocked so navigation does not re-prompt. Each entry is pinned to the
//! issue time of the grant it unlocked: regenerating the share (new token or
//! new password) makes the entry stale. The gateway re-resolves the link on
//! every read, so a disabled link stops working regardless of this cache.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use salon_crm_core::ShareCode;
use serde::{Deserialize, Serialize};

/// Maximum number of unlocked links remembered per session.
const MAX_UNLOCKED: usize = 32;

/// Links unlocked in the current browsing session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareSession {
    unlocked: HashMap<ShareCode, DateTime<Utc>>,
}

impl ShareSession {
    /// Whether `code` was unlocked for the grant issued at `issued_at`.
    #[must_use]
    pub fn is_unlocked(&self, code: &ShareCode, issued_at: DateTime<Utc>) -> bool {
        self.unlocked.get(code) == Some(&issued_at)
    }

    /// Remember that `code` was unlocked for the grant issued at `issued_at`.
    ///
    /// The oldest entry is evicted once the session holds too many.
    pub fn mark_unlocked(&mut self, code: ShareCode, issued_at: DateTime<Utc>) {
        if self.unlocked.len() >= MAX_UNLOCKED && !self.unlocked.contains_key(&code) {
            let oldest = self
                .unlocked
                .iter()
                .min_by_key(|(_, issued)| **issued)
                .map(|(code, _)| code.clone());
            if let Some(oldest) = oldest {
                self.unlocked.remove(&oldest);
            }
        }
        self.unlocked.insert(code, issued_at);
    }

    /// Number of remembered unlocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.unlocked.len()
    }

    /// Whether nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty()
    }
}

/// Session keys for share data.
pub mod keys {
    /// Key for the [`super::ShareSession`] unlock cache.
    pub const SHARE_UNLOCKS: &str = "share_unlocks";
}

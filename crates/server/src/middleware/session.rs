//! Session middleware configuration.
//!
//! Share unlocks live only as long as the browser session: the store is an
//! in-process bounded cache and the cookie has no expiry, so nothing about an
//! unlock is persisted durably.

use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;

use crate::config::CrmConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "crm_share";

/// Maximum number of live sessions kept in memory.
///
/// Past this the least recently used sessions are dropped and their visitors
/// are asked for the password again.
const SESSION_CACHE_CAPACITY: u64 = 50_000;

/// Create the session layer with a bounded in-memory store.
///
/// # Arguments
///
/// * `config` - Service configuration (for the cookie `Secure` flag)
#[must_use]
pub fn create_session_layer(config: &CrmConfig) -> SessionManagerLayer<MokaStore> {
    SessionManagerLayer::new(MokaStore::new(Some(SESSION_CACHE_CAPACITY)))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/s")
}

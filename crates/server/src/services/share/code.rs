//! Share token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use salon_crm_core::ShareCode;

use crate::services::CrmError;

/// Random bytes per token (128 bits).
const TOKEN_BYTES: usize = 16;

/// Generate a fresh share code: 128 random bits, base64url without padding
/// (22 characters).
///
/// # Errors
///
/// Returns `CrmError::Internal` if the encoded token is rejected by
/// `ShareCode::parse`, which would mean the encoding constants are wrong.
pub fn generate() -> Result<ShareCode, CrmError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let encoded = URL_SAFE_NO_PAD.encode(bytes);
    ShareCode::parse(&encoded).map_err(|e| CrmError::Internal(format!("generated share code: {e}")))
}

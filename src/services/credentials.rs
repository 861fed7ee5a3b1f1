//! Credential generation: agent/dashboard API keys and claim tokens.
//!
//! All secrets are 32 bytes of OS randomness rendered as hex behind a
//! class-specific prefix (`cp_` for API keys, `clp_` for claim tokens).
//! Only the SHA-256 digest and a short display prefix are ever stored.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Prefix marking API keys (agent and dashboard alike)
pub const API_KEY_PREFIX: &str = "cp_";
/// Prefix marking single-use claim tokens
pub const CLAIM_TOKEN_PREFIX: &str = "clp_";

/// Number of leading raw-key characters safe to display and log
const DISPLAY_PREFIX_LEN: usize = 12;

/// A freshly generated API key. `raw` is handed to the caller exactly once
/// and must never be persisted; `hash` and `prefix` are what gets stored.
#[derive(Debug, Clone)]
pub struct ApiCredential {
    pub raw: String,
    pub hash: String,
    pub prefix: String,
}

/// Service producing unguessable secrets and their storage-safe forms
#[derive(Debug, Clone, Default)]
pub struct CredentialService;

impl CredentialService {
    pub fn new() -> Self {
        Self
    }

    /// Generate a raw API key plus its stored digest and display prefix
    pub fn generate_api_key(&self) -> ApiCredential {
        let raw = format!("{API_KEY_PREFIX}{}", random_hex());
        let hash = hash_key(&raw);
        let prefix = format!("{}...", &raw[..DISPLAY_PREFIX_LEN]);

        ApiCredential { raw, hash, prefix }
    }

    /// Generate a single-use claim token. A distinct prefix keeps the two
    /// credential classes visually and programmatically separate.
    pub fn generate_claim_token(&self) -> String {
        format!("{CLAIM_TOKEN_PREFIX}{}", random_hex())
    }
}

/// Deterministic one-way digest of a raw credential, shared by generation
/// and authentication
pub fn hash_key(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(digest)
}

/// 32 bytes (256 bits) of OS randomness as lowercase hex
fn random_hex() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

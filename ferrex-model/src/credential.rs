use serde::{Deserialize, Serialize};

/// A passkey credential row. The ceremony cryptography itself is a host
/// concern (§1); the catalog only stores the attested result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub credential_id: String,
    #[serde(skip_serializing)]
    pub public_key: Vec<u8>,
    pub attestation_type: String,
    pub aaguid: String,
    pub sign_count: i64,
    pub name: String,
    pub transports: Vec<String>,
    pub created_at: i64,
    pub last_used_at: Option<i64>,
}

/// Ephemeral WebAuthn ceremony state (registration or authentication).
/// TTL 5 minutes; consumed on read (§3, §4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CeremonyChallenge {
    pub session_id: String,
    #[serde(skip_serializing)]
    pub session_data: Vec<u8>,
    pub expires_at: i64,
}

pub const CEREMONY_TTL_SECONDS: i64 = 5 * 60;

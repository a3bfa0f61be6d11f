//! API key store: issuance, validation, revocation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// Marker every issued secret starts with.
pub const SECRET_MARKER: &str = "gpu_";

/// Number of random bytes behind the marker.
const SECRET_BYTES: usize = 24;

/// Characters of the plaintext kept for display.
const PREFIX_LEN: usize = 8;

/// Id of the synthetic credential returned for the admin secret.
pub const ADMIN_ID: &str = "admin";

/// A stored API key. Secret material is never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub secret_hash: String,
    pub prefix: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Credential {
    fn admin() -> Self {
        Self {
            id: ADMIN_ID.to_string(),
            name: "Admin".to_string(),
            secret_hash: String::new(),
            prefix: "admin".to_string(),
            created_at: DateTime::<Utc>::default(),
            last_used_at: None,
        }
    }
}

/// Result of [`CredentialStore::issue`]. The only place the plaintext secret appears.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub id: String,
    pub secret: String,
    pub record: Credential,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to generate key material: {0}")]
    Randomness(String),
}

#[derive(Debug, Default)]
struct Maps {
    by_id: HashMap<String, Credential>,
    /// secret hash -> credential id
    by_hash: HashMap<String, String>,
}

/// In-memory API key store.
#[derive(Debug, Default)]
pub struct CredentialStore {
    admin_key: Option<String>,
    maps: RwLock<Maps>,
}

impl CredentialStore {
    /// Create a store. `admin_key` bypasses the store when presented as a bearer secret.
    pub fn new(admin_key: Option<String>) -> Self {
        Self {
            admin_key: admin_key.filter(|k| !k.is_empty()),
            maps: RwLock::new(Maps::default()),
        }
    }

    /// Issue a new key. The returned secret cannot be recovered later.
    pub async fn issue(&self, name: &str) -> Result<IssuedCredential, CredentialError> {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CredentialError::Randomness(e.to_string()))?;

        let secret = format!("{}{}", SECRET_MARKER, hex::encode(bytes));
        let id = uuid::Uuid::new_v4().to_string();
        let record = Credential {
            id: id.clone(),
            name: name.to_string(),
            secret_hash: hash_secret(&secret),
            prefix: secret.chars().take(PREFIX_LEN).collect(),
            created_at: Utc::now(),
            last_used_at: None,
        };

        {
            let mut maps = self.maps.write().await;
            maps.by_hash.insert(record.secret_hash.clone(), id.clone());
            maps.by_id.insert(id.clone(), record.clone());
        }

        tracing::info!(key_id = %id, name = %name, "Issued API key");

        Ok(IssuedCredential { id, secret, record })
    }

    /// Resolve an `Authorization` header value to a credential.
    pub async fn validate(&self, auth_header: Option<&str>) -> Option<Credential> {
        let secret = auth_header?.strip_prefix("Bearer ")?.trim();

        if let Some(admin_key) = &self.admin_key {
            if constant_time_eq(secret.as_bytes(), admin_key.as_bytes()) {
                return Some(Credential::admin());
            }
        }

        if !secret.starts_with(SECRET_MARKER) {
            return None;
        }

        let hash = hash_secret(secret);
        let maps = self.maps.read().await;
        let id = maps.by_hash.get(&hash)?;
        let record = maps.by_id.get(id)?;

        if !constant_time_eq(hash.as_bytes(), record.secret_hash.as_bytes()) {
            return None;
        }

        Some(record.clone())
    }

    /// Remove a key. Returns whether anything was removed.
    pub async fn revoke(&self, id: &str) -> bool {
        let mut maps = self.maps.write().await;
        match maps.by_id.remove(id) {
            Some(record) => {
                maps.by_hash.remove(&record.secret_hash);
                tracing::info!(key_id = %id, "Revoked API key");
                true
            }
            None => false,
        }
    }

    /// Record that a key was just used. Unknown ids are ignored.
    pub async fn touch(&self, id: &str) {
        if let Some(record) = self.maps.write().await.by_id.get_mut(id) {
            record.last_used_at = Some(Utc::now());
        }
    }

    /// All keys, oldest first.
    pub async fn list(&self) -> Vec<Credential> {
        let mut records: Vec<Credential> = self.maps.read().await.by_id.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    pub async fn get(&self, id: &str) -> Option<Credential> {
        self.maps.read().await.by_id.get(id).cloned()
    }
}

/// Lowercase hex SHA-256 of a secret.
fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bearer(secret: &str) -> String {
        format!("Bearer {}", secret)
    }

    #[tokio::test]
    async fn test_issue_returns_secret_once() {
        let store = CredentialStore::default();
        let issued = store.issue("test-key").await.unwrap();

        assert!(!issued.id.is_empty());
        let hex_part = issued.secret.strip_prefix(SECRET_MARKER).unwrap();
        assert_eq!(hex_part.len(), SECRET_BYTES * 2);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(issued.record.name, "test-key");
        assert_eq!(issued.record.prefix, &issued.secret[..8]);
        assert_ne!(issued.record.secret_hash, issued.secret);
    }

    #[tokio::test]
    async fn test_validate_correct_key() {
        let store = CredentialStore::default();
        let issued = store.issue("test").await.unwrap();

        let record = store.validate(Some(&bearer(&issued.secret))).await.unwrap();
        assert_eq!(record.id, issued.id);
    }

    #[tokio::test]
    async fn test_validate_trims_whitespace() {
        let store = CredentialStore::default();
        let issued = store.issue("test").await.unwrap();

        let header = format!("Bearer   {}  ", issued.secret);
        assert!(store.validate(Some(&header)).await.is_some());
    }

    #[tokio::test]
    async fn test_rejects_invalid_or_missing_auth() {
        let store = CredentialStore::default();
        let issued = store.issue("test").await.unwrap();

        assert!(store.validate(None).await.is_none());
        assert!(store.validate(Some("Bearer invalid")).await.is_none());
        assert!(store.validate(Some(&issued.secret)).await.is_none());
        assert!(store.validate(Some(&format!("Basic {}", issued.secret))).await.is_none());
        assert!(store.validate(Some(&bearer(&format!("{}x", issued.secret)))).await.is_none());
    }

    #[tokio::test]
    async fn test_any_altered_character_is_rejected() {
        let store = CredentialStore::default();
        let issued = store.issue("test").await.unwrap();

        for i in 0..issued.secret.len() {
            let mut altered: Vec<char> = issued.secret.chars().collect();
            altered[i] = if altered[i] == 'z' { 'y' } else { 'z' };
            let altered: String = altered.into_iter().collect();
            assert!(
                store.validate(Some(&bearer(&altered))).await.is_none(),
                "altered position {} still validated",
                i
            );
        }
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = CredentialStore::default();
        let issued = store.issue("test").await.unwrap();

        assert!(store.revoke(&issued.id).await);
        assert!(store.validate(Some(&bearer(&issued.secret))).await.is_none());
        assert!(!store.revoke(&issued.id).await);
        assert!(!store.revoke("nonexistent").await);
    }

    #[tokio::test]
    async fn test_list_and_revoke_keeps_others_valid() {
        let store = CredentialStore::default();
        let a = store.issue("a").await.unwrap();
        let b = store.issue("b").await.unwrap();

        let list = store.list().await;
        assert_eq!(list.len(), 2);

        assert!(store.revoke(&a.id).await);
        assert_eq!(store.list().await.len(), 1);
        assert!(store.validate(Some(&bearer(&b.secret))).await.is_some());
    }

    #[tokio::test]
    async fn test_admin_key_bypasses_store() {
        let store = CredentialStore::new(Some("root-secret".to_string()));

        let record = store.validate(Some("Bearer root-secret")).await.unwrap();
        assert_eq!(record.id, ADMIN_ID);
        assert!(store.validate(Some("Bearer root-secreT")).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_admin_key_never_matches() {
        let store = CredentialStore::new(Some(String::new()));
        assert!(store.validate(Some("Bearer ")).await.is_none());
    }

    #[tokio::test]
    async fn test_touch_sets_last_used() {
        let store = CredentialStore::default();
        let issued = store.issue("test").await.unwrap();
        assert!(store.get(&issued.id).await.unwrap().last_used_at.is_none());

        store.touch(&issued.id).await;
        store.touch("unknown").await;

        assert!(store.get(&issued.id).await.unwrap().last_used_at.is_some());
    }

    #[test]
    fn test_serialized_credential_has_no_secret_material() {
        let record = Credential {
            id: "id-1".to_string(),
            name: "ci".to_string(),
            secret_hash: "deadbeef".to_string(),
            prefix: "gpu_abcd".to_string(),
            created_at: Utc::now(),
            last_used_at: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("deadbeef"));
        assert!(json.contains("createdAt"));
        assert!(!json.contains("lastUsedAt"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}

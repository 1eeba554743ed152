use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Registry of tokens explicitly invalidated before their natural expiry.
///
/// The auth service and route guard depend only on this trait; swapping in
/// a durable backing (shared cache) requires no changes above this seam.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record a token as revoked. Idempotent.
    async fn revoke(&self, token: &str);

    async fn is_revoked(&self, token: &str) -> bool;
}

/// Process-lifetime in-memory registry. A restart forgets all revocations,
/// leaving revoked-but-unexpired tokens cryptographically valid until they
/// expire on their own; that tradeoff is accepted for this backing.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    tokens: RwLock<HashSet<String>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token: &str) {
        let mut tokens = self.tokens.write().await;
        tokens.insert(token.to_string());
    }

    async fn is_revoked(&self, token: &str) -> bool {
        let tokens = self.tokens.read().await;
        tokens.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let store = InMemoryRevocationStore::new();
        assert!(!store.is_revoked("tok").await);

        store.revoke("tok").await;
        store.revoke("tok").await;

        assert!(store.is_revoked("tok").await);
        assert!(!store.is_revoked("other").await);
    }
}

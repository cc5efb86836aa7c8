use crate::breaker::{OutageStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-local [`OutageStore`] keyed on the tokio clock.
#[derive(Default)]
pub struct InMemoryOutageStore {
    deadlines: Mutex<HashMap<String, Instant>>,
}

impl InMemoryOutageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutageStore for InMemoryOutageStore {
    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut deadlines = self.deadlines.lock().await;
        deadlines.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let mut deadlines = self.deadlines.lock().await;
        let Some(deadline) = deadlines.get(key) else {
            return Ok(None);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            deadlines.remove(key);
            return Ok(None);
        }
        Ok(Some(whole_seconds(remaining)))
    }
}

/// Rounds up so a flag with sub-second life left is never reported as 0.
pub(crate) fn whole_seconds(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn absent_key_has_no_ttl() {
        let store = InMemoryOutageStore::new();
        assert_eq!(store.remaining_ttl("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_expire_independently() {
        // Arrange
        let store = InMemoryOutageStore::new();
        store
            .set_with_ttl("short", Duration::from_secs(10))
            .await
            .unwrap();
        store
            .set_with_ttl("long", Duration::from_secs(100))
            .await
            .unwrap();

        // Act
        tokio::time::advance(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(store.remaining_ttl("short").await.unwrap(), None);
        assert_eq!(store.remaining_ttl("long").await.unwrap(), Some(90));
    }

    #[test]
    fn whole_seconds_rounds_up_partial_seconds() {
        assert_eq!(whole_seconds(Duration::from_millis(400)), 1);
        assert_eq!(whole_seconds(Duration::from_secs(3500)), 3500);
        assert_eq!(whole_seconds(Duration::from_millis(3500_001)), 3501);
    }
}

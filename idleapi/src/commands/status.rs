use crate::breaker::OutageBreaker;

/// What the developer-only `outage` command reports.
pub async fn outage_status(breaker: &OutageBreaker) -> String {
    match breaker.remaining().await {
        Some(remaining) => format!(
            "The API is marked as down for another {remaining} seconds (window: {} seconds).",
            breaker.window().as_secs()
        ),
        None => "The API is not marked as down.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::{InMemoryOutageStore, MockOutageStore, StoreError};
    use std::sync::Arc;
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn test_outage_status_reports_remaining_seconds() {
        // Arrange
        let breaker = OutageBreaker::new(Arc::new(InMemoryOutageStore::new()), "travapi:520", WINDOW);
        breaker.record_outage().await;
        tokio::time::advance(Duration::from_secs(100)).await;

        // Act
        let status = outage_status(&breaker).await;

        // Assert
        assert_eq!(
            status,
            "The API is marked as down for another 3500 seconds (window: 3600 seconds)."
        );
    }

    #[tokio::test]
    async fn test_outage_status_when_store_fails() {
        // Arrange
        let mut store = MockOutageStore::new();
        store
            .expect_remaining_ttl()
            .returning(|_| Err(StoreError::Unavailable("down".into())));
        let breaker = OutageBreaker::new(Arc::new(store), "travapi:520", WINDOW);

        // Act
        let status = outage_status(&breaker).await;

        // Assert
        assert_eq!(status, "The API is not marked as down.");
    }
}

use crate::connectors::discord::{DiscordConnector, Error, MessageId};
use crate::paginator::{bare_emoji, release_controls};
use futures::StreamExt;
use log::debug;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

pub const YES: &str = "✅";
pub const NO: &str = "❎";
pub const DISMISS: &str = "🗑";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Yes,
    No,
    TimedOut,
}

/// Asks `viewer` a yes/no question with two reactions. The prompt is deleted afterwards.
pub async fn confirm<C: DiscordConnector + ?Sized>(
    connector: &C,
    question: &str,
    viewer: u64,
    timeout: Duration,
) -> Result<Choice, Error> {
    if viewer == connector.bot_id() {
        return Ok(Choice::No);
    }
    let message_id = connector.send_message(question).await?;
    let mut reactions = connector.watch_reactions(message_id);
    for emoji in [YES, NO] {
        connector.add_reaction(message_id, emoji).await?;
    }

    let deadline = Instant::now() + timeout;
    let choice = loop {
        match timeout_at(deadline, reactions.next()).await {
            Ok(Some(event)) if event.user_id == viewer && event.message_id == message_id => {
                match bare_emoji(&event.emoji) {
                    YES => break Choice::Yes,
                    NO => break Choice::No,
                    _ => {}
                }
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break Choice::TimedOut,
        }
    };

    if let Err(e) = connector.delete_message(message_id).await {
        debug!("Could not delete prompt {}: {}", message_id, e);
    }
    Ok(choice)
}

/// Adds a 🗑 control that lets `viewer` delete the message until `timeout` passes.
pub async fn dismissable<C: DiscordConnector + ?Sized>(
    connector: &C,
    message_id: MessageId,
    viewer: u64,
    timeout: Duration,
) -> Result<(), Error> {
    let mut reactions = connector.watch_reactions(message_id);
    connector.add_reaction(message_id, DISMISS).await?;

    let deadline = Instant::now() + timeout;
    loop {
        match timeout_at(deadline, reactions.next()).await {
            Ok(Some(event))
                if event.user_id == viewer
                    && event.message_id == message_id
                    && bare_emoji(&event.emoji) == DISMISS =>
            {
                if let Err(e) = connector.delete_message(message_id).await {
                    debug!("Could not delete dismissed message {}: {}", message_id, e);
                }
                return Ok(());
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }

    release_controls(connector, message_id, &[DISMISS]).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginator::testing::{Call, FakeConnector};

    const VIEWER: u64 = 42;
    const TIMEOUT: Duration = Duration::from_secs(20);

    #[tokio::test(start_paused = true)]
    async fn confirm_yes_deletes_prompt() {
        // Arrange
        let connector = FakeConnector::new(VIEWER).react(VIEWER, YES);

        // Act
        let choice = confirm(&connector, "Continue?", VIEWER, TIMEOUT).await.unwrap();

        // Assert
        assert_eq!(choice, Choice::Yes);
        assert_eq!(
            connector.calls(),
            vec![
                Call::Message("Continue?".into()),
                Call::React(500, YES.into()),
                Call::React(500, NO.into()),
                Call::Delete(500),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_ignores_other_users() {
        // Arrange
        let connector = FakeConnector::new(VIEWER)
            .react(7, YES)
            .react(VIEWER, NO);

        // Act
        let choice = confirm(&connector, "Continue?", VIEWER, TIMEOUT).await.unwrap();

        // Assert
        assert_eq!(choice, Choice::No);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_times_out() {
        // Arrange
        let connector = FakeConnector::new(VIEWER).react(VIEWER, "🎉");
        let start = Instant::now();

        // Act
        let choice = confirm(&connector, "Continue?", VIEWER, TIMEOUT).await.unwrap();

        // Assert
        assert_eq!(choice, Choice::TimedOut);
        assert_eq!(Instant::now() - start, TIMEOUT);
        assert_eq!(connector.calls().last(), Some(&Call::Delete(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_for_the_bot_itself_is_no() {
        let connector = FakeConnector::new(VIEWER);
        let choice = confirm(&connector, "Continue?", connector.bot, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(choice, Choice::No);
        assert!(connector.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dismissable_is_deleted_by_viewer() {
        // Arrange
        let connector = FakeConnector::new(VIEWER)
            .react(3, DISMISS)
            .react(VIEWER, DISMISS);

        // Act
        dismissable(&connector, 500, VIEWER, TIMEOUT).await.unwrap();

        // Assert
        assert_eq!(connector.calls().last(), Some(&Call::Delete(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn dismissable_accepts_variation_selector() {
        // Arrange
        let connector = FakeConnector::new(VIEWER).react(VIEWER, "🗑\u{fe0f}");

        // Act
        dismissable(&connector, 500, VIEWER, TIMEOUT).await.unwrap();

        // Assert
        assert_eq!(connector.calls().last(), Some(&Call::Delete(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn dismissable_falls_back_to_own_reaction() {
        // Arrange
        let mut connector = FakeConnector::new(VIEWER);
        connector.can_clear = false;

        // Act
        dismissable(&connector, 500, VIEWER, TIMEOUT).await.unwrap();

        // Assert
        assert_eq!(
            connector.calls().last(),
            Some(&Call::UnreactOwn(500, DISMISS.into()))
        );
    }
}

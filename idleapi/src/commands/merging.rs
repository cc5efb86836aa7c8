use crate::api::{Gateway, query};
use crate::args::MergeTarget;
use crate::commands::Error;
use crate::connectors::discord::DiscordConnector;
use crate::merge;
use crate::model::Item;
use crate::paginator::{self, Choice, Timeouts};
use log::{debug, info};

pub const CANCELLED: &str = "Command cancelled.";
pub const NOT_OWNED: &str = "This item does not belong to you, continue anyway?";
pub const EQUIPPED: &str = "This item is currently equipped, continue anyway?";
pub const NO_PARTNER: &str = "No fitting items found...";

pub struct MergeService<'a, DISCORD: DiscordConnector> {
    gateway: &'a Gateway,
    discord: &'a DISCORD,
    timeouts: Timeouts,
}

impl<'a, DISCORD: DiscordConnector> MergeService<'a, DISCORD> {
    pub fn new(gateway: &'a Gateway, discord: &'a DISCORD, timeouts: Timeouts) -> Self {
        Self {
            gateway,
            discord,
            timeouts,
        }
    }

    /// Suggests the best partner for the target item.
    pub async fn merge(&self, target: MergeTarget) -> Result<(), Error> {
        let author = self.discord.author_id();
        let source_query = match target {
            MergeTarget::ItemId(id) => query::merge_source_by_id(id),
            MergeTarget::Type(item_type) => query::merge_source_by_type(item_type, author),
        };
        let sources: Vec<Item> = self.gateway.fetch_as(&source_query).await?;
        let Some(source) = sources.into_iter().next() else {
            self.discord.send_reply(&source_not_found(&target)).await?;
            return Ok(());
        };

        if !merge::can_merge(&source) {
            self.discord.send_reply(merge::AT_MAX).await?;
            return Ok(());
        }
        if source.owner as u64 != author && !self.confirmed(NOT_OWNED).await? {
            return Ok(());
        }
        if source.is_equipped() && !self.confirmed(EQUIPPED).await? {
            return Ok(());
        }

        let candidates: Vec<Item> = self
            .gateway
            .fetch_as(&query::merge_candidates(&source))
            .await?;
        match merge::suggest(&source, candidates) {
            Some(suggestion) => {
                info!(
                    "Suggesting {} for {} out of {} candidates",
                    suggestion.partner.id, source.id, suggestion.found
                );
                self.discord
                    .send_reply(&merge::render(&source, &suggestion))
                    .await?;
            }
            None => {
                self.discord.send_reply(NO_PARTNER).await?;
            }
        }
        Ok(())
    }

    // A declined prompt says so; a timed out one stays silent.
    async fn confirmed(&self, question: &str) -> Result<bool, Error> {
        let choice = paginator::confirm(
            self.discord,
            question,
            self.discord.author_id(),
            self.timeouts.confirmation,
        )
        .await?;
        match choice {
            Choice::Yes => Ok(true),
            Choice::No => {
                self.discord.send_reply(CANCELLED).await?;
                Ok(false)
            }
            Choice::TimedOut => {
                debug!("Merge confirmation timed out");
                Ok(false)
            }
        }
    }
}

fn source_not_found(target: &MergeTarget) -> String {
    match target {
        MergeTarget::ItemId(id) => format!("Item `{id}` was not found; check if the ID is right"),
        MergeTarget::Type(item_type) => format!(
            "Seems you don't have any `{item_type}`s (or all `{item_type}`s you have are above max merge stat)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApiClient;
    use crate::commands::fixtures::{gateway, ok, url};
    use crate::connectors::discord::MockDiscordConnector;
    use crate::model::ItemType;
    use crate::paginator::prompt::{NO, YES};
    use crate::paginator::testing::{Call, FakeConnector};
    use mockall::predicate::*;

    const AUTHOR: u64 = 42;

    fn source_row(owner: u64, damage: i64, equipped: bool) -> String {
        format!(
            r#"[{{"id": 1, "owner": {owner}, "name": "Blade", "type": "Sword", "damage": {damage}, "armor": 0, "value": 10, "hand": "any", "signature": null, "inventory": [{equipped_entry}]}}]"#,
            equipped_entry = if equipped { r#"{"equipped": true}"# } else { "" },
        )
    }

    fn candidates_for(owner: u64) -> String {
        format!(
            r#"[
                {{"id": 2, "owner": {owner}, "type": "Sword", "damage": 38, "armor": 0, "hand": "any", "inventory": []}},
                {{"id": 3, "owner": {owner}, "type": "Sword", "damage": 32, "armor": 0, "hand": "any", "inventory": []}}
            ]"#
        )
    }

    #[tokio::test]
    async fn test_merge_suggests_weakest_partner() {
        // Arrange
        let mut client = MockApiClient::new();
        client
            .expect_get()
            .with(eq(url(&query::merge_source_by_id(1))))
            .times(1)
            .returning(|_| Ok(ok(&source_row(AUTHOR, 35, false))));
        client
            .expect_get()
            .withf(|url| url.contains("damage=gte.30&damage=lte.40"))
            .times(1)
            .returning(|_| Ok(ok(&candidates_for(AUTHOR))));
        let gateway = gateway(client);
        let mut mock_discord = MockDiscordConnector::new();
        mock_discord.expect_author_id().return_const(AUTHOR);
        mock_discord
            .expect_send_reply()
            .withf(|reply| reply.starts_with("\n\nFound 2 mergable item(s).") && reply.ends_with("`$merge 1 3`"))
            .times(1)
            .returning(|_| Ok(1));
        let service = MergeService::new(&gateway, &mock_discord, Timeouts::default());

        // Act
        let result = service.merge(MergeTarget::ItemId(1)).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_merge_by_type_not_found() {
        // Arrange
        let mut client = MockApiClient::new();
        client
            .expect_get()
            .with(eq(url(&query::merge_source_by_type(ItemType::Bow, AUTHOR))))
            .returning(|_| Ok(ok("[]")));
        let gateway = gateway(client);
        let mut mock_discord = MockDiscordConnector::new();
        mock_discord.expect_author_id().return_const(AUTHOR);
        mock_discord
            .expect_send_reply()
            .with(eq(
                "Seems you don't have any `Bow`s (or all `Bow`s you have are above max merge stat)",
            ))
            .times(1)
            .returning(|_| Ok(1));
        let service = MergeService::new(&gateway, &mock_discord, Timeouts::default());

        // Act & Assert
        assert!(service.merge(MergeTarget::Type(ItemType::Bow)).await.is_ok());
    }

    #[tokio::test]
    async fn test_merge_rejects_item_at_max() {
        // Arrange
        let mut client = MockApiClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_| Ok(ok(&source_row(AUTHOR, 41, false))));
        let gateway = gateway(client);
        let mut mock_discord = MockDiscordConnector::new();
        mock_discord.expect_author_id().return_const(AUTHOR);
        mock_discord
            .expect_send_reply()
            .with(eq(merge::AT_MAX))
            .times(1)
            .returning(|_| Ok(1));
        let service = MergeService::new(&gateway, &mock_discord, Timeouts::default());

        // Act & Assert
        assert!(service.merge(MergeTarget::ItemId(1)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_foreign_item_declined() {
        // Arrange
        let mut client = MockApiClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_| Ok(ok(&source_row(7, 35, false))));
        let gateway = gateway(client);
        let connector = FakeConnector::new(AUTHOR).react(AUTHOR, NO);
        let service = MergeService::new(&gateway, &connector, Timeouts::default());

        // Act
        service.merge(MergeTarget::ItemId(1)).await.unwrap();

        // Assert
        let calls = connector.calls();
        assert_eq!(calls[0], Call::Message(NOT_OWNED.into()));
        assert_eq!(calls.last(), Some(&Call::Reply(CANCELLED.into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_equipped_item_times_out_silently() {
        // Arrange
        let mut client = MockApiClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_| Ok(ok(&source_row(AUTHOR, 35, true))));
        let gateway = gateway(client);
        let connector = FakeConnector::new(AUTHOR);
        let service = MergeService::new(&gateway, &connector, Timeouts::default());

        // Act
        service.merge(MergeTarget::ItemId(1)).await.unwrap();

        // Assert
        let calls = connector.calls();
        assert_eq!(calls[0], Call::Message(EQUIPPED.into()));
        assert_eq!(calls.last(), Some(&Call::Delete(500)));
        assert!(!calls.iter().any(|call| matches!(call, Call::Reply(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_foreign_item_confirmed_without_partner() {
        // Arrange
        let mut client = MockApiClient::new();
        client
            .expect_get()
            .with(eq(url(&query::merge_source_by_id(1))))
            .returning(|_| Ok(ok(&source_row(7, 35, false))));
        client
            .expect_get()
            .withf(|url| url.contains("owner=eq.7"))
            .returning(|_| Ok(ok("[]")));
        let gateway = gateway(client);
        let connector = FakeConnector::new(AUTHOR).react(AUTHOR, YES);
        let service = MergeService::new(&gateway, &connector, Timeouts::default());

        // Act
        service.merge(MergeTarget::ItemId(1)).await.unwrap();

        // Assert
        assert_eq!(connector.calls().last(), Some(&Call::Reply(NO_PARTNER.into())));
    }
}

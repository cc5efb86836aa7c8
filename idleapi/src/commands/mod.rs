//! Command logic, independent of the chat framework.
//!
//! Each service borrows the [`Gateway`](crate::api::Gateway), the
//! [`DiscordConnector`] of the invocation and whatever store it needs, so the
//! poise layer only parses arguments and hands over.

use crate::api::ApiError;
use crate::args::{InvalidInput, UserRef};
use crate::connectors::discord::{self, DiscordConnector};
use thiserror::Error;

pub mod lookup;
pub mod merchant;
pub mod merging;
pub mod protect;
pub mod status;

pub use lookup::LookupService;
pub use merchant::MerchService;
pub use merging::MergeService;
pub use protect::ProtectService;
pub use status::outage_status;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Discord error: {0}")]
    DiscordError(#[from] discord::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Database error: {0}")]
    Store(#[from] sea_orm::DbErr),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
}

/// Turns a [`UserRef`] into a user id, looking names up among the server's members.
pub(crate) async fn resolve_user<DISCORD: DiscordConnector + ?Sized>(
    discord: &DISCORD,
    user: UserRef,
) -> Result<Option<u64>, Error> {
    match user {
        UserRef::Id(id) => Ok(Some(id)),
        UserRef::Name(name) => Ok(discord.resolve_user(&name).await?),
    }
}

/// The user's name, or their id when Discord does not know them.
pub(crate) async fn display_name<DISCORD: DiscordConnector + ?Sized>(
    discord: &DISCORD,
    user_id: u64,
) -> String {
    discord
        .user_name(user_id)
        .await
        .unwrap_or_else(|_| user_id.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::discord::MockDiscordConnector;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_resolve_user_passes_ids_through() {
        // Arrange
        let mut mock_discord = MockDiscordConnector::new();
        mock_discord.expect_resolve_user().times(0);

        // Act
        let result = resolve_user(&mock_discord, UserRef::Id(77)).await.unwrap();

        // Assert
        assert_eq!(result, Some(77));
    }

    #[tokio::test]
    async fn test_resolve_user_looks_names_up() {
        // Arrange
        let mut mock_discord = MockDiscordConnector::new();
        mock_discord
            .expect_resolve_user()
            .with(eq("maxx"))
            .times(1)
            .returning(|_| Ok(Some(262133866062413825)));

        // Act
        let result = resolve_user(&mock_discord, UserRef::Name("maxx".into()))
            .await
            .unwrap();

        // Assert
        assert_eq!(result, Some(262133866062413825));
    }

    #[tokio::test]
    async fn test_display_name_falls_back_to_id() {
        // Arrange
        let mut mock_discord = MockDiscordConnector::new();
        mock_discord
            .expect_user_name()
            .returning(|_| Err(discord::Error::CannotFindUser));

        // Act
        let name = display_name(&mock_discord, 12).await;

        // Assert
        assert_eq!(name, "12");
    }
}

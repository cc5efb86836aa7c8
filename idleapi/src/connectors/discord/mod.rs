//! Discord connectivity for the bot.
//!
//! Command logic talks to Discord only through [`DiscordConnector`], so it can be
//! driven by a mock in tests. The `serenity` submodule implements it over a
//! poise command context.

use crate::paginator::Page;
use async_trait::async_trait;
use futures::stream::BoxStream;
use mockall::automock;
use thiserror::Error;

pub mod serenity;

/// Errors that can occur while talking to Discord.
#[derive(Error, Debug)]
pub enum Error {
    /// The command was not executed in a server channel
    #[error("Not in a server channel")]
    NotInServerChannel,
    /// Failed to send a reply message
    #[error("Cannot send reply")]
    CannotSendReply,
    /// Failed to send a message to the channel
    #[error("Cannot send message")]
    CannotSendMessage,
    #[error("Cannot edit message")]
    CannotEditMessage,
    #[error("Cannot delete message")]
    CannotDeleteMessage,
    /// Adding or removing a reaction failed
    #[error("Cannot update reactions")]
    CannotReact,
    #[error("Cannot find user")]
    CannotFindUser,
    #[error("Not enough permissions")]
    NotEnoughPermissions,
}

pub type MessageId = u64;

/// Reactions on one message, in arrival order.
pub type ReactionStream = BoxStream<'static, ReactionEvent>;

/// A file sent alongside a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A reaction added by someone to a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionEvent {
    pub message_id: MessageId,
    pub user_id: u64,
    pub emoji: String,
}

/// Everything the commands need from Discord.
#[automock]
#[async_trait]
pub trait DiscordConnector: Send + Sync {
    /// The user that invoked the command
    fn author_id(&self) -> u64;
    fn bot_id(&self) -> u64;
    /// Sends a reply to the person that invoked the prefix command
    async fn send_reply(&self, message: &str) -> Result<MessageId, Error>;
    /// Sends a plain message to the invoking channel
    async fn send_message(&self, message: &str) -> Result<MessageId, Error>;
    async fn send_page(
        &self,
        page: &Page,
        attachment: Option<Attachment>,
    ) -> Result<MessageId, Error>;
    async fn edit_page(&self, message_id: MessageId, page: &Page) -> Result<(), Error>;
    async fn send_attachment(
        &self,
        message: &str,
        attachment: Attachment,
    ) -> Result<MessageId, Error>;
    async fn add_reaction(&self, message_id: MessageId, emoji: &str) -> Result<(), Error>;
    /// Starts collecting reactions on `message_id` from anyone but the bot.
    ///
    /// Reactions queue up until the stream is polled, and collection stops when
    /// it is dropped. The stream ends once no more reactions can arrive.
    fn watch_reactions(&self, message_id: MessageId) -> ReactionStream;
    /// Removes `user_id`'s `emoji` reaction from a message.
    async fn remove_reaction(
        &self,
        message_id: MessageId,
        user_id: u64,
        emoji: &str,
    ) -> Result<(), Error>;
    /// Removes the bot's own `emoji` reaction from a message.
    async fn remove_own_reaction(&self, message_id: MessageId, emoji: &str) -> Result<(), Error>;
    async fn clear_reactions(&self, message_id: MessageId) -> Result<(), Error>;
    async fn delete_message(&self, message_id: MessageId) -> Result<(), Error>;
    /// The display name (`name` or `name#1234`) of a user.
    async fn user_name(&self, user_id: u64) -> Result<String, Error>;
    /// Looks a member of the current server up by name.
    async fn resolve_user(&self, name: &str) -> Result<Option<u64>, Error>;
    /// Whether the bot may attach files in the invoking channel.
    async fn can_attach_files(&self) -> bool;
    async fn start_typing(&self);
}

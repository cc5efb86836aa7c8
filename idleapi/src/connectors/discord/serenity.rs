//! Serenity-based implementation of Discord connectivity.
//!
//! Each command invocation builds one [`SerenityDiscordConnector`] around its
//! poise context.

use crate::api::Gateway;
use crate::connectors::discord::Error::{
    CannotDeleteMessage, CannotEditMessage, CannotFindUser, CannotReact, CannotSendMessage,
    CannotSendReply, NotInServerChannel,
};
use crate::connectors::discord::{
    Attachment, DiscordConnector, Error, MessageId, ReactionEvent, ReactionStream,
};
use crate::paginator::{Page, Timeouts};
use crate::store::SeaOrmProtectedItemsRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use log::{debug, warn};
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;

pub struct SerenityDiscordConnector<'a> {
    context: Context<'a>,
}

impl<'a> SerenityDiscordConnector<'a> {
    pub fn new(context: Context<'a>) -> Self {
        Self { context }
    }

    fn message_id(id: MessageId) -> serenity::MessageId {
        serenity::MessageId::new(id)
    }
}

/// Renders a [`Page`] as a Discord embed.
pub fn embed(page: &Page) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new().title(&page.title);
    if let Some(description) = &page.description {
        embed = embed.description(description);
    }
    for field in &page.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(color) = page.color {
        embed = embed.color(color);
    }
    if let Some(footer) = &page.footer {
        embed = embed.footer(serenity::CreateEmbedFooter::new(footer));
    }
    embed
}

fn reaction(emoji: &str) -> serenity::ReactionType {
    serenity::ReactionType::Unicode(emoji.to_string())
}

fn attachment(attachment: Attachment) -> serenity::CreateAttachment {
    serenity::CreateAttachment::bytes(attachment.bytes, attachment.filename)
}

#[async_trait]
impl DiscordConnector for SerenityDiscordConnector<'_> {
    fn author_id(&self) -> u64 {
        self.context.author().id.get()
    }

    fn bot_id(&self) -> u64 {
        self.context.framework().bot_id.get()
    }

    async fn send_reply(&self, message: &str) -> Result<MessageId, Error> {
        let ctx = &self.context;
        let Ok(handle) = ctx.reply(message).await else {
            return Err(CannotSendReply);
        };
        let Ok(sent) = handle.message().await else {
            return Err(CannotSendReply);
        };
        Ok(sent.id.get())
    }

    async fn send_message(&self, message: &str) -> Result<MessageId, Error> {
        let ctx = &self.context;
        let builder = serenity::CreateMessage::new().content(message);
        let Ok(sent) = ctx.channel_id().send_message(ctx.http(), builder).await else {
            return Err(CannotSendMessage);
        };
        Ok(sent.id.get())
    }

    async fn send_page(
        &self,
        page: &Page,
        file: Option<Attachment>,
    ) -> Result<MessageId, Error> {
        let ctx = &self.context;
        let mut reply = CreateReply::default().embed(embed(page));
        if let Some(file) = file {
            reply = reply.attachment(attachment(file));
        }
        let Ok(handle) = ctx.send(reply).await else {
            return Err(CannotSendMessage);
        };
        let Ok(sent) = handle.message().await else {
            return Err(CannotSendMessage);
        };
        Ok(sent.id.get())
    }

    async fn edit_page(&self, message_id: MessageId, page: &Page) -> Result<(), Error> {
        let ctx = &self.context;
        let builder = serenity::EditMessage::new().embed(embed(page));
        ctx.channel_id()
            .edit_message(ctx.http(), Self::message_id(message_id), builder)
            .await
            .map_err(|e| {
                debug!("Editing message {} failed: {}", message_id, e);
                CannotEditMessage
            })?;
        Ok(())
    }

    async fn send_attachment(
        &self,
        message: &str,
        file: Attachment,
    ) -> Result<MessageId, Error> {
        let ctx = &self.context;
        let builder = serenity::CreateMessage::new()
            .content(message)
            .add_file(attachment(file));
        let Ok(sent) = ctx.channel_id().send_message(ctx.http(), builder).await else {
            return Err(CannotSendMessage);
        };
        Ok(sent.id.get())
    }

    async fn add_reaction(&self, message_id: MessageId, emoji: &str) -> Result<(), Error> {
        let ctx = &self.context;
        ctx.http()
            .create_reaction(ctx.channel_id(), Self::message_id(message_id), &reaction(emoji))
            .await
            .map_err(|_| CannotReact)
    }

    fn watch_reactions(&self, message_id: MessageId) -> ReactionStream {
        let ctx = &self.context;
        let bot_id = ctx.framework().bot_id;
        serenity::ReactionCollector::new(ctx.serenity_context())
            .message_id(Self::message_id(message_id))
            .filter(move |reaction| reaction.user_id != Some(bot_id))
            .stream()
            .map(|added| {
                let emoji = match &added.emoji {
                    serenity::ReactionType::Unicode(emoji) => emoji.clone(),
                    other => other.to_string(),
                };
                ReactionEvent {
                    message_id: added.message_id.get(),
                    user_id: added.user_id.map(|id| id.get()).unwrap_or_default(),
                    emoji,
                }
            })
            .boxed()
    }

    async fn remove_reaction(
        &self,
        message_id: MessageId,
        user_id: u64,
        emoji: &str,
    ) -> Result<(), Error> {
        let ctx = &self.context;
        ctx.channel_id()
            .delete_reaction(
                ctx.http(),
                Self::message_id(message_id),
                Some(serenity::UserId::new(user_id)),
                reaction(emoji),
            )
            .await
            .map_err(|_| CannotReact)
    }

    async fn remove_own_reaction(&self, message_id: MessageId, emoji: &str) -> Result<(), Error> {
        let ctx = &self.context;
        ctx.http()
            .delete_reaction_me(ctx.channel_id(), Self::message_id(message_id), &reaction(emoji))
            .await
            .map_err(|_| CannotReact)
    }

    async fn clear_reactions(&self, message_id: MessageId) -> Result<(), Error> {
        let ctx = &self.context;
        ctx.channel_id()
            .delete_reactions(ctx.http(), Self::message_id(message_id))
            .await
            .map_err(|_| CannotReact)
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<(), Error> {
        let ctx = &self.context;
        ctx.channel_id()
            .delete_message(ctx.http(), Self::message_id(message_id))
            .await
            .map_err(|_| CannotDeleteMessage)
    }

    async fn user_name(&self, user_id: u64) -> Result<String, Error> {
        let ctx = &self.context;
        let Ok(user) = serenity::UserId::new(user_id).to_user(ctx).await else {
            return Err(CannotFindUser);
        };
        Ok(user.tag())
    }

    async fn resolve_user(&self, name: &str) -> Result<Option<u64>, Error> {
        let ctx = &self.context;
        let Some(guild_id) = ctx.guild_id() else {
            return Err(NotInServerChannel);
        };
        match guild_id.search_members(ctx.http(), name, Some(1)).await {
            Ok(members) => Ok(members.first().map(|member| member.user.id.get())),
            Err(e) => {
                warn!("Member search for {:?} failed: {}", name, e);
                Err(CannotFindUser)
            }
        }
    }

    async fn can_attach_files(&self) -> bool {
        let ctx = &self.context;
        let Some(channel) = ctx.guild_channel().await else {
            return false;
        };
        channel
            .permissions_for_user(ctx.serenity_context(), ctx.framework().bot_id)
            .map(|permissions| permissions.attach_files())
            .unwrap_or(false)
    }

    async fn start_typing(&self) {
        let ctx = &self.context;
        if let Err(e) = ctx.channel_id().broadcast_typing(ctx.http()).await {
            debug!("Could not start typing: {}", e);
        }
    }
}

/// State shared by every command invocation.
pub struct Data {
    pub gateway: Gateway,
    pub protected_items: SeaOrmProtectedItemsRepository,
    pub timeouts: Timeouts,
    pub prefix: String,
    pub developer_id: u64,
    pub bans: HashSet<u64>,
    pub started_at: DateTime<Utc>,
}

/// Type alias for Poise command context
pub type Context<'a> = poise::Context<'a, Data, anyhow::Error>;

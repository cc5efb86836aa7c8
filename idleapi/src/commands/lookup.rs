//! Read-only lookups: the query passthrough, profiles, items and guilds.

use crate::api::{ApiError, Gateway, query};
use crate::args::{GuildRef, UserRef};
use crate::commands::{Error, display_name, resolve_user};
use crate::connectors::discord::DiscordConnector;
use crate::format::{aligned_rows, escape_backticks, format_response_within, truncate};
use crate::model::{Item, article, level_for_xp};
use crate::paginator::{self, BLURPLE, Choice, GREEN, Page, RED, Timeouts};
use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Most ids a single `iteminfo` looks up.
pub const MAX_ITEM_LOOKUP: usize = 250;
/// Room left in an embed description for a code block.
const EMBED_BODY_LIMIT: usize = 3800;
/// Longest description Discord accepts in an embed.
pub const EMBED_DESCRIPTION_LIMIT: usize = 4096;
/// The request URL shown above a `get` result is cut to this.
const URL_LINE_LIMIT: usize = 300;

pub const NO_USER: &str = "This user does not exist.";
pub const NO_PROFILE: &str = "This user has no profile!";
pub const NO_EQUIPPED: &str = "This user has no items equipped or does not have a profile!";
pub const TOO_MANY_ITEMS: &str =
    ":warning: Cannot view more than 250 items at a time, only selecting the first 250";
pub const NO_MEMBERS: &str =
    "Somehow this guild does not have any members. I have no idea how this happened.";
pub const ASK_USERNAMES: &str = "Do you wanna get the usernames too? Might take a while.";

#[derive(Debug, Deserialize)]
struct GuildRow {
    id: i64,
}

pub struct LookupService<'a, DISCORD: DiscordConnector> {
    gateway: &'a Gateway,
    discord: &'a DISCORD,
    timeouts: Timeouts,
    prefix: &'a str,
}

impl<'a, DISCORD: DiscordConnector> LookupService<'a, DISCORD> {
    pub fn new(
        gateway: &'a Gateway,
        discord: &'a DISCORD,
        timeouts: Timeouts,
        prefix: &'a str,
    ) -> Self {
        Self {
            gateway,
            discord,
            timeouts,
            prefix,
        }
    }

    /// Runs a raw query and shows the JSON, coloured by status.
    ///
    /// Client errors are shown in red with their body. Every other failure is
    /// left to the caller.
    pub async fn get(&self, raw: &str) -> Result<(), Error> {
        let query = match query::passthrough(self.gateway.base_url(), raw) {
            Ok(query) => query,
            Err(e) => {
                self.discord.send_reply(&e.to_string()).await?;
                return Ok(());
            }
        };
        let (status, body) = match self.gateway.fetch(&query).await {
            Ok(value) => (200, value),
            Err(ApiError::UpstreamClientError { status, body }) => {
                (status, body.unwrap_or(Value::Null))
            }
            Err(e) => return Err(e.into()),
        };

        let url = truncate(&self.gateway.url(&query), URL_LINE_LIMIT);
        let budget = EMBED_DESCRIPTION_LIMIT
            - url.chars().count()
            - "\n```json\n\n```".chars().count();
        let formatted = format_response_within(&body, budget);
        let page = Page::new(status.to_string())
            .description(format!("{url}\n```json\n{}\n```", formatted.text))
            .color(if status == 200 { GREEN } else { RED });
        self.discord.send_page(&page, formatted.attachment).await?;
        Ok(())
    }

    /// Equipped items of `user`, defaulting to the author.
    pub async fn items(&self, user: Option<u64>) -> Result<(), Error> {
        let user = user.unwrap_or_else(|| self.discord.author_id());
        let person = display_name(self.discord, user).await;
        let rows: Vec<Value> = self.gateway.fetch_as(&query::equipped_items(user)).await?;
        let equipped: Vec<&Value> = rows
            .iter()
            .filter(|row| {
                row.get("inventory")
                    .and_then(Value::as_array)
                    .is_some_and(|inventory| !inventory.is_empty())
            })
            .collect();

        let description = if equipped.is_empty() {
            NO_EQUIPPED.to_string()
        } else {
            let pretty = serde_json::to_string_pretty(&equipped)
                .map_err(ApiError::from)?;
            format!(
                "```json\n{}\n```",
                truncate(&escape_backticks(&pretty), EMBED_BODY_LIMIT)
            )
        };
        let page = Page::new(format!("{person}'s equipped items:"))
            .description(description)
            .color(BLURPLE);
        self.discord.send_page(&page, None).await?;
        Ok(())
    }

    pub async fn profile(&self, user: Option<UserRef>) -> Result<(), Error> {
        let user = match user {
            None => self.discord.author_id(),
            Some(user) => match resolve_user(self.discord, user).await? {
                Some(id) => id,
                None => {
                    self.discord.send_reply(NO_USER).await?;
                    return Ok(());
                }
            },
        };
        let Ok(person) = self.discord.user_name(user).await else {
            self.discord.send_reply(NO_USER).await?;
            return Ok(());
        };

        let rows: Vec<Map<String, Value>> = self.gateway.fetch_as(&query::profile(user)).await?;
        let body = match rows.first() {
            Some(row) => escape_backticks(&aligned_rows(row)),
            None => NO_PROFILE.to_string(),
        };
        let page = Page::new(format!("{person}'s profile"))
            .description(format!("```\n{}\n```", truncate(&body, EMBED_BODY_LIMIT)));
        self.discord.send_page(&page, None).await?;
        Ok(())
    }

    /// One page per found item, in the order the API returns them.
    pub async fn iteminfo(&self, ids: Vec<i64>) -> Result<(), Error> {
        if ids.is_empty() {
            let hint = format!(
                "Please supply some Item IDs, for example `{}item 123 234 345`",
                self.prefix
            );
            self.discord.send_reply(&hint).await?;
            return Ok(());
        }
        let mut ids = ids;
        if ids.len() > MAX_ITEM_LOOKUP {
            self.discord.send_message(TOO_MANY_ITEMS).await?;
            ids.truncate(MAX_ITEM_LOOKUP);
        }

        let items: Vec<Item> = self.gateway.fetch_as(&query::items_by_ids(&ids)).await?;
        if items.is_empty() {
            self.discord.send_reply(&items_not_found(&ids)).await?;
            return Ok(());
        }

        let mut owners: HashMap<i64, String> = HashMap::new();
        let mut pages = Vec::with_capacity(items.len());
        for item in &items {
            let owner = match owners.get(&item.owner) {
                Some(owner) => owner.clone(),
                None => {
                    let owner = display_name(self.discord, item.owner as u64).await;
                    owners.insert(item.owner, owner.clone());
                    owner
                }
            };
            pages.push(item_page(item, &owner));
        }
        paginator::paginate(
            self.discord,
            pages,
            self.discord.author_id(),
            self.timeouts.navigation,
        )
        .await?;
        Ok(())
    }

    /// Looks a guild up, then pages through its members with their level.
    pub async fn guildmembers(&self, guild: GuildRef) -> Result<(), Error> {
        let query = match &guild {
            GuildRef::Id(id) => query::guild_by_id(*id),
            GuildRef::Name(name) => query::guild_by_name(name),
        };
        let guilds: Vec<GuildRow> = self.gateway.fetch_as(&query).await?;
        let Some(found) = guilds.first() else {
            self.discord.send_reply(&guild_not_found(&guild)).await?;
            return Ok(());
        };

        let members: Vec<Map<String, Value>> = self
            .gateway
            .fetch_as(&query::guild_members(found.id))
            .await?;
        if members.is_empty() {
            self.discord.send_reply(NO_MEMBERS).await?;
            return Ok(());
        }

        let author = self.discord.author_id();
        let choice = paginator::confirm(
            self.discord,
            ASK_USERNAMES,
            author,
            self.timeouts.confirmation,
        )
        .await?;
        let with_usernames = choice == Choice::Yes;
        info!(
            "Listing {} members of guild {} (usernames: {})",
            members.len(),
            found.id,
            with_usernames
        );

        self.discord.start_typing().await;
        let mut pages = Vec::with_capacity(members.len());
        for mut member in members {
            let xp = member.get("xp").and_then(Value::as_f64).unwrap_or_default() as i64;
            member.insert("level".into(), Value::from(level_for_xp(xp)));

            let user = member.get("user").and_then(Value::as_u64);
            let username = match user {
                Some(user) if with_usernames => display_name(self.discord, user).await,
                Some(user) => user.to_string(),
                None => "Unknown user".to_string(),
            };
            member.insert("username".into(), Value::from(username.clone()));

            pages.push(Page::new(username).description(format!(
                "```\n{}\n```",
                escape_backticks(&aligned_rows(&member))
            )));
        }
        paginator::paginate(self.discord, pages, author, self.timeouts.navigation).await?;
        Ok(())
    }
}

fn items_not_found(ids: &[i64]) -> String {
    if let [id] = ids {
        format!(
            "The item with the ID `{id}` was not found. This might mean:\n    \
             - You mistyped the ID\n    \
             - The item does not exist *yet*\n    \
             - The item does not exist *anymore* (most likely merched)"
        )
    } else {
        let ids = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "No items with the IDs `{ids}` were found. This might mean:\n    \
             - You mistyped the IDs\n    \
             - The items do not exist *yet*\n    \
             - The items do not exist *anymore* (most likely merched)"
        )
    }
}

fn guild_not_found(guild: &GuildRef) -> String {
    match guild {
        GuildRef::Id(id) => format!("Guild `{id}` not found. Please make sure the ID is correct."),
        GuildRef::Name(name) => format!(
            "Guild `{name}` not found. Please make sure that capitalization and spelling of \
             the guild name is correct, or use its ID."
        ),
    }
}

pub fn item_page(item: &Item, owner: &str) -> Page {
    let mut page = Page::new(item.name.clone())
        .description(format!(
            "{} {} with {} {}",
            article(&item.item_type),
            item.item_type.to_lowercase(),
            item.stat(),
            item.stat_kind()
        ))
        .field("Currently owned by", format!("{owner} ({})", item.owner), false)
        .field(
            "General info",
            format!(
                "Item ID: {}\nItem value: {}\nHand used: {}",
                item.id, item.value, item.hand
            ),
            false,
        );
    if let Some(signature) = item.signature.as_deref().filter(|s| !s.is_empty()) {
        page = page.field("Signature", signature, false);
    }
    if let Some(original) = item.original_type.as_deref().filter(|s| !s.is_empty()) {
        page = page.field(
            "Original Type",
            format!("This item was originally {} {original}", article(original)),
            true,
        );
    }
    page
}

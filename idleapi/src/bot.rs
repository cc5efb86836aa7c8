//! Poise glue: the command table, cooldowns, checks and error replies.

use crate::api::ApiError;
use crate::args::{self, GuildRef, InvalidInput, MergeTarget, UserRef};
use crate::commands::{
    self, LookupService, MergeService, MerchService, ProtectService, outage_status,
};
use crate::config::SOURCE_URL;
use crate::connectors::discord::serenity::{Context, Data, SerenityDiscordConnector, embed};
use crate::format::{escape_backticks, truncate};
use crate::paginator::{BLURPLE, Page};
use chrono::Utc;
use log::{error, warn};
use poise::CreateReply;
use std::collections::HashSet;
use std::time::Duration;

/// Commands that hit the API and share the per-user cooldown.
const API_COMMANDS: [&str; 10] = [
    "get",
    "items",
    "profile",
    "iteminfo",
    "guildmembers",
    "merge",
    "protect",
    "viewfav",
    "merch",
    "xmerch",
];

pub const UNDER_CONSTRUCTION: &str =
    "This command is currently under construction. Sorry for the inconvenience!";

/// Query the API directly, shown as JSON
///
/// The `https://public-api.travitia.xyz/idle/` part of the URL does not need to be included.
#[poise::command(prefix_command)]
async fn get(
    ctx: Context<'_>,
    #[rest]
    #[description = "An endpoint with filters, e.g. profile?user=eq.123"]
    query: String,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    LookupService::new(&data.gateway, &connector, data.timeouts, &data.prefix)
        .get(&query)
        .await?;
    Ok(())
}

/// Show a user's equipped items
#[poise::command(prefix_command)]
async fn items(
    ctx: Context<'_>,
    #[description = "A user ID, defaults to you"] user: Option<u64>,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    LookupService::new(&data.gateway, &connector, data.timeouts, &data.prefix)
        .items(user)
        .await?;
    Ok(())
}

/// Show a user's IdleRPG profile
#[poise::command(prefix_command, aliases("p", "pp", "me"))]
async fn profile(
    ctx: Context<'_>,
    #[rest]
    #[description = "A mention, name or user ID, defaults to you"]
    user: Option<String>,
) -> anyhow::Result<()> {
    let user = user
        .as_deref()
        .map(UserRef::parse)
        .transpose()
        .map_err(commands::Error::from)?;
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    LookupService::new(&data.gateway, &connector, data.timeouts, &data.prefix)
        .profile(user)
        .await?;
    Ok(())
}

/// Look up items by their IDs, one page per item
#[poise::command(prefix_command, aliases("item", "i"))]
async fn iteminfo(
    ctx: Context<'_>,
    #[rest]
    #[description = "Up to 250 item IDs"]
    ids: Option<String>,
) -> anyhow::Result<()> {
    let ids = parse_ids(ids.as_deref())?;
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    LookupService::new(&data.gateway, &connector, data.timeouts, &data.prefix)
        .iteminfo(ids)
        .await?;
    Ok(())
}

/// List the members of a guild with their levels
#[poise::command(prefix_command)]
async fn guildmembers(
    ctx: Context<'_>,
    #[rest]
    #[description = "The guild's name or ID"]
    name_or_id: String,
) -> anyhow::Result<()> {
    let guild = GuildRef::parse(&name_or_id).map_err(commands::Error::from)?;
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    LookupService::new(&data.gateway, &connector, data.timeouts, &data.prefix)
        .guildmembers(guild)
        .await?;
    Ok(())
}

/// Find the ideal merge partner for an item
///
/// Give an item ID, or an item type to use your strongest item of that type that can still be merged. \
/// Equipped and signed items are never suggested.
#[poise::command(prefix_command)]
async fn merge(
    ctx: Context<'_>,
    #[description = "An item ID or item type"] item: String,
) -> anyhow::Result<()> {
    let target = MergeTarget::parse(&item).map_err(commands::Error::from)?;
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    MergeService::new(&data.gateway, &connector, data.timeouts)
        .merge(target)
        .await?;
    Ok(())
}

/// Protect items from showing up in merch lists
///
/// You can only protect your own items.
#[poise::command(prefix_command, aliases("favourite", "favorite", "fav"))]
async fn protect(
    ctx: Context<'_>,
    #[rest]
    #[description = "Item IDs to protect"]
    ids: Option<String>,
) -> anyhow::Result<()> {
    let ids = parse_ids(ids.as_deref())?;
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    protect_service(data, &connector).protect(ids).await?;
    Ok(())
}

/// Remove items from your protected list
#[poise::command(prefix_command, aliases("unfavourite", "unfavorite", "unfav"))]
async fn unprotect(
    ctx: Context<'_>,
    #[rest]
    #[description = "Item IDs to unprotect"]
    ids: Option<String>,
) -> anyhow::Result<()> {
    let ids = parse_ids(ids.as_deref())?;
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    protect_service(data, &connector).unprotect(ids).await?;
    Ok(())
}

/// Clear your protected items list
#[poise::command(prefix_command)]
async fn clearfav(ctx: Context<'_>) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    protect_service(data, &connector).clearfav().await?;
    Ok(())
}

/// View your protected items
#[poise::command(prefix_command)]
async fn viewfav(ctx: Context<'_>) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    protect_service(data, &connector).viewfav().await?;
    Ok(())
}

/// Get a `$merch` line for IdleRPG with all of a user's unequipped items
///
/// Protected items are left out. Give an upper and optionally a lower stat bound to narrow the list. \
/// Use xmerch for more filters.
#[poise::command(prefix_command, aliases("merchant", "merchall"))]
async fn merch(
    ctx: Context<'_>,
    #[description = "A mention, name or user ID, defaults to you"] user: Option<String>,
    #[description = "The highest stat to include"] upperbound: Option<i64>,
    #[description = "The lowest stat to include"] lowerbound: Option<i64>,
) -> anyhow::Result<()> {
    let user = user
        .as_deref()
        .map(UserRef::parse)
        .transpose()
        .map_err(commands::Error::from)?;
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    merch_service(data, &connector)
        .merch(user, upperbound, lowerbound)
        .await?;
    Ok(())
}

/// The merch command with many more filters
///
/// Run `xmerch --help` to page through every flag.
#[poise::command(prefix_command, aliases("xmerchant", "xmerchall"))]
async fn xmerch(
    ctx: Context<'_>,
    #[rest]
    #[description = "Flags, see --help"]
    args: Option<String>,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    let data = ctx.data();
    merch_service(data, &connector)
        .xmerch(args.as_deref())
        .await?;
    Ok(())
}

/// Show whether the API is currently marked as down
#[poise::command(prefix_command, owners_only, hide_in_help)]
async fn outage(ctx: Context<'_>) -> anyhow::Result<()> {
    let status = outage_status(ctx.data().gateway.breaker()).await;
    ctx.reply(status).await?;
    Ok(())
}

/// Ping command to test bot availability
#[poise::command(prefix_command)]
async fn ping(ctx: Context<'_>) -> anyhow::Result<()> {
    let latency = ctx.ping().await;
    let page = Page::new("Pong!").color(BLURPLE).field(
        ":heartbeat: Websocket Latency",
        format!("{}ms", latency.as_millis()),
        true,
    );
    ctx.send(CreateReply::default().embed(embed(&page))).await?;
    Ok(())
}

/// View how long the bot has been online for
#[poise::command(prefix_command)]
async fn uptime(ctx: Context<'_>) -> anyhow::Result<()> {
    let online = (Utc::now() - ctx.data().started_at)
        .to_std()
        .unwrap_or_default();
    ctx.reply(format!("I've been online for **{}**!", uptime_text(online)))
        .await?;
    Ok(())
}

/// Check out the inner workings of the bot and host your own instance
#[poise::command(prefix_command, aliases("src"))]
async fn source(ctx: Context<'_>) -> anyhow::Result<()> {
    ctx.reply(format!("Check out {SOURCE_URL}")).await?;
    Ok(())
}

/// Show this menu
#[poise::command(prefix_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"] command: Option<String>,
) -> anyhow::Result<()> {
    let extra = format!(
        "Type {}help command for more info on a command.",
        ctx.data().prefix
    );
    let config = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: &extra,
        ..Default::default()
    };
    poise::builtins::help(ctx, command.as_deref(), config).await?;
    Ok(())
}

fn parse_ids(raw: Option<&str>) -> Result<Vec<i64>, commands::Error> {
    Ok(args::parse_item_ids(raw.unwrap_or_default())?)
}

fn protect_service<'a>(
    data: &'a Data,
    connector: &'a SerenityDiscordConnector<'a>,
) -> ProtectService<'a, crate::store::SeaOrmProtectedItemsRepository, SerenityDiscordConnector<'a>>
{
    ProtectService::new(
        &data.gateway,
        &data.protected_items,
        connector,
        data.timeouts,
        &data.prefix,
    )
}

fn merch_service<'a>(
    data: &'a Data,
    connector: &'a SerenityDiscordConnector<'a>,
) -> MerchService<'a, crate::store::SeaOrmProtectedItemsRepository, SerenityDiscordConnector<'a>> {
    MerchService::new(
        &data.gateway,
        &data.protected_items,
        connector,
        data.timeouts,
        &data.prefix,
    )
}

/// Every command, with the per-user cooldown applied to the API-facing ones.
pub fn commands(api_cooldown: Duration) -> Vec<poise::Command<Data, anyhow::Error>> {
    let mut commands = vec![
        get(),
        items(),
        profile(),
        iteminfo(),
        guildmembers(),
        merge(),
        protect(),
        unprotect(),
        clearfav(),
        viewfav(),
        merch(),
        xmerch(),
        outage(),
        ping(),
        uptime(),
        source(),
        help(),
    ];
    for command in commands.iter_mut() {
        if !API_COMMANDS.contains(&command.name.as_str()) {
            continue;
        }
        match command.cooldown_config.get_mut() {
            Ok(config) => config.user = Some(api_cooldown),
            Err(e) => warn!("Cooldown of {} is poisoned: {}", command.name, e),
        }
    }
    commands
}

/// Silently drops commands from banned users.
pub async fn not_banned(ctx: Context<'_>) -> anyhow::Result<bool> {
    Ok(!ctx.data().bans.contains(&ctx.author().id.get()))
}

pub fn owners(developer_id: u64) -> HashSet<poise::serenity_prelude::UserId> {
    HashSet::from([poise::serenity_prelude::UserId::new(developer_id)])
}

/// `H:MM:SS`, with a leading day count once past a day.
pub fn uptime_text(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let clock = clock(secs % 86_400);
    match secs / 86_400 {
        0 => clock,
        1 => format!("1 day, {clock}"),
        days => format!("{days} days, {clock}"),
    }
}

fn clock(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}

pub fn cooldown_reply(remaining: Duration) -> String {
    format!("You are on cooldown! Try again in {}.", clock(remaining.as_secs()))
}

pub fn bad_input_reply(prefix: &str, command: &str, detail: Option<&str>) -> String {
    let mut reply = format!(
        "Looks like some of your input was incorrect... Check `{prefix}help {command}` for details.\n"
    );
    if let Some(detail) = detail {
        reply.push_str(detail);
        reply.push('\n');
    }
    if command == "merch" {
        reply.push_str(&format!(
            "You might have mistaken this command for `{prefix}xmerch`."
        ));
    }
    reply
}

/// The user-facing reply for an error returned by a command body.
pub fn error_reply(err: &anyhow::Error, prefix: &str, command: &str) -> String {
    if let Some(api) = find_api_error(err) {
        return api.user_message();
    }
    if let Some(input) = find_invalid_input(err) {
        return bad_input_reply(prefix, command, Some(&input.0));
    }

    let kind = match err.downcast_ref::<commands::Error>() {
        Some(commands::Error::DiscordError(_)) => "DiscordError",
        Some(commands::Error::Store(_)) => "DbErr",
        _ => "Error",
    };
    let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
    let chain = if chain.is_empty() {
        format!("{err:?}")
    } else {
        chain.join("\n")
    };
    format!(
        "Error while using this command!\n\n**{kind}**: {}\n```{}```",
        truncate(&err.to_string(), 300),
        truncate(&escape_backticks(&chain), 1500)
    )
}

fn find_api_error(err: &anyhow::Error) -> Option<&ApiError> {
    match err.downcast_ref::<commands::Error>() {
        Some(commands::Error::Api(api)) => Some(api),
        _ => err.downcast_ref::<ApiError>(),
    }
}

fn find_invalid_input(err: &anyhow::Error) -> Option<&InvalidInput> {
    match err.downcast_ref::<commands::Error>() {
        Some(commands::Error::InvalidInput(input)) => Some(input),
        _ => err.downcast_ref::<InvalidInput>(),
    }
}

/// Maps framework errors to replies. A failing command never takes the bot down.
pub async fn on_error(error: poise::FrameworkError<'_, Data, anyhow::Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            let command = ctx.command().name.clone();
            if find_api_error(&error).is_none() && find_invalid_input(&error).is_none() {
                error!("Command {} failed: {:?}", command, error);
            }
            let reply = error_reply(&error, &ctx.data().prefix, &command);
            if let Err(e) = ctx.say(reply).await {
                warn!("Could not report error of {}: {}", command, e);
            }
        }
        poise::FrameworkError::ArgumentParse { error, ctx, .. } => {
            let command = ctx.command().name.clone();
            warn!("Bad arguments for {}: {}", command, error);
            let reply = bad_input_reply(&ctx.data().prefix, &command, None);
            if let Err(e) = ctx.say(reply).await {
                warn!("Could not report bad input for {}: {}", command, e);
            }
        }
        poise::FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            if let Err(e) = ctx.say(cooldown_reply(remaining_cooldown)).await {
                warn!("Could not report cooldown: {}", e);
            }
        }
        poise::FrameworkError::NotAnOwner { ctx, .. } => {
            if let Err(e) = ctx.say(UNDER_CONSTRUCTION).await {
                warn!("Could not report developer check: {}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed { error: None, .. } => {}
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

//! `merch` and `xmerch`: ready-to-paste `$merch` lines.

use crate::api::{Gateway, query};
use crate::args::{InvalidInput, UserRef};
use crate::commands::{Error, resolve_user};
use crate::connectors::discord::{Attachment, DiscordConnector};
use crate::format::truncate;
use crate::merch::{
    self, FILE_INTRO, LIST_FILENAME, MERCH_CAP, MESSAGE_LIMIT, NO_ATTACH, NO_ITEMS, TOO_LONG,
    TRUNCATED, XmerchArgs,
};
use crate::model::Item;
use crate::paginator::{self, Timeouts};
use crate::store::ProtectedItemsRepository;
use log::{debug, info};
use std::collections::HashSet;

pub struct MerchService<'a, REPO: ProtectedItemsRepository, DISCORD: DiscordConnector> {
    gateway: &'a Gateway,
    protected_items: &'a REPO,
    discord: &'a DISCORD,
    timeouts: Timeouts,
    prefix: &'a str,
}

impl<'a, REPO: ProtectedItemsRepository, DISCORD: DiscordConnector>
    MerchService<'a, REPO, DISCORD>
{
    pub fn new(
        gateway: &'a Gateway,
        protected_items: &'a REPO,
        discord: &'a DISCORD,
        timeouts: Timeouts,
        prefix: &'a str,
    ) -> Self {
        Self {
            gateway,
            protected_items,
            discord,
            timeouts,
            prefix,
        }
    }

    /// Lists up to 150 unequipped items of `user`, optionally within a stat range.
    pub async fn merch(
        &self,
        user: Option<UserRef>,
        upper: Option<i64>,
        lower: Option<i64>,
    ) -> Result<(), Error> {
        let user = match user {
            None => self.discord.author_id(),
            Some(user) => {
                let shown = match &user {
                    UserRef::Id(id) => id.to_string(),
                    UserRef::Name(name) => name.clone(),
                };
                resolve_user(self.discord, user).await?.ok_or_else(|| {
                    InvalidInput(format!("Could not convert {shown} to a user or ID."))
                })?
            }
        };

        let queries = match merch::stat_bounds(upper, lower) {
            Some(bounds) => {
                if bounds.swapped {
                    self.discord
                        .send_message(&format!(
                            "`lowerbound ({})` is larger than `upperbound ({})`; switching the values...",
                            bounds.upper, bounds.lower
                        ))
                        .await?;
                }
                let filter = query::MerchFilter {
                    user,
                    stat_lower: Some(bounds.lower),
                    stat_upper: Some(bounds.upper),
                    ..Default::default()
                };
                query::merch_queries(&filter).to_vec()
            }
            None => vec![query::unequipped_items(user)],
        };

        self.discord.start_typing().await;
        let items = self.fetch_all(&queries).await?;
        let excluded: HashSet<i64> = self.protected_items.load(user).await?.into_iter().collect();
        let ids = merch::collect_ids(items, &excluded);
        if ids.is_empty() {
            self.discord.send_message(NO_ITEMS).await?;
            return Ok(());
        }

        let shown = &ids[..ids.len().min(MERCH_CAP)];
        self.send_listing(shown, ids.len() > shown.len(), false).await
    }

    /// The flag-driven listing. `raw` is everything after the command name.
    pub async fn xmerch(&self, raw: Option<&str>) -> Result<(), Error> {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            let hint = format!(
                "No arguments passed. Please take a look at `{}xmerch --help`",
                self.prefix
            );
            self.discord.send_reply(&hint).await?;
            return Ok(());
        };
        let args = match XmerchArgs::parse_raw(raw) {
            Ok(args) => args,
            Err(e) => {
                debug!("Rejected xmerch arguments {:?}: {}", raw, e);
                let usage = format!("```\n{}\n```", truncate(e.to_string().trim(), 1800));
                self.discord.send_reply(&usage).await?;
                return Ok(());
            }
        };
        let author = self.discord.author_id();
        if args.help {
            paginator::paginate(
                self.discord,
                merch::help_pages(self.prefix),
                author,
                self.timeouts.navigation,
            )
            .await?;
            return Ok(());
        }

        let user = match &args.user {
            None => author,
            Some(raw_user) => {
                let resolved = match UserRef::parse(raw_user) {
                    Ok(user) => resolve_user(self.discord, user).await?,
                    Err(_) => None,
                };
                let Some(user) = resolved else {
                    let message =
                        format!("`--user {raw_user}` could not be converted to a user or ID.");
                    self.discord.send_reply(&message).await?;
                    return Ok(());
                };
                user
            }
        };

        self.discord.start_typing().await;
        let items = self.fetch_all(&query::merch_queries(&args.filter(user))).await?;
        if items.is_empty() {
            self.discord.send_message(NO_ITEMS).await?;
            return Ok(());
        }

        let mut excluded: HashSet<i64> = self.protected_items.load(user).await?.into_iter().collect();
        excluded.extend(args.exclude.iter().copied());
        let ids = merch::collect_ids(items, &excluded);
        if ids.is_empty() {
            self.discord.send_message(NO_ITEMS).await?;
            return Ok(());
        }

        if args.file {
            if !self.discord.can_attach_files().await {
                self.discord.send_message(NO_ATTACH).await?;
                return Ok(());
            }
            let attachment = Attachment {
                filename: LIST_FILENAME.to_string(),
                bytes: merch::join_ids(&ids).into_bytes(),
            };
            self.discord.send_attachment(FILE_INTRO, attachment).await?;
            return Ok(());
        }

        let shown = &ids[..ids.len().min(args.limit())];
        self.send_listing(shown, ids.len() > shown.len(), args.copy)
            .await
    }

    async fn fetch_all(&self, queries: &[String]) -> Result<Vec<Item>, Error> {
        let mut items = Vec::new();
        for query in queries {
            let page: Vec<Item> = self.gateway.fetch_as(query).await?;
            items.extend(page);
        }
        Ok(items)
    }

    async fn send_listing(&self, ids: &[i64], truncated: bool, copy: bool) -> Result<(), Error> {
        let block = merch::merch_block(ids, copy);
        if block.chars().count() > MESSAGE_LIMIT {
            self.discord.send_message(TOO_LONG).await?;
            return Ok(());
        }
        info!("Listing {} items for merch", ids.len());
        let message_id = self.discord.send_message(&block).await?;
        if truncated {
            self.discord.send_message(TRUNCATED).await?;
        }
        paginator::dismissable(
            self.discord,
            message_id,
            self.discord.author_id(),
            self.timeouts.dismissal,
        )
        .await?;
        Ok(())
    }
}

//! The protected-items list: ids a user keeps out of their bulk listings.

use crate::api::{Gateway, query};
use crate::commands::Error;
use crate::connectors::discord::DiscordConnector;
use crate::model::Item;
use crate::paginator::{self, BLURPLE, Page, Timeouts};
use crate::store::ProtectedItemsRepository;
use log::info;

pub const NO_IDS: &str = "No item IDs given.";
pub const SKIPPED_HINT: &str =
    "\nPlease note that some of the items did not belong to you, so they haven't been added.";
pub const CLEARED: &str = "Cleared your protected items list.";
pub const NOTHING_PROTECTED: &str = "No protected items!";
const PER_PAGE: usize = 5;

pub struct ProtectService<'a, REPO: ProtectedItemsRepository, DISCORD: DiscordConnector> {
    gateway: &'a Gateway,
    protected_items: &'a REPO,
    discord: &'a DISCORD,
    timeouts: Timeouts,
    prefix: &'a str,
}

impl<'a, REPO: ProtectedItemsRepository, DISCORD: DiscordConnector>
    ProtectService<'a, REPO, DISCORD>
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

    fn updated(&self) -> String {
        format!(
            "Updated protected items. Use `{}viewfav` to verify.",
            self.prefix
        )
    }

    /// Adds the ids the author owns; the rest are reported as skipped.
    pub async fn protect(&self, ids: Vec<i64>) -> Result<(), Error> {
        let author = self.discord.author_id();
        self.protected_items.ensure_row(author).await?;
        if ids.is_empty() {
            self.discord.send_reply(NO_IDS).await?;
            return Ok(());
        }

        let mut requested = ids;
        requested.sort_unstable();
        requested.dedup();

        let owners: Vec<Item> = self
            .gateway
            .fetch_as(&query::item_owners(&requested))
            .await?;
        let mut owned: Vec<i64> = owners
            .iter()
            .filter(|item| item.owner as u64 == author)
            .map(|item| item.id)
            .collect();
        owned.sort_unstable();
        owned.dedup();

        if !owned.is_empty() {
            let stored = self.protected_items.add(author, &owned).await?;
            info!("User {} now protects {} items", author, stored.len());
        }

        let mut reply = self.updated();
        if owned != requested {
            reply.push_str(SKIPPED_HINT);
        }
        self.discord.send_reply(&reply).await?;
        Ok(())
    }

    pub async fn unprotect(&self, ids: Vec<i64>) -> Result<(), Error> {
        let author = self.discord.author_id();
        self.protected_items.ensure_row(author).await?;
        if ids.is_empty() {
            self.discord.send_reply(NO_IDS).await?;
            return Ok(());
        }
        let stored = self.protected_items.remove(author, &ids).await?;
        info!("User {} now protects {} items", author, stored.len());
        self.discord.send_reply(&self.updated()).await?;
        Ok(())
    }

    pub async fn clearfav(&self) -> Result<(), Error> {
        let author = self.discord.author_id();
        self.protected_items.ensure_row(author).await?;
        self.protected_items.clear(author).await?;
        self.discord.send_reply(CLEARED).await?;
        Ok(())
    }

    /// Pages through the protected items, five per page.
    pub async fn viewfav(&self) -> Result<(), Error> {
        let author = self.discord.author_id();
        self.protected_items.ensure_row(author).await?;
        let ids = self.protected_items.load(author).await?;
        if ids.is_empty() {
            self.discord.send_reply(NOTHING_PROTECTED).await?;
            return Ok(());
        }

        let items: Vec<Item> = self
            .gateway
            .fetch_as(&query::protected_overview(&ids))
            .await?;
        if items.is_empty() {
            self.discord.send_reply(NOTHING_PROTECTED).await?;
            return Ok(());
        }
        let pages = items
            .chunks(PER_PAGE)
            .map(|chunk| {
                chunk.iter().fold(
                    Page::new("Protected items").color(BLURPLE),
                    |page, item| {
                        page.field(
                            item.name.clone(),
                            format!(
                                "With {} {} | ID: {}",
                                item.stat(),
                                item.stat_kind(),
                                item.id
                            ),
                            false,
                        )
                    },
                )
            })
            .collect();
        paginator::paginate(self.discord, pages, author, self.timeouts.navigation).await?;
        Ok(())
    }
}

//! Query strings in the API's `column=op.value` filter dialect.
//!
//! Builders return paths relative to the configured base URL; [`super::Gateway`]
//! joins them.

use crate::api::ENDPOINTS;
use crate::model::{Hand, Item, ItemType};
use thiserror::Error;
use url::form_urlencoded;

#[derive(Error, Debug, PartialEq)]
#[error(
    "Invalid query! Please make sure your URL starts with `{base_url}` and it includes a valid endpoint:\n\n`{endpoints}`",
    endpoints = ENDPOINTS.join(", ")
)]
pub struct InvalidQuery {
    pub base_url: String,
}

/// Accepts a full URL under `base_url` or a path whose endpoint is known.
pub fn passthrough(base_url: &str, query: &str) -> Result<String, InvalidQuery> {
    let query = query.trim();
    if query.starts_with(base_url) {
        return Ok(query.to_string());
    }
    let endpoint = query.split('?').next().unwrap_or_default();
    if ENDPOINTS.contains(&endpoint) {
        Ok(query.to_string())
    } else {
        Err(InvalidQuery {
            base_url: base_url.to_string(),
        })
    }
}

pub fn equipped_items(user: u64) -> String {
    format!(
        "allitems?select=id,damage,armor,name,type,inventory(equipped)&owner=eq.{user}&inventory.equipped=is.true"
    )
}

pub fn profile(user: u64) -> String {
    format!("profile?user=eq.{user}")
}

pub fn guild_by_id(id: i64) -> String {
    format!("guild?id=eq.{id}&limit=1")
}

pub fn guild_by_name(name: &str) -> String {
    let name: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!("guild?name=eq.{name}")
}

pub fn guild_members(guild_id: i64) -> String {
    format!("profile?guild=eq.{guild_id}")
}

pub fn items_by_ids(ids: &[i64]) -> String {
    format!("allitems?id=in.({})", join_ids(ids))
}

pub fn item_owners(ids: &[i64]) -> String {
    format!("allitems?select=owner,id&id=in.({})", join_ids(ids))
}

pub fn protected_overview(ids: &[i64]) -> String {
    format!(
        "allitems?select=name,id,armor,damage&id=in.({})",
        join_ids(ids)
    )
}

pub fn merge_source_by_id(id: i64) -> String {
    format!("allitems?select=*,inventory(equipped)&id=eq.{id}")
}

/// The owner's highest item of `item_type` that is still below the merge maximum.
pub fn merge_source_by_type(item_type: ItemType, owner: u64) -> String {
    let stat = item_type.stat_kind();
    format!(
        "allitems?select=*,inventory(equipped)&type=eq.{item_type}&order={stat}.desc&{stat}=lt.{max}&owner=eq.{owner}&limit=1",
        max = item_type.max_merge_stat(),
    )
}

/// Same-type, unsigned items of the source's owner within five stat points of it.
///
/// The `inventory` embed only carries rows for equipped items, so equipped
/// candidates still arrive and are dropped by the caller.
pub fn merge_candidates(source: &Item) -> String {
    let stat = source.stat_kind();
    let current = source.stat();
    let max = source.max_merge_stat();
    format!(
        "allitems?select=*,inventory(equipped)&{stat}=gte.{min}&{stat}=lte.{upper}&type=eq.{kind}&inventory.equipped=is.true&order={stat}.asc&signature=is.null&owner=eq.{owner}",
        min = current - 5,
        upper = (current + 5).min(max),
        kind = source.item_type,
        owner = source.owner,
    )
}

/// Filters shared by the bulk listing commands. `None` leaves a filter out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MerchFilter {
    pub user: u64,
    pub stat_lower: Option<i64>,
    pub stat_upper: Option<i64>,
    pub types: Vec<ItemType>,
    pub hands: Vec<Hand>,
    pub value_lower: Option<i64>,
    pub value_upper: Option<i64>,
    pub id_lower: Option<i64>,
    pub id_upper: Option<i64>,
}

pub fn unequipped_items(user: u64) -> String {
    format!("allitems?select=id,inventory(equipped)&inventory.equipped=is.false&owner=eq.{user}")
}

/// Two queries: damage items (armor 0) and armor items (damage 0).
pub fn merch_queries(filter: &MerchFilter) -> [String; 2] {
    let base = unequipped_items(filter.user);
    let mut damage = format!("{base}&armor=eq.0");
    let mut armor = format!("{base}&damage=eq.0");

    if let Some(lower) = filter.stat_lower {
        damage.push_str(&format!("&damage=gte.{lower}"));
        armor.push_str(&format!("&armor=gte.{lower}"));
    }
    if let Some(upper) = filter.stat_upper {
        damage.push_str(&format!("&damage=lte.{upper}"));
        armor.push_str(&format!("&armor=lte.{upper}"));
    }

    let mut shared = String::new();
    if !filter.types.is_empty() {
        let types: Vec<&str> = filter.types.iter().map(ItemType::as_str).collect();
        shared.push_str(&format!("&type=in.({})", types.join(",")));
    }
    if !filter.hands.is_empty() {
        let hands: Vec<&str> = filter.hands.iter().map(Hand::as_str).collect();
        shared.push_str(&format!("&hand=in.({})", hands.join(",")));
    }
    if let Some(lower) = filter.value_lower {
        shared.push_str(&format!("&value=gte.{lower}"));
    }
    if let Some(upper) = filter.value_upper {
        shared.push_str(&format!("&value=lte.{upper}"));
    }
    if let Some(lower) = filter.id_lower {
        shared.push_str(&format!("&id=gte.{lower}"));
    }
    if let Some(upper) = filter.id_upper {
        shared.push_str(&format!("&id=lte.{upper}"));
    }

    damage.push_str(&shared);
    armor.push_str(&shared);
    [damage, armor]
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

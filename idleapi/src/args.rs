//! Parsers that turn raw command arguments into tagged values before any
//! network call is made.

use crate::model::ItemType;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
#[error("{0}")]
pub struct InvalidInput(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(u64),
    Name(String),
}

impl UserRef {
    /// Mentions (`<@id>`, `<@!id>`) and bare ids become [`UserRef::Id`].
    pub fn parse(raw: &str) -> Result<UserRef, InvalidInput> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InvalidInput("No user given.".to_string()));
        }
        let unwrapped = raw
            .strip_prefix("<@")
            .and_then(|rest| rest.strip_suffix('>'))
            .map(|rest| rest.trim_start_matches('!'));
        if let Some(id) = unwrapped {
            return id
                .parse()
                .map(UserRef::Id)
                .map_err(|_| InvalidInput(format!("`{raw}` is not a valid mention.")));
        }
        match raw.parse::<u64>() {
            Ok(id) => Ok(UserRef::Id(id)),
            Err(_) => Ok(UserRef::Name(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeTarget {
    ItemId(i64),
    Type(ItemType),
}

impl MergeTarget {
    pub fn parse(raw: &str) -> Result<MergeTarget, InvalidInput> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            return Ok(MergeTarget::ItemId(id));
        }
        raw.parse::<ItemType>()
            .map(MergeTarget::Type)
            .map_err(|e| InvalidInput(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildRef {
    Id(i64),
    Name(String),
}

impl GuildRef {
    pub fn parse(raw: &str) -> Result<GuildRef, InvalidInput> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InvalidInput("Please give a guild name or ID.".to_string()));
        }
        Ok(match raw.parse::<i64>() {
            Ok(id) => GuildRef::Id(id),
            Err(_) => GuildRef::Name(raw.to_string()),
        })
    }
}

/// Whitespace or comma separated item ids, in the order given.
pub fn parse_item_ids(raw: &str) -> Result<Vec<i64>, InvalidInput> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<i64>()
                .map_err(|_| InvalidInput(format!("`{token}` is not a valid item ID.")))
        })
        .collect()
}

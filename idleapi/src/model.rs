//! Typed views over the rows the IdleRPG API returns.

use serde::{Deserialize, Deserializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
    Any,
    Both,
}

impl Hand {
    pub const ALL: [Hand; 4] = [Hand::Left, Hand::Right, Hand::Any, Hand::Both];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
            Hand::Any => "any",
            Hand::Both => "both",
        }
    }

    /// Highest stat an item held in this hand can be merged up to.
    pub fn max_merge_stat(&self) -> i64 {
        match self {
            Hand::Both => 82,
            _ => 41,
        }
    }

    /// Case-insensitive lookup, `None` for anything unknown.
    pub fn parse(raw: &str) -> Option<Hand> {
        let raw = raw.trim().to_lowercase();
        Hand::ALL.into_iter().find(|hand| hand.as_str() == raw)
    }
}

impl Display for Hand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Damage,
    Armor,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Damage => "damage",
            StatKind::Armor => "armor",
        }
    }
}

impl Display for StatKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Sword,
    Shield,
    Axe,
    Wand,
    Dagger,
    Knife,
    Spear,
    Bow,
    Hammer,
    Scythe,
    Howlet,
}

#[derive(Error, Debug, PartialEq)]
#[error("`{0}` is not a valid item type.")]
pub struct UnknownItemType(pub String);

impl ItemType {
    pub const ALL: [ItemType; 11] = [
        ItemType::Sword,
        ItemType::Shield,
        ItemType::Axe,
        ItemType::Wand,
        ItemType::Dagger,
        ItemType::Knife,
        ItemType::Spear,
        ItemType::Bow,
        ItemType::Hammer,
        ItemType::Scythe,
        ItemType::Howlet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Sword => "Sword",
            ItemType::Shield => "Shield",
            ItemType::Axe => "Axe",
            ItemType::Wand => "Wand",
            ItemType::Dagger => "Dagger",
            ItemType::Knife => "Knife",
            ItemType::Spear => "Spear",
            ItemType::Bow => "Bow",
            ItemType::Hammer => "Hammer",
            ItemType::Scythe => "Scythe",
            ItemType::Howlet => "Howlet",
        }
    }

    pub fn hand(&self) -> Hand {
        match self {
            ItemType::Shield => Hand::Left,
            ItemType::Wand | ItemType::Spear => Hand::Right,
            ItemType::Bow | ItemType::Scythe | ItemType::Howlet => Hand::Both,
            _ => Hand::Any,
        }
    }

    pub fn stat_kind(&self) -> StatKind {
        match self {
            ItemType::Shield => StatKind::Armor,
            _ => StatKind::Damage,
        }
    }

    pub fn max_merge_stat(&self) -> i64 {
        self.hand().max_merge_stat()
    }
}

impl FromStr for ItemType {
    type Err = UnknownItemType;

    /// Accepts any casing, so `sCyThE` resolves to [`ItemType::Scythe`].
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let title = title_case(raw.trim());
        ItemType::ALL
            .into_iter()
            .find(|t| t.as_str() == title)
            .ok_or(UnknownItemType(title))
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn title_case(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InventoryEntry {
    #[serde(default)]
    pub equipped: bool,
}

/// A row of the `allitems` endpoint. Every column but `id` may be left out by `select=`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Item {
    pub id: i64,
    #[serde(default)]
    pub owner: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub item_type: String,
    #[serde(default, deserialize_with = "numeric")]
    pub damage: i64,
    #[serde(default, deserialize_with = "numeric")]
    pub armor: i64,
    #[serde(default, deserialize_with = "numeric")]
    pub value: i64,
    #[serde(default)]
    pub hand: String,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub original_type: Option<String>,
    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,
}

// Postgres numerics come back as `35.00` as often as `35`.
fn numeric<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|v| v.round() as i64).unwrap_or_default())
}

impl Item {
    pub fn stat(&self) -> i64 {
        self.damage + self.armor
    }

    pub fn kind(&self) -> Option<ItemType> {
        self.item_type.parse().ok()
    }

    pub fn stat_kind(&self) -> StatKind {
        match self.kind() {
            Some(kind) => kind.stat_kind(),
            None if self.armor > 0 && self.damage == 0 => StatKind::Armor,
            None => StatKind::Damage,
        }
    }

    pub fn hand(&self) -> Option<Hand> {
        Hand::parse(&self.hand)
    }

    pub fn max_merge_stat(&self) -> i64 {
        self.hand()
            .or_else(|| self.kind().map(|kind| kind.hand()))
            .unwrap_or(Hand::Any)
            .max_merge_stat()
    }

    pub fn is_equipped(&self) -> bool {
        self.inventory.iter().any(|entry| entry.equipped)
    }

    /// Whether an `inventory.equipped=is.false` embed matched this item.
    pub fn is_listed_unequipped(&self) -> bool {
        self.inventory.iter().any(|entry| !entry.equipped)
    }
}

/// `(level, minimum xp)` for every reachable level.
pub const LEVEL_TABLE: [(u32, i64); 30] = [
    (1, 0),
    (2, 1500),
    (3, 9000),
    (4, 22500),
    (5, 42000),
    (6, 67500),
    (7, 99000),
    (8, 136500),
    (9, 180000),
    (10, 229500),
    (11, 285000),
    (12, 346500),
    (13, 414000),
    (14, 487500),
    (15, 567000),
    (16, 697410),
    (17, 857814),
    (18, 1055112),
    (19, 1297787),
    (20, 1596278),
    (21, 1931497),
    (22, 2298481),
    (23, 2689223),
    (24, 3092606),
    (25, 3494645),
    (26, 3879056),
    (27, 4228171),
    (28, 4608707),
    (29, 5023490),
    (30, 5475604),
];

pub fn level_for_xp(xp: i64) -> u32 {
    for (level, threshold) in LEVEL_TABLE {
        if xp == threshold {
            return level;
        }
        if xp < threshold {
            return level - 1;
        }
    }
    30
}

/// "A" or "An" for the given noun.
pub fn article(noun: &str) -> &'static str {
    match noun.chars().next() {
        Some('A' | 'E' | 'I' | 'O' | 'U' | 'a' | 'e' | 'i' | 'o' | 'u') => "An",
        _ => "A",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_types_resolve_case_insensitively() {
        assert_eq!("scythe".parse::<ItemType>(), Ok(ItemType::Scythe));
        assert_eq!("  SHIELD ".parse::<ItemType>(), Ok(ItemType::Shield));
        assert_eq!(
            "spoon".parse::<ItemType>(),
            Err(UnknownItemType("Spoon".into()))
        );
    }

    #[test]
    fn item_types_know_their_hand_and_stat() {
        assert_eq!(ItemType::Shield.hand(), Hand::Left);
        assert_eq!(ItemType::Shield.stat_kind(), StatKind::Armor);
        assert_eq!(ItemType::Wand.hand(), Hand::Right);
        assert_eq!(ItemType::Howlet.hand(), Hand::Both);
        assert_eq!(ItemType::Knife.hand(), Hand::Any);
        assert_eq!(ItemType::Bow.max_merge_stat(), 82);
        assert_eq!(ItemType::Sword.max_merge_stat(), 41);
    }

    #[test]
    fn hands_parse_lowercase_only_known_values() {
        assert_eq!(Hand::parse("Both"), Some(Hand::Both));
        assert_eq!(Hand::parse("middle"), None);
    }

    #[test]
    fn item_deserializes_partial_selects_and_numeric_stats() {
        // Arrange
        let raw = r#"{"id": 12, "damage": 35.00, "armor": 0, "type": "Sword",
                      "inventory": [{"equipped": true}]}"#;

        // Act
        let item: Item = serde_json::from_str(raw).unwrap();

        // Assert
        assert_eq!(item.id, 12);
        assert_eq!(item.stat(), 35);
        assert_eq!(item.kind(), Some(ItemType::Sword));
        assert!(item.is_equipped());
        assert_eq!(item.owner, 0);
        assert_eq!(item.signature, None);
    }

    #[test]
    fn item_max_merge_stat_prefers_reported_hand() {
        let item = Item {
            hand: "both".into(),
            item_type: "Sword".into(),
            ..Default::default()
        };
        assert_eq!(item.max_merge_stat(), 82);

        let item = Item {
            item_type: "Scythe".into(),
            ..Default::default()
        };
        assert_eq!(item.max_merge_stat(), 82);
    }

    #[test]
    fn level_for_xp_uses_thresholds() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(1499), 1);
        assert_eq!(level_for_xp(1500), 2);
        assert_eq!(level_for_xp(229_499), 9);
        assert_eq!(level_for_xp(5_475_604), 30);
        assert_eq!(level_for_xp(99_999_999), 30);
    }

    #[test]
    fn article_picks_an_for_vowels() {
        assert_eq!(article("Axe"), "An");
        assert_eq!(article("Howlet"), "A");
        assert_eq!(article(""), "A");
    }
}

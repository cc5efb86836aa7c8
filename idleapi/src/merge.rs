//! Picks the best partner for merging an item.

use crate::model::Item;

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub partner: Item,
    /// How many items qualified.
    pub found: usize,
    /// The partner is stronger than the source.
    pub partner_is_stronger: bool,
}

pub const AT_MAX: &str = "This item is already at max mergeable stat or above.";

/// Whether `source` can still gain a point by merging.
pub fn can_merge(source: &Item) -> bool {
    source.stat() < source.max_merge_stat()
}

/// Stat window a partner must fall in: five either side, capped at the maximum.
pub fn stat_window(source: &Item) -> (i64, i64) {
    let stat = source.stat();
    (stat - 5, (stat + 5).min(source.max_merge_stat()))
}

/// The weakest qualifying candidate; ties keep upstream order.
pub fn suggest(source: &Item, candidates: Vec<Item>) -> Option<Suggestion> {
    let (low, high) = stat_window(source);
    let mut fitting: Vec<Item> = candidates
        .into_iter()
        .filter(|item| {
            item.id != source.id
                && !item.is_equipped()
                && item.signature.is_none()
                && item.owner == source.owner
                && item.item_type == source.item_type
                && (low..=high).contains(&item.stat())
        })
        .collect();
    fitting.sort_by_key(Item::stat);

    let found = fitting.len();
    let partner = fitting.into_iter().next()?;
    Some(Suggestion {
        partner_is_stronger: partner.stat() > source.stat(),
        partner,
        found,
    })
}

pub fn render(source: &Item, suggestion: &Suggestion) -> String {
    let stat = source.stat_kind();
    let partner = &suggestion.partner;
    let warning = if suggestion.partner_is_stronger {
        format!(
            ":warning: The best possible item has a higher {stat} than the original item. \
             Consider switching the IDs around."
        )
    } else {
        String::new()
    };
    format!(
        "{warning}\n\nFound {found} mergable item(s).\n\n\
         {id}: {current} {stat} {kind} + \n\
         {partner_id}: {partner_stat} {stat} {partner_kind}\n\
         ==========\n\
         {id}: {merged} {stat} {kind}\n\n\
         `$merge {id} {partner_id}`",
        found = suggestion.found,
        id = source.id,
        current = source.stat(),
        kind = source.item_type,
        partner_id = partner.id,
        partner_stat = partner.stat(),
        partner_kind = partner.item_type,
        merged = source.stat() + 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InventoryEntry;

    fn sword(id: i64, damage: i64) -> Item {
        Item {
            id,
            owner: 10,
            name: format!("Sword {id}"),
            item_type: "Sword".into(),
            hand: "any".into(),
            damage,
            ..Default::default()
        }
    }

    #[test]
    fn picks_the_weakest_candidate_without_warning() {
        // Arrange
        let source = sword(1, 35);
        let candidates = vec![sword(2, 38), sword(3, 32)];

        // Act
        let suggestion = suggest(&source, candidates).unwrap();

        // Assert
        assert_eq!(suggestion.partner.id, 3);
        assert_eq!(suggestion.found, 2);
        assert!(!suggestion.partner_is_stronger);
    }

    #[test]
    fn warns_when_only_stronger_items_fit() {
        let source = sword(1, 30);
        let suggestion = suggest(&source, vec![sword(2, 33)]).unwrap();
        assert!(suggestion.partner_is_stronger);
        assert!(render(&source, &suggestion).starts_with(":warning: The best possible item has a higher damage"));
    }

    #[test]
    fn ties_keep_upstream_order() {
        let source = sword(1, 35);
        let suggestion = suggest(&source, vec![sword(7, 33), sword(4, 33)]).unwrap();
        assert_eq!(suggestion.partner.id, 7);
    }

    #[test]
    fn skips_source_equipped_signed_and_out_of_window_items() {
        // Arrange
        let source = sword(1, 35);
        let mut equipped = sword(2, 34);
        equipped.inventory = vec![InventoryEntry { equipped: true }];
        let mut signed = sword(3, 34);
        signed.signature = Some("mine".into());
        let mut foreign = sword(4, 34);
        foreign.owner = 11;
        let mut axe = sword(5, 34);
        axe.item_type = "Axe".into();
        let candidates = vec![
            sword(1, 35),
            equipped,
            signed,
            foreign,
            axe,
            sword(6, 29),
            sword(7, 42),
        ];

        // Act
        let suggestion = suggest(&source, candidates);

        // Assert
        assert_eq!(suggestion, None);
    }

    #[test]
    fn window_is_capped_at_the_maximum() {
        assert_eq!(stat_window(&sword(1, 38)), (33, 41));
        let mut bow = sword(1, 80);
        bow.item_type = "Bow".into();
        bow.hand = "both".into();
        assert_eq!(stat_window(&bow), (75, 82));
    }

    #[test]
    fn items_at_max_cannot_merge() {
        assert!(!can_merge(&sword(1, 41)));
        assert!(can_merge(&sword(1, 40)));
    }

    #[test]
    fn render_shows_result_and_command() {
        // Arrange
        let source = sword(1, 35);
        let suggestion = suggest(&source, vec![sword(3, 32)]).unwrap();

        // Act
        let text = render(&source, &suggestion);

        // Assert
        assert_eq!(
            text,
            "\n\nFound 1 mergable item(s).\n\n1: 35 damage Sword + \n3: 32 damage Sword\n==========\n1: 36 damage Sword\n\n`$merge 1 3`"
        );
    }
}

//! Superior/inferior buff pairs
//!
//! At most one buff of a pair may be visible on the player. While the
//! superior is applied the inferior is held back; removing the superior
//! reveals it.

use phf::phf_map;
use stashbuff_types::BuffId;

/// superior -> inferior
static CONFLICT_PAIRS: phf::Map<i32, i32> = phf_map! {
    1207i32 => 1206i32,
};

pub fn inferior_of(id: BuffId) -> Option<BuffId> {
    CONFLICT_PAIRS.get(&id).copied()
}

pub fn superior_of(id: BuffId) -> Option<BuffId> {
    CONFLICT_PAIRS
        .entries()
        .find(|(_, inferior)| **inferior == id)
        .map(|(superior, _)| *superior)
}

/// Superiors rank first, then inferiors, then unpaired buffs
fn priority_tier(id: BuffId) -> u8 {
    if inferior_of(id).is_some() {
        0
    } else if superior_of(id).is_some() {
        1
    } else {
        2
    }
}

/// Sort buffs into desired-priority order (tier, then id)
pub fn priority_order(ids: impl IntoIterator<Item = BuffId>) -> Vec<BuffId> {
    let mut ordered: Vec<BuffId> = ids.into_iter().collect();
    ordered.sort_by_key(|id| (priority_tier(*id), *id));
    ordered.dedup();
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_lookup_both_directions() {
        assert_eq!(inferior_of(1207), Some(1206));
        assert_eq!(superior_of(1206), Some(1207));
        assert_eq!(inferior_of(1206), None);
        assert_eq!(superior_of(1011), None);
    }

    #[test]
    fn test_priority_order_puts_superior_before_inferior() {
        assert_eq!(
            priority_order([1011, 1206, 1207, 1012]),
            vec![1207, 1206, 1011, 1012]
        );
    }
}

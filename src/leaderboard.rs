//! Ranks the rider's total distance against a comparison pool.

use serde::{Deserialize, Serialize};

/// Identifier of the synthetic entry representing the rider.
pub const SELF_ID: &str = "you";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderEntry {
    pub id: String,
    pub name: String,
    pub distance_km: f64,
    #[serde(default)]
    pub is_self: bool,
}

impl LeaderEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, distance_km: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            distance_km,
            is_self: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    /// Highest distance first.
    pub entries: Vec<LeaderEntry>,
    /// 1-based place of the rider, `None` when not on the board.
    pub self_rank: Option<usize>,
}

impl Ranking {
    /// Finds the rider's place in an already sorted board.
    pub fn locate_self(entries: &[LeaderEntry]) -> Option<usize> {
        entries
            .iter()
            .position(|entry| entry.is_self)
            .map(|index| index + 1)
    }
}

/// Rounds to one decimal place, the precision the board is shown at.
pub fn round_to_tenth(distance_km: f64) -> f64 {
    (distance_km * 10.0).round() / 10.0
}

/// Adds the rider to `pool` and sorts by distance, highest first.
///
/// The sort is stable: equal distances keep pool order and the rider, added
/// last, ranks below pool entries with the same distance.
pub fn rank(pool: &[LeaderEntry], self_name: &str, self_distance_km: f64) -> Ranking {
    let mut entries: Vec<LeaderEntry> = pool
        .iter()
        .cloned()
        .map(|entry| LeaderEntry {
            is_self: false,
            ..entry
        })
        .collect();

    entries.push(LeaderEntry {
        id: SELF_ID.to_string(),
        name: self_name.to_string(),
        distance_km: round_to_tenth(self_distance_km),
        is_self: true,
    });

    entries.sort_by(|a, b| b.distance_km.total_cmp(&a.distance_km));

    let self_rank = Ranking::locate_self(&entries);
    Ranking { entries, self_rank }
}

/// The comparison pool shipped with the app until a real backend exists.
pub fn demo_pool() -> Vec<LeaderEntry> {
    vec![
        LeaderEntry::new("1", "Fast Fox", 120.0),
        LeaderEntry::new("2", "Night Rider", 95.0),
        LeaderEntry::new("3", "Urban Rocket", 68.0),
        LeaderEntry::new("4", "Gravel Ghost", 42.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distances(ranking: &Ranking) -> Vec<f64> {
        ranking.entries.iter().map(|e| e.distance_km).collect()
    }

    #[test]
    fn rider_slots_in_by_distance() {
        let ranking = rank(&demo_pool(), "You", 100.0);

        assert_eq!(distances(&ranking), [120.0, 100.0, 95.0, 68.0, 42.0]);
        assert!(ranking.entries[1].is_self);
        assert_eq!(ranking.entries[1].id, SELF_ID);
        assert_eq!(ranking.self_rank, Some(2));
    }

    #[test]
    fn new_rider_is_last() {
        let ranking = rank(&demo_pool(), "You", 0.0);
        assert_eq!(ranking.self_rank, Some(5));
    }

    #[test]
    fn leader_when_furthest() {
        let ranking = rank(&demo_pool(), "You", 500.04);
        assert_eq!(ranking.self_rank, Some(1));
        assert_eq!(ranking.entries[0].distance_km, 500.0);
    }

    #[test]
    fn self_distance_is_rounded() {
        let ranking = rank(&[], "You", 12.345);
        assert_eq!(ranking.entries[0].distance_km, 12.3);
        assert_eq!(round_to_tenth(94.96), 95.0);
    }

    #[test]
    fn ties_keep_pool_order_and_rider_after() {
        let pool = vec![
            LeaderEntry::new("a", "A", 50.0),
            LeaderEntry::new("b", "B", 70.0),
            LeaderEntry::new("c", "C", 50.0),
        ];
        let ranking = rank(&pool, "You", 50.0);

        let ids: Vec<_> = ranking.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c", SELF_ID]);
        assert_eq!(ranking.self_rank, Some(4));
    }

    #[test]
    fn pool_cannot_impersonate_rider() {
        let mut imposter = LeaderEntry::new("x", "X", 999.0);
        imposter.is_self = true;
        let ranking = rank(&[imposter], "You", 1.0);

        assert_eq!(ranking.self_rank, Some(2));
        assert_eq!(ranking.entries.iter().filter(|e| e.is_self).count(), 1);
    }

    #[test]
    fn board_without_rider_is_unranked() {
        let entries = demo_pool();
        assert_eq!(Ranking::locate_self(&entries), None);
    }
}

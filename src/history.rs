use std::collections::{HashMap, HashSet};

/// One merged historical match row. Immutable once loaded; the collection is
/// append-only at load time and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub match_id: u64,
    pub team_a: String,
    pub team_b: String,
    pub toss_winner: String,
    pub toss_decision: String,
    pub stadium: String,
    pub winner: Option<String>,
    pub score_a: Option<f64>,
    pub wickets_a: Option<f64>,
    pub overs_a: Option<f64>,
    pub runrate_a: Option<f64>,
    pub score_b: Option<f64>,
    pub wickets_b: Option<f64>,
    pub overs_b: Option<f64>,
    pub runrate_b: Option<f64>,
}

impl MatchRecord {
    pub fn involves_pair(&self, team_x: &str, team_y: &str) -> bool {
        (self.team_a == team_x && self.team_b == team_y)
            || (self.team_a == team_y && self.team_b == team_x)
    }

    pub fn won_by(&self, team: &str) -> bool {
        self.winner.as_deref() == Some(team)
    }
}

/// Read-only view over the merged match history plus the team-to-venues side
/// table used for the home-ground note. Loaded once, shared by reference.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    matches: Vec<MatchRecord>,
    team_venues: HashMap<String, HashSet<String>>,
}

impl HistoryStore {
    pub fn new(
        matches: Vec<MatchRecord>,
        team_venues: HashMap<String, HashSet<String>>,
    ) -> Self {
        Self {
            matches,
            team_venues,
        }
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn total_matches(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.match_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Matches between the two teams, regardless of which side was listed
    /// first.
    pub fn head_to_head(&self, team_x: &str, team_y: &str) -> Vec<&MatchRecord> {
        self.matches
            .iter()
            .filter(|m| m.involves_pair(team_x, team_y))
            .collect()
    }

    pub fn wins(&self, team: &str) -> usize {
        self.matches.iter().filter(|m| m.won_by(team)).count()
    }

    pub fn win_rate(&self, team: &str) -> f64 {
        let total = self.total_matches();
        if total == 0 {
            return 0.0;
        }
        self.wins(team) as f64 / total as f64
    }

    pub fn is_home_venue(&self, team: &str, venue: &str) -> bool {
        self.team_venues
            .get(team)
            .is_some_and(|venues| venues.contains(venue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, team_a: &str, team_b: &str, winner: Option<&str>) -> MatchRecord {
        MatchRecord {
            match_id: id,
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            toss_winner: team_a.to_string(),
            toss_decision: "Bat".to_string(),
            stadium: "Eden Gardens".to_string(),
            winner: winner.map(|w| w.to_string()),
            score_a: None,
            wickets_a: None,
            overs_a: None,
            runrate_a: None,
            score_b: None,
            wickets_b: None,
            overs_b: None,
            runrate_b: None,
        }
    }

    #[test]
    fn head_to_head_ignores_listing_order() {
        let store = HistoryStore::new(
            vec![
                record(1, "India", "Australia", Some("India")),
                record(2, "Australia", "India", Some("Australia")),
                record(3, "India", "England", Some("India")),
            ],
            HashMap::new(),
        );
        let forward = store.head_to_head("India", "Australia");
        let reverse = store.head_to_head("Australia", "India");
        assert_eq!(forward.len(), 2);
        let forward_ids: Vec<u64> = forward.iter().map(|m| m.match_id).collect();
        let reverse_ids: Vec<u64> = reverse.iter().map(|m| m.match_id).collect();
        assert_eq!(forward_ids, reverse_ids);
    }

    #[test]
    fn win_rate_uses_distinct_match_count() {
        let store = HistoryStore::new(
            vec![
                record(1, "India", "Australia", Some("India")),
                record(2, "India", "England", Some("India")),
                record(3, "England", "Australia", Some("Australia")),
                record(4, "India", "Australia", None),
            ],
            HashMap::new(),
        );
        assert_eq!(store.total_matches(), 4);
        assert!((store.win_rate("India") - 0.5).abs() < 1e-12);
        assert!((store.win_rate("Australia") - 0.25).abs() < 1e-12);
    }

    #[test]
    fn empty_store_has_zero_win_rate() {
        let store = HistoryStore::default();
        assert_eq!(store.win_rate("India"), 0.0);
        assert!(store.is_empty());
    }

    #[test]
    fn home_venue_lookup() {
        let mut venues = HashMap::new();
        venues.insert(
            "India".to_string(),
            ["Eden Gardens".to_string()].into_iter().collect(),
        );
        let store = HistoryStore::new(Vec::new(), venues);
        assert!(store.is_home_venue("India", "Eden Gardens"));
        assert!(!store.is_home_venue("India", "Lord's"));
        assert!(!store.is_home_venue("Australia", "Eden Gardens"));
    }
}

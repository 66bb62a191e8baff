//! Cumulative points table: 3 for a win, 1 for a draw, 0 for a loss.
//! Ties go to the participant with fewer games played, then by name.

use std::cmp::Reverse;
use std::collections::HashMap;

use super::{RankEntry, RankingView};
use crate::record::{ResultRecord, Tally};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct League {
    tallies: HashMap<String, Tally>,
}

impl League {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally(&self, participant: &str) -> Option<&Tally> {
        self.tallies.get(participant)
    }

    pub fn score(&self, participant: &str) -> Option<u32> {
        self.tally(participant).map(Tally::score)
    }

    fn sorted(&self) -> Vec<(&String, &Tally)> {
        let mut rows: Vec<(&String, &Tally)> = self.tallies.iter().collect();
        rows.sort_by_key(|(name, t)| (Reverse(t.score()), t.played(), *name));
        rows
    }
}

impl RankingView for League {
    fn name(&self) -> &'static str {
        "league"
    }

    fn on_result(&mut self, record: &ResultRecord) {
        for participant in [&record.white, &record.black] {
            if let Some(verdict) = record.verdict_for(participant) {
                self.tallies
                    .entry(participant.clone())
                    .or_default()
                    .add(verdict);
            }
        }
    }

    fn standings(&self) -> Vec<RankEntry> {
        self.sorted()
            .into_iter()
            .enumerate()
            .map(|(i, (name, tally))| RankEntry {
                rank: i + 1,
                participant: name.clone(),
                tally: Some(*tally),
            })
            .collect()
    }

    fn rank_of(&self, participant: &str) -> Option<usize> {
        if !self.tallies.contains_key(participant) {
            return None;
        }
        self.sorted()
            .iter()
            .position(|(name, _)| name.as_str() == participant)
            .map(|i| i + 1)
    }
}

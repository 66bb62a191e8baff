//! Challenge ladder.
//!
//! Participants join at the bottom on their first counted result. A decisive
//! win by a lower-ranked player starts a climb: the winner swaps with the
//! player directly above as long as the most recent decisive game between
//! the two (the current one included) went the winner's way, and stops at
//! the first player it has not beaten. Draws never move anyone.

use std::collections::HashMap;

use super::{RankEntry, RankingView};
use crate::record::ResultRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ladder {
    /// Top of the ladder first.
    order: Vec<String>,
    positions: HashMap<String, usize>,
    /// Unordered pair -> winner of their latest decisive game.
    last_decisive: HashMap<(String, String), String>,
}

fn pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl Ladder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Participants from the top down.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Whether `winner` took the latest decisive game against `other`.
    pub fn has_beaten(&self, winner: &str, other: &str) -> bool {
        self.last_decisive
            .get(&pair(winner, other))
            .is_some_and(|w| w == winner)
    }

    fn enter(&mut self, participant: &str) {
        if !self.positions.contains_key(participant) {
            self.positions
                .insert(participant.to_string(), self.order.len());
            self.order.push(participant.to_string());
        }
    }

    fn climb(&mut self, winner: &str, loser: &str) {
        let (Some(&start), Some(&loser_pos)) =
            (self.positions.get(winner), self.positions.get(loser))
        else {
            return;
        };
        if start < loser_pos {
            return;
        }

        let mut pos = start;
        while pos > 0 && self.has_beaten(winner, &self.order[pos - 1]) {
            self.order.swap(pos - 1, pos);
            self.positions.insert(self.order[pos].clone(), pos);
            pos -= 1;
        }
        self.positions.insert(winner.to_string(), pos);

        if pos != start {
            tracing::debug!(%winner, from = start + 1, to = pos + 1, "Ladder climb");
        }
    }
}

impl RankingView for Ladder {
    fn name(&self) -> &'static str {
        "ladder"
    }

    fn on_result(&mut self, record: &ResultRecord) {
        self.enter(&record.white);
        self.enter(&record.black);

        if let (Some(winner), Some(loser)) = (record.winner(), record.loser()) {
            self.last_decisive
                .insert(pair(winner, loser), winner.to_string());
            self.climb(winner, loser);
        }
    }

    fn standings(&self) -> Vec<RankEntry> {
        self.order
            .iter()
            .enumerate()
            .map(|(i, p)| RankEntry {
                rank: i + 1,
                participant: p.clone(),
                tally: None,
            })
            .collect()
    }

    fn rank_of(&self, participant: &str) -> Option<usize> {
        self.positions.get(participant).map(|p| p + 1)
    }
}

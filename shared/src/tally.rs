use serde::{Serialize, Deserialize};
use uuid::Uuid;
use crate::models::VoteOption;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option_id: Uuid,
    pub count: u64,
    pub percentage: f64,
}

/// Per-option counts and shares, in option order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub total_votes: u64,
    pub options: Vec<OptionTally>,
}

impl Tally {
    pub fn get(&self, option_id: Uuid) -> Option<&OptionTally> {
        self.options.iter().find(|tally| tally.option_id == option_id)
    }
}

/// Derives the tally from a snapshot of option counters.
///
/// The total is summed from the same snapshot, so the result is reproducible
/// for identical counters. Percentages are plain `count / total * 100`.
pub fn compute_tally(options: &[VoteOption]) -> Tally {
    let total_votes: u64 = options.iter().map(|option| option.vote_count).sum();

    let options = options
        .iter()
        .map(|option| OptionTally {
            option_id: option.id,
            count: option.vote_count,
            percentage: percentage(option.vote_count, total_votes),
        })
        .collect();

    Tally { total_votes, options }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

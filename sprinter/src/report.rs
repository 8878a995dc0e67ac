use std::collections::BTreeMap;
use std::fmt;

use crate::outcome::ResponseOutcome;

/// Descriptive per-cycle statistics, emitted to the log collaborator after
/// each dispatch. Never stored and never fed back into diff classification.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub total: usize,
    pub status_counts: BTreeMap<i32, usize>,
    pub min_length: u64,
    pub max_length: u64,
    pub mean_length: f64,
}

impl CycleReport {
    pub fn from_outcomes(outcomes: &[ResponseOutcome]) -> Option<Self> {
        if outcomes.is_empty() {
            return None;
        }

        let mut status_counts = BTreeMap::new();
        for outcome in outcomes {
            *status_counts.entry(outcome.status).or_insert(0) += 1;
        }

        let min_length = outcomes.iter().map(|o| o.body_length).min().unwrap_or(0);
        let max_length = outcomes.iter().map(|o| o.body_length).max().unwrap_or(0);
        let mean_length =
            outcomes.iter().map(|o| o.body_length as f64).sum::<f64>() / outcomes.len() as f64;

        Some(Self {
            total: outcomes.len(),
            status_counts,
            min_length,
            max_length,
            mean_length,
        })
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "request analysis:")?;
        writeln!(f, "  total requests sent: {}", self.total)?;
        writeln!(f, "  status code distribution:")?;
        for (code, count) in &self.status_counts {
            writeln!(f, "    HTTP {code}: {count} requests")?;
        }
        write!(
            f,
            "  response length: min {} bytes, max {} bytes, mean {:.2} bytes",
            self.min_length, self.max_length, self.mean_length
        )
    }
}

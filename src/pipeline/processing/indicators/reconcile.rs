use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::IndicatorConfig;
use crate::domain::{ActivityCode, CanonicalRecord, Metric, Period, SourceType};

/// A single reconciled value used by the indicator calculations.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: Metric,
    pub region_code: String,
    pub activity: ActivityCode,
    pub period: Period,
    pub value: f64,
}

/// Two sources reported the same (metric, region, activity, period); one was kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub metric: Metric,
    pub region_code: String,
    pub activity_code: String,
    pub period: Period,
    pub kept_source_id: String,
    pub kept_source_type: SourceType,
    pub kept_value: f64,
    pub discarded_source_id: String,
    pub discarded_source_type: SourceType,
    pub discarded_value: f64,
}

type Key = (Metric, String, ActivityCode, Period);

struct Candidate<'a> {
    record: &'a CanonicalRecord,
    value: f64,
    rank: usize,
}

/// Keep one value per (metric, region, activity, period).
///
/// The source type ranked highest in the configured precedence wins; between equal
/// ranks the record seen later wins. Records without a value take no part.
pub fn reconcile(records: &[CanonicalRecord], config: &IndicatorConfig) -> (Vec<Observation>, Vec<ConflictResolution>) {
    let mut winners: BTreeMap<Key, Candidate> = BTreeMap::new();
    let mut conflicts = Vec::new();

    for record in records {
        let value = match record.value {
            Some(v) => v,
            None => continue,
        };
        let candidate = Candidate {
            record,
            value,
            rank: config.precedence_rank(record.source_type),
        };
        let key = (
            record.metric(),
            record.region_code.clone(),
            record.activity.clone(),
            record.period,
        );

        match winners.remove(&key) {
            None => {
                winners.insert(key, candidate);
            }
            Some(current) => {
                let (kept, discarded) = if candidate.rank <= current.rank {
                    (candidate, current)
                } else {
                    (current, candidate)
                };
                debug!(
                    region = %key.1,
                    activity = kept.record.activity.code(),
                    period = %key.3,
                    kept = %kept.record.source_id,
                    discarded = %discarded.record.source_id,
                    "Resolved cross-source conflict"
                );
                conflicts.push(ConflictResolution {
                    metric: key.0,
                    region_code: key.1.clone(),
                    activity_code: key.2.code().to_string(),
                    period: key.3,
                    kept_source_id: kept.record.source_id.clone(),
                    kept_source_type: kept.record.source_type,
                    kept_value: kept.value,
                    discarded_source_id: discarded.record.source_id.clone(),
                    discarded_source_type: discarded.record.source_type,
                    discarded_value: discarded.value,
                });
                winners.insert(key, kept);
            }
        }
    }

    let observations = winners
        .into_iter()
        .map(|((metric, region_code, activity, period), candidate)| Observation {
            metric,
            region_code,
            activity,
            period,
            value: candidate.value,
        })
        .collect();

    (observations, conflicts)
}

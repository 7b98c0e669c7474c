//! Lower-median selection over repeated runs of one workload.

use crate::error::{BenchError, Result};
use crate::score::{ScoreKeyPath, ScoreRecord};

/// Index of the representative element in a sorted batch of `len` runs.
///
/// Even-sized batches resolve to the lower of the two middle elements.
pub fn median_index(len: usize) -> Option<usize> {
    len.checked_sub(1).map(|last| last / 2)
}

/// Pick the run whose score is the lower median of the batch.
///
/// Every record must carry a numeric value at `key`; a single missing or
/// unparsable key fails the whole batch. Ties keep their run order.
pub fn select_representative(
    workload: &str,
    records: Vec<ScoreRecord>,
    key: &ScoreKeyPath,
) -> Result<ScoreRecord> {
    let Some(index) = median_index(records.len()) else {
        return Err(BenchError::EmptyRuns {
            workload: workload.to_string(),
        });
    };

    let mut keyed = records
        .into_iter()
        .enumerate()
        .map(|(position, record)| match record.sort_key(key) {
            Some(score) => Ok((score, record)),
            None => Err(BenchError::InvalidScore {
                workload: workload.to_string(),
                run: position + 1,
                key: key.to_string(),
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    Ok(keyed.swap_remove(index).1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(score: f64, tag: &str) -> ScoreRecord {
        ScoreRecord::new(json!({
            "scores": {"Total Score": score.to_string()},
            "date": tag,
        }))
    }

    fn pick(scores: &[f64]) -> f64 {
        let records = scores
            .iter()
            .enumerate()
            .map(|(i, s)| record(*s, &format!("run-{i}")))
            .collect();
        let selected =
            select_representative("Speedometer2", records, &ScoreKeyPath::default()).unwrap();
        selected.sort_key(&ScoreKeyPath::default()).unwrap()
    }

    #[test]
    fn single_run_is_returned_unchanged() {
        let only = record(42.0, "only");
        let selected =
            select_representative("WebXPRT3", vec![only.clone()], &ScoreKeyPath::default())
                .unwrap();
        assert_eq!(selected, only);
    }

    #[test]
    fn even_batch_takes_lower_median() {
        assert_eq!(pick(&[20.0, 10.0]), 10.0);
        assert_eq!(pick(&[4.0, 1.0, 3.0, 2.0]), 2.0);
    }

    #[test]
    fn odd_batch_takes_middle() {
        assert_eq!(pick(&[5.0, 1.0, 4.0, 2.0, 3.0]), 3.0);
    }

    #[test]
    fn sorts_numerically_not_lexically() {
        // "9" > "10" as strings
        assert_eq!(pick(&[9.0, 10.0, 100.0]), 10.0);
    }

    #[test]
    fn rank_matches_lower_median_for_distinct_keys() {
        for len in 1..=9usize {
            let scores: Vec<f64> = (0..len).rev().map(|v| v as f64 * 1.5).collect();
            let mut sorted = scores.clone();
            sorted.sort_by(f64::total_cmp);
            assert_eq!(pick(&scores), sorted[(len - 1) / 2], "len {len}");
        }
    }

    #[test]
    fn ties_keep_run_order() {
        let records = vec![record(7.0, "first"), record(7.0, "second"), record(7.0, "third")];
        let selected =
            select_representative("Speedometer2", records, &ScoreKeyPath::default()).unwrap();
        assert_eq!(selected.date(), Some(&json!("second")));
    }

    #[test]
    fn empty_batch_is_an_error() {
        let err = select_representative("Speedometer2", Vec::new(), &ScoreKeyPath::default())
            .unwrap_err();
        assert!(matches!(err, BenchError::EmptyRuns { .. }));
    }

    #[test]
    fn unparsable_key_fails_loudly() {
        let records = vec![
            record(3.0, "a"),
            ScoreRecord::new(json!({"scores": {"Total Score": "crashed"}})),
            record(1.0, "c"),
        ];
        let err =
            select_representative("WebXPRT3", records, &ScoreKeyPath::default()).unwrap_err();
        match err {
            BenchError::InvalidScore { run, ref key, .. } => {
                assert_eq!(run, 2);
                assert_eq!(key, "scores.Total Score");
                assert_eq!(
                    err.to_string(),
                    "run 2 of workload 'WebXPRT3' has no numeric value at 'scores.Total Score'"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn median_index_rule() {
        assert_eq!(median_index(0), None);
        assert_eq!(median_index(1), Some(0));
        assert_eq!(median_index(2), Some(0));
        assert_eq!(median_index(5), Some(2));
        assert_eq!(median_index(6), Some(2));
    }
}

//! Reward lookup table and the deep merge that layers caller overrides on top
//! of the built-in defaults.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::types::LogCounts;

/// Built-in table. Keys mirror the wire form accepted in config files.
pub fn default_table() -> Value {
    json!({
        "LOGS": { "SEVERE": 100, "WARNING": 10, "INFO": 0 },
        "ACTIONS": { "FAIL": -100 },
    })
}

/// Merge `overrides` onto `defaults`. Override values always win; where both
/// sides hold an object the merge recurses so only missing keys are filled.
pub fn deep_merge(defaults: &Value, overrides: &Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(base), Value::Object(over)) => {
            let mut merged = base.clone();
            for (key, value) in over {
                let entry = match base.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), entry);
            }
            Value::Object(merged)
        }
        (_, over) => over.clone(),
    }
}

/// Which log count the INFO weight is multiplied by.
///
/// Legacy scoring multiplied the INFO weight by the WARNING count.
/// `WarningCount` keeps that available for comparison runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InfoWeighting {
    #[default]
    InfoCount,
    WarningCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct LogWeights {
    pub severe: i64,
    pub warning: i64,
    pub info: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ActionWeights {
    pub fail: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTable {
    #[serde(rename = "LOGS")]
    pub logs: LogWeights,
    #[serde(rename = "ACTIONS")]
    pub actions: ActionWeights,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            logs: LogWeights {
                severe: 100,
                warning: 10,
                info: 0,
            },
            actions: ActionWeights { fail: -100 },
        }
    }
}

impl RewardTable {
    /// Build a table from caller overrides. `null` means no overrides.
    pub fn from_overrides(overrides: &Value) -> Result<Self, serde_json::Error> {
        let empty = Value::Object(Map::new());
        let overrides = if overrides.is_null() { &empty } else { overrides };
        serde_json::from_value(deep_merge(&default_table(), overrides))
    }

    pub fn click_failure(&self) -> i64 {
        self.actions.fail
    }

    pub fn score_logs(&self, counts: &LogCounts, weighting: InfoWeighting) -> i64 {
        let info_count = match weighting {
            InfoWeighting::InfoCount => counts.info,
            InfoWeighting::WarningCount => counts.warning,
        };
        to_signed(counts.severe)
            .saturating_mul(self.logs.severe)
            .saturating_add(to_signed(counts.warning).saturating_mul(self.logs.warning))
            .saturating_add(to_signed(info_count).saturating_mul(self.logs.info))
    }
}

fn to_signed(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(severe: u64, warning: u64, info: u64) -> LogCounts {
        LogCounts {
            severe,
            warning,
            info,
        }
    }

    #[test]
    fn defaults_match_builtin_table() {
        let table = RewardTable::from_overrides(&Value::Null).unwrap();
        assert_eq!(table, RewardTable::default());
    }

    #[test]
    fn override_wins_and_siblings_are_filled() {
        let table = RewardTable::from_overrides(&json!({ "LOGS": { "SEVERE": 5 } })).unwrap();
        assert_eq!(table.logs.severe, 5);
        assert_eq!(table.logs.warning, 10);
        assert_eq!(table.logs.info, 0);
        assert_eq!(table.actions.fail, -100);
    }

    #[test]
    fn deep_merge_keeps_unknown_override_keys() {
        let merged = deep_merge(
            &json!({ "a": { "b": 1, "c": 2 } }),
            &json!({ "a": { "c": 3 }, "d": { "e": 4 } }),
        );
        assert_eq!(merged, json!({ "a": { "b": 1, "c": 3 }, "d": { "e": 4 } }));
    }

    #[test]
    fn scalar_override_replaces_whole_branch() {
        let merged = deep_merge(&json!({ "a": { "b": 1 } }), &json!({ "a": 7 }));
        assert_eq!(merged, json!({ "a": 7 }));
    }

    #[test]
    fn malformed_override_is_rejected() {
        let err = RewardTable::from_overrides(&json!({ "ACTIONS": { "FAIL": "lots" } }));
        assert!(err.is_err());
    }

    #[test]
    fn log_score_weights_each_severity() {
        let table = RewardTable::from_overrides(&json!({ "LOGS": { "INFO": 1 } })).unwrap();
        let score = table.score_logs(&counts(2, 3, 4), InfoWeighting::InfoCount);
        assert_eq!(score, 2 * 100 + 3 * 10 + 4);
    }

    #[test]
    fn warning_count_weighting_reuses_warning_count_for_info() {
        let table = RewardTable::from_overrides(&json!({ "LOGS": { "INFO": 1 } })).unwrap();
        let score = table.score_logs(&counts(0, 3, 4), InfoWeighting::WarningCount);
        assert_eq!(score, 3 * 10 + 3);
    }

    #[test]
    fn extreme_weights_saturate_instead_of_overflowing() {
        let table = RewardTable::from_overrides(&json!({
            "LOGS": { "SEVERE": i64::MAX, "WARNING": i64::MIN }
        }))
        .unwrap();
        assert_eq!(
            table.score_logs(&counts(2, 0, 0), InfoWeighting::InfoCount),
            i64::MAX
        );
        assert_eq!(
            table.score_logs(&counts(0, 3, 0), InfoWeighting::InfoCount),
            i64::MIN
        );
        assert_eq!(
            table.score_logs(&counts(u64::MAX, 0, 0), InfoWeighting::InfoCount),
            i64::MAX
        );
    }

    #[test]
    fn no_logs_scores_zero() {
        let table = RewardTable::default();
        assert_eq!(table.score_logs(&LogCounts::default(), InfoWeighting::InfoCount), 0);
    }
}

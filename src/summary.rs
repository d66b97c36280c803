use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::aggregator::Aggregation;
use crate::datetime::DateRange;
use crate::duration::DurationParts;
use crate::error::ReportError;

/// 保存したJSONに必要なキー。
pub const JSON_REQUIRED_KEYS: [&str; 5] = ["from_date", "to_date", "days", "tasks", "total_duration"];

/// レポートに出力する集計結果。
///
/// JSONから読み込む時は、キーの値の型が合わなければ既定値とする。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(deserialize_with = "lenient")]
    pub from_date: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub to_date: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub days: Vec<DaySummary>,
    #[serde(deserialize_with = "lenient")]
    pub tasks: Vec<TaskSummary>,
    #[serde(deserialize_with = "lenient")]
    pub total_duration: TotalDuration,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySummary {
    #[serde(deserialize_with = "lenient")]
    pub human_date: String,
    #[serde(deserialize_with = "lenient")]
    pub iso_date: String,
    #[serde(deserialize_with = "lenient")]
    pub total_duration_raw: DurationParts,
    #[serde(deserialize_with = "lenient")]
    pub total_duration_human: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSummary {
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub list: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub project: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub folder: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub total_duration_raw: DurationParts,
    #[serde(deserialize_with = "lenient")]
    pub total_duration_human: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalDuration {
    #[serde(deserialize_with = "whole_number")]
    pub hours: u64,
    #[serde(deserialize_with = "whole_number")]
    pub minutes: u64,
    #[serde(deserialize_with = "lenient")]
    pub seconds: f64,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub hours_as_float: Option<f64>,
}

impl TotalDuration {
    fn from_seconds(total_seconds: f64) -> Self {
        let parts = DurationParts::from_seconds(total_seconds);
        Self {
            hours: parts.hours,
            minutes: parts.minutes,
            seconds: parts.seconds,
            hours_as_float: Some(parts.hours_as_float()),
        }
    }

    /// `1h12m19s`形式の文字列。
    pub fn human(&self) -> String {
        DurationParts {
            hours: self.hours,
            minutes: self.minutes,
            seconds: self.seconds,
        }
        .human()
    }
}

/// `1`でも`1.0`でも受け付ける。数値以外は0とする。
fn whole_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().map_or(0, |value| value.max(0.0) as u64))
}

/// 型が合わない値は既定値として読み込む。
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl Summary {
    /// 集計結果から`Summary`を作成する。
    ///
    /// 日毎の集計は日付順、タスクは最初に現れた順に並べる。
    /// 総計はタスクの集計値の合計から求める。
    pub fn from_aggregation(aggregation: &Aggregation, range: &DateRange) -> Self {
        let days = aggregation
            .days()
            .map(|day| {
                let parts = DurationParts::from_seconds(day.total_seconds);
                DaySummary {
                    human_date: day.human_date.clone(),
                    iso_date: day.date.format("%Y-%m-%d").to_string(),
                    total_duration_raw: parts,
                    total_duration_human: parts.human(),
                }
            })
            .collect();
        let tasks = aggregation
            .tasks()
            .iter()
            .map(|total| {
                let parts = DurationParts::from_seconds(total.total_seconds);
                TaskSummary {
                    name: total.task.name.clone(),
                    list: total.task.list.clone(),
                    project: total.task.project.clone(),
                    folder: total.task.folder.clone(),
                    total_duration_raw: parts,
                    total_duration_human: parts.human(),
                }
            })
            .collect();

        Self {
            from_date: Some(range.from_date.format("%Y-%m-%d").to_string()),
            to_date: Some(range.to_date.format("%Y-%m-%d").to_string()),
            days,
            tasks,
            total_duration: TotalDuration::from_seconds(aggregation.total_seconds()),
        }
    }

    /// 保存したJSONを読み込む。
    ///
    /// 必要なキーが揃っているかのみ確認し、それ以上の検証は行わない。
    pub fn load_json(path: &Path) -> Result<Self> {
        info!("Using {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_json_str(&content)
            .with_context(|| format!("Invalid summary JSON in {}", path.display()))
    }

    fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).context("Failed to parse JSON")?;
        let missing: Vec<&str> = JSON_REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| value.get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ReportError::MissingJsonKeys(missing.join(", ")).into());
        }

        serde_json::from_value(value).context("Failed to deserialize summary")
    }

    /// 2スペースでインデントしたJSONとして書き出す。
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize summary")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());

        Ok(())
    }
}

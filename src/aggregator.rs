use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use log::{debug, info, warn};

use crate::clickup::ClickUpRepository;
use crate::i18n::Language;
use crate::task_cache::TaskCache;
use crate::time_entry::{TaskMetadata, TimeEntry};

/// タスクごとの集計値。
#[derive(Clone, Debug, PartialEq)]
pub struct TaskTotal {
    pub task: TaskMetadata,
    pub total_seconds: f64,
}

/// 日毎の集計値。
#[derive(Clone, Debug, PartialEq)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub human_date: String,
    pub total_seconds: f64,
}

/// タイムエントリーをタスクごと、日毎に集計する。
#[derive(Debug)]
pub struct Aggregation {
    time_zone: Tz,
    language: Language,
    tasks: Vec<TaskTotal>,
    task_index: HashMap<String, usize>,
    days: BTreeMap<NaiveDate, DayTotal>,
}

impl Aggregation {
    /// 空の`Aggregation`を返す。
    ///
    /// # Arguments
    ///
    /// * `time_zone` - 日付を決めるタイムゾーン
    /// * `language` - 日付の表示言語
    pub fn new(time_zone: Tz, language: Language) -> Self {
        Self {
            time_zone,
            language,
            tasks: Vec::new(),
            task_index: HashMap::new(),
            days: BTreeMap::new(),
        }
    }

    /// タイムエントリーの経過時間をタスクと日付に加算する。
    ///
    /// タスク、日付ともに初めて現れた時に作成する。
    pub fn add(&mut self, entry: &TimeEntry, task: &TaskMetadata) {
        let duration = entry.duration_seconds();

        let index = match self.task_index.get(&task.id) {
            Some(index) => *index,
            None => {
                self.tasks.push(TaskTotal {
                    task: task.clone(),
                    total_seconds: 0.0,
                });
                self.task_index.insert(task.id.clone(), self.tasks.len() - 1);
                self.tasks.len() - 1
            }
        };
        self.tasks[index].total_seconds += duration;

        let date = entry.start.with_timezone(&self.time_zone).date_naive();
        let language = self.language;
        self.days
            .entry(date)
            .or_insert_with(|| DayTotal {
                date,
                human_date: language.full_date(date),
                total_seconds: 0.0,
            })
            .total_seconds += duration;
    }

    /// 最初に現れた順のタスクの集計値。
    pub fn tasks(&self) -> &[TaskTotal] {
        &self.tasks
    }

    /// 日付順の日毎の集計値。
    pub fn days(&self) -> impl Iterator<Item = &DayTotal> {
        self.days.values()
    }

    /// タスクの集計値の合計。
    pub fn total_seconds(&self) -> f64 {
        self.tasks.iter().map(|task| task.total_seconds).sum()
    }
}

/// タイムエントリーを集計する。
///
/// タスクの情報は`cache`から取得し、未取得のものだけAPIに問い合わせる。
/// 終了していないタイムエントリーは集計対象外とする。
///
/// # Arguments
///
/// * `client` - タスクを取得するリポジトリ
/// * `cache` - タスクのキャッシュ
/// * `entries` - 集計するタイムエントリー
/// * `time_zone` - 日付を決めるタイムゾーン
/// * `language` - 日付の表示言語
pub async fn aggregate<R: ClickUpRepository>(
    client: &R,
    cache: &mut TaskCache,
    entries: &[TimeEntry],
    time_zone: Tz,
    language: Language,
) -> Result<Aggregation> {
    let mut aggregation = Aggregation::new(time_zone, language);
    let untracked = TaskMetadata::untracked();

    for entry in entries {
        if !entry.is_finished() {
            warn!("Skipping running time entry {}", entry.id);
            continue;
        }
        match &entry.task_id {
            Some(task_id) => {
                let task = cache.get_or_fetch(client, task_id).await?;
                aggregation.add(entry, task);
            }
            None => aggregation.add(entry, &untracked),
        }
    }
    info!(
        "Aggregated {} time entries into {} tasks ({} fetched)",
        entries.len(),
        aggregation.tasks().len(),
        cache.len()
    );
    debug!("Fetched tasks: {:?}", cache.task_ids());

    Ok(aggregation)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::Europe::Paris;
    use chrono_tz::Tz;

    use super::{aggregate, Aggregation};
    use crate::clickup::MockClickUpRepository;
    use crate::i18n::Language;
    use crate::task_cache::TaskCache;
    use crate::time_entry::{TaskMetadata, TimeEntry};

    fn entry(id: &str, task_id: Option<&str>, start_ms: i64, duration_ms: i64) -> TimeEntry {
        TimeEntry {
            id: id.to_string(),
            task_id: task_id.map(str::to_string),
            start: Utc.timestamp_millis_opt(start_ms).unwrap(),
            duration_ms,
        }
    }

    fn paris_ms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        Paris
            .with_ymd_and_hms(y, m, d, h, mi, s)
            .unwrap()
            .timestamp_millis()
    }

    fn mock_client() -> MockClickUpRepository {
        let mut client = MockClickUpRepository::new();
        client.expect_read_task().returning(|id| {
            Ok(TaskMetadata {
                id: id.to_string(),
                name: format!("task {}", id),
                list: Some("List".to_string()),
                project: None,
                folder: None,
            })
        });
        client
    }

    async fn run(entries: &[TimeEntry], time_zone: Tz) -> Aggregation {
        let client = mock_client();
        let mut cache = TaskCache::new();
        aggregate(&client, &mut cache, entries, time_zone, Language::English)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_entry() {
        let entries = [entry("1", Some("T1"), 1592841559129, 4339892)];

        let aggregation = run(&entries, Paris).await;

        assert_eq!(aggregation.tasks().len(), 1);
        assert_eq!(aggregation.tasks()[0].task.id, "T1");
        assert!((aggregation.tasks()[0].total_seconds - 4339.892).abs() < 1e-9);
        let days: Vec<_> = aggregation.days().collect();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].human_date, "Monday, June 22, 2020");
        assert_eq!(days[0].total_seconds, aggregation.tasks()[0].total_seconds);
        assert_eq!(aggregation.total_seconds(), days[0].total_seconds);
    }

    /// 日付の境界はタイムゾーン上で判定する。
    #[tokio::test]
    async fn test_day_boundary_in_time_zone() {
        let entries = [
            entry("1", Some("T1"), paris_ms(2023, 1, 1, 23, 59, 59), 60_000),
            entry("2", Some("T1"), paris_ms(2023, 1, 2, 0, 0, 1), 60_000),
        ];

        let aggregation = run(&entries, Paris).await;

        let dates: Vec<_> = aggregation.days().map(|day| day.date.to_string()).collect();
        assert_eq!(dates, ["2023-01-01", "2023-01-02"]);
        assert_eq!(aggregation.tasks().len(), 1);
        assert_eq!(aggregation.tasks()[0].total_seconds, 120.0);
    }

    /// タスクの合計、日毎の合計、総計が一致する。
    #[tokio::test]
    async fn test_totals_agree() {
        let entries = [
            entry("1", Some("T2"), paris_ms(2023, 1, 3, 9, 0, 0), 3_600_000),
            entry("2", Some("T1"), paris_ms(2023, 1, 1, 10, 0, 0), 1_800_000),
            entry("3", None, paris_ms(2023, 1, 2, 11, 0, 0), 45_000),
            entry("4", Some("T2"), paris_ms(2023, 1, 1, 14, 0, 0), 7_000),
            entry("5", Some("T3"), paris_ms(2023, 1, 3, 18, 0, 0), 123_000),
        ];

        let aggregation = run(&entries, Paris).await;

        let task_sum: f64 = aggregation.tasks().iter().map(|t| t.total_seconds).sum();
        let day_sum: f64 = aggregation.days().map(|d| d.total_seconds).sum();
        assert_eq!(task_sum, day_sum);
        assert_eq!(task_sum, aggregation.total_seconds());
        assert_eq!(task_sum, 5575.0);

        let ids: Vec<_> = aggregation
            .tasks()
            .iter()
            .map(|t| t.task.id.as_str())
            .collect();
        assert_eq!(ids, ["T2", "T1", "", "T3"]);
        assert_eq!(aggregation.tasks()[2].task.name, "(no task)");

        let dates: Vec<_> = aggregation.days().map(|day| day.date.to_string()).collect();
        assert_eq!(dates, ["2023-01-01", "2023-01-02", "2023-01-03"]);
    }

    #[tokio::test]
    async fn test_running_entries_are_skipped() {
        let entries = [
            entry("1", Some("T1"), paris_ms(2023, 1, 1, 10, 0, 0), 60_000),
            entry("2", Some("T2"), paris_ms(2023, 1, 2, 10, 0, 0), -1_672_650_000_000),
        ];

        let aggregation = run(&entries, Paris).await;

        assert_eq!(aggregation.tasks().len(), 1);
        assert_eq!(aggregation.days().count(), 1);
        assert_eq!(aggregation.total_seconds(), 60.0);
    }

    /// 同じエントリーを新しい状態で集計すると同じ結果になる。
    #[tokio::test]
    async fn test_aggregation_is_deterministic() {
        let entries = [
            entry("1", Some("T1"), paris_ms(2023, 1, 1, 10, 0, 0), 60_000),
            entry("2", Some("T2"), paris_ms(2023, 1, 5, 10, 0, 0), 90_500),
        ];

        let first = run(&entries, Paris).await;
        let second = run(&entries, Paris).await;

        assert_eq!(first.tasks(), second.tasks());
        assert!(first.days().eq(second.days()));
    }

    #[tokio::test]
    async fn test_task_error_aborts() {
        let mut client = MockClickUpRepository::new();
        client
            .expect_read_task()
            .returning(|_| Err(anyhow::anyhow!("unauthorized")));
        let mut cache = TaskCache::new();
        let entries = [entry("1", Some("T1"), 1592841559129, 1000)];

        let result = aggregate(&client, &mut cache, &entries, Paris, Language::English).await;

        assert!(result.is_err());
    }
}

use chrono::{DateTime, Utc};

/// ClickUpのタイムエントリー。
#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntry {
    pub id: String,
    /// タスクに紐づかないエントリーは`None`。
    pub task_id: Option<String>,
    pub start: DateTime<Utc>,
    /// 実行中のタイマーは負の値になる。
    pub duration_ms: i64,
}

impl TimeEntry {
    /// 経過時間を秒で返す。
    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// タイマーが停止済みかどうか。
    pub fn is_finished(&self) -> bool {
        self.duration_ms >= 0
    }
}

/// タスクのメタデータ。
///
/// list, project, folderはAPIのレスポンスに含まれない場合がある。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskMetadata {
    pub id: String,
    pub name: String,
    pub list: Option<String>,
    pub project: Option<String>,
    pub folder: Option<String>,
}

impl TaskMetadata {
    /// タスクに紐づかないエントリーを集計するためのタスク。
    pub fn untracked() -> Self {
        Self {
            name: "(no task)".to_string(),
            ..Default::default()
        }
    }
}

/// ClickUpのチーム(ワークスペース)。
#[derive(Clone, Debug, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
}

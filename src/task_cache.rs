use std::collections::HashMap;

use anyhow::{Context, Result};
use log::debug;

use crate::clickup::ClickUpRepository;
use crate::time_entry::TaskMetadata;

/// 取得済みのタスクを保持するキャッシュ。
///
/// 1回の実行の間だけ利用し、削除は行わない。
#[derive(Debug, Default)]
pub struct TaskCache {
    tasks: HashMap<String, TaskMetadata>,
    order: Vec<String>,
}

impl TaskCache {
    /// 空の`TaskCache`を返す。
    pub fn new() -> Self {
        Self::default()
    }

    /// キャッシュ済みのタスクを返す。未取得の場合はAPIから取得して保持する。
    ///
    /// # Arguments
    ///
    /// * `client` - タスクを取得するリポジトリ
    /// * `task_id` - 取得するタスク
    pub async fn get_or_fetch<R: ClickUpRepository>(
        &mut self,
        client: &R,
        task_id: &str,
    ) -> Result<&TaskMetadata> {
        if !self.tasks.contains_key(task_id) {
            let task = client
                .read_task(task_id)
                .await
                .with_context(|| format!("Failed to retrieve task {}", task_id))?;
            self.order.push(task_id.to_string());
            self.tasks.insert(task_id.to_string(), task);
        } else {
            debug!("Task {} found in cache", task_id);
        }

        self.tasks
            .get(task_id)
            .with_context(|| format!("Task {} missing from cache", task_id))
    }

    /// 最初に取得した順でタスクIDを返す。
    pub fn task_ids(&self) -> &[String] {
        &self.order
    }

    /// 取得済みのタスク数。
    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

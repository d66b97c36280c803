use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ReportError;
use crate::time_entry::{TaskMetadata, Team, TimeEntry};

/// ClickUp REST APIのベースURL。
pub const DEFAULT_API_URL: &str = "https://api.clickup.com/api/v2";

/// ClickUp APIからデータを取得するためのtrait。
#[cfg_attr(test, mockall::automock)]
pub trait ClickUpRepository {
    /// トークンが所属するチームを取得する。
    async fn read_teams(&self) -> Result<Vec<Team>>;

    /// 指定された期間のタイムエントリーを取得する。
    ///
    /// # Arguments
    ///
    /// * `team_id` - タイムエントリーを取得するチーム
    /// * `start_at` - 取得するタイムエントリーの開始日時
    /// * `end_at` - 取得するタイムエントリーの終了日時
    async fn read_time_entries(
        &self,
        team_id: &str,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>>;

    /// タスクのメタデータを取得する。
    async fn read_task(&self, task_id: &str) -> Result<TaskMetadata>;
}

#[derive(Debug, Deserialize)]
struct ClickUpTeams {
    teams: Vec<ClickUpTeam>,
}

#[derive(Debug, Deserialize)]
struct ClickUpTeam {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ClickUpTimeEntries {
    #[serde(default)]
    data: Vec<ClickUpTimeEntry>,
}

/// ClickUp APIのタイムエントリーをデシリアライズするための構造体。
///
/// `start`と`duration`は文字列で返されることも数値で返されることもある。
#[derive(Debug, Deserialize)]
struct ClickUpTimeEntry {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    task: Option<ClickUpTaskRef>,
    #[serde(deserialize_with = "millis")]
    start: i64,
    #[serde(deserialize_with = "millis")]
    duration: i64,
}

#[derive(Debug, Deserialize)]
struct ClickUpTaskRef {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClickUpTask {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    list: Option<ClickUpLocation>,
    #[serde(default)]
    project: Option<ClickUpLocation>,
    #[serde(default)]
    folder: Option<ClickUpLocation>,
}

#[derive(Debug, Deserialize)]
struct ClickUpLocation {
    #[serde(default)]
    name: Option<String>,
}

impl From<ClickUpTask> for TaskMetadata {
    fn from(task: ClickUpTask) -> Self {
        Self {
            id: task.id,
            name: task.name,
            list: task.list.and_then(|list| list.name),
            project: task.project.and_then(|project| project.name),
            folder: task.folder.and_then(|folder| folder.name),
        }
    }
}

impl TryFrom<ClickUpTimeEntry> for TimeEntry {
    type Error = anyhow::Error;

    fn try_from(entry: ClickUpTimeEntry) -> Result<Self> {
        let start = Utc
            .timestamp_millis_opt(entry.start)
            .single()
            .with_context(|| format!("Invalid start timestamp: {}", entry.start))?;

        Ok(Self {
            id: entry.id,
            task_id: entry.task.and_then(|task| task.id),
            start,
            duration_ms: entry.duration,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(value) => value,
        StringOrNumber::Integer(value) => value.to_string(),
        StringOrNumber::Float(value) => value.to_string(),
    })
}

fn millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(value) => value.trim().parse().map_err(serde::de::Error::custom),
        StringOrNumber::Integer(value) => Ok(value),
        StringOrNumber::Float(value) => Ok(value as i64),
    }
}

/// ClickUp APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = ClickUpClient::new("pk_xxx");
/// let teams = client.read_teams().await.unwrap();
/// ```
pub struct ClickUpClient {
    client: Client,
    api_url: String,
    api_token: String,
}

impl ClickUpClient {
    /// 新しい`ClickUpClient`を返す。
    pub fn new(api_token: impl Into<String>) -> Self {
        Self::with_api_url(api_token, DEFAULT_API_URL)
    }

    /// 接続先を指定して`ClickUpClient`を返す。
    pub fn with_api_url(api_token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    /// GETリクエストを送り、レスポンスをデシリアライズする。
    ///
    /// 認証エラーは`ReportError::Unauthorized`、それ以外の失敗ステータスはエラーとして返す。
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.api_url, path))
            .header(AUTHORIZATION, self.api_token.as_str())
            .header(CONTENT_TYPE, "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to ClickUp API at {}", self.api_url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body ({})", context))?;

        check_authorization(status, &body, context)?;
        if !status.is_success() {
            bail!("ClickUp API returned {} ({})", status, context);
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to deserialize response ({})", context))
    }
}

impl ClickUpRepository for ClickUpClient {
    async fn read_teams(&self) -> Result<Vec<Team>> {
        let teams: ClickUpTeams = self.get("/team", &[], "user team retrieval").await?;

        Ok(teams
            .teams
            .into_iter()
            .map(|team| Team {
                id: team.id,
                name: team.name,
            })
            .collect())
    }

    async fn read_time_entries(
        &self,
        team_id: &str,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>> {
        let entries: ClickUpTimeEntries = self
            .get(
                &format!("/team/{}/time_entries", team_id),
                &[
                    ("start_date", start_at.timestamp_millis().to_string()),
                    ("end_date", end_at.timestamp_millis().to_string()),
                ],
                "user time entries retrieval",
            )
            .await?;
        info!("length of time entries: {}", entries.data.len());

        entries.data.into_iter().map(TimeEntry::try_from).collect()
    }

    async fn read_task(&self, task_id: &str) -> Result<TaskMetadata> {
        debug!("Fetching task {}", task_id);
        let task: ClickUpTask = self
            .get(
                &format!("/task/{}", task_id),
                &[("include_subtasks", "true".to_string())],
                &format!("task properties retrieval (task_id: {})", task_id),
            )
            .await?;

        Ok(task.into())
    }
}

/// 認証エラーを表すレスポンスかどうかを判定する。
///
/// ステータスコードが401, 403の場合に加えて、`ECODE`が`OAUTH`で始まる場合や
/// `err`に`authorization`を含む場合も認証エラーとする。
fn check_authorization(status: StatusCode, body: &str, context: &str) -> Result<()> {
    let payload: Option<Value> = serde_json::from_str(body).ok();
    let field = |key: &str| {
        payload
            .as_ref()
            .and_then(|payload| payload.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let oauth_code = field("ECODE").is_some_and(|code| code.starts_with("OAUTH"));
    let authorization_error =
        field("err").is_some_and(|err| err.to_lowercase().contains("authorization"));

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || oauth_code
        || authorization_error
    {
        return Err(ReportError::Unauthorized {
            context: context.to_string(),
        }
        .into());
    }

    Ok(())
}

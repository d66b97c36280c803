use anyhow::{Context, Result};
use log::{debug, info};

use crate::clickup::ClickUpRepository;
use crate::error::ReportError;

/// APIトークンを設定する環境変数。
pub const TOKEN_ENV: &str = "CLICKUP_PK";
/// チームIDを設定する環境変数。
pub const TEAM_ID_ENV: &str = "CLICKUP_TEAM_ID";

/// 引数、環境変数の順にAPIトークンを決める。
///
/// # Arguments
///
/// * `explicit` - コマンドラインで指定されたトークン
/// * `env` - 環境変数を参照する関数
pub fn resolve_token(explicit: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Result<String> {
    explicit
        .map(str::to_string)
        .or_else(|| env(TOKEN_ENV))
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| ReportError::MissingToken.into())
}

/// 引数、環境変数、トークンが所属するチームの順にチームIDを決める。
///
/// チームの候補が無い場合と複数ある場合はエラーとする。
pub async fn resolve_team_id<R: ClickUpRepository>(
    client: &R,
    explicit: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    if let Some(team_id) = explicit {
        return Ok(team_id.to_string());
    }
    if let Some(team_id) = env(TEAM_ID_ENV).filter(|id| !id.trim().is_empty()) {
        debug!("Using {} from environment.", TEAM_ID_ENV);
        return Ok(team_id);
    }

    let teams = client
        .read_teams()
        .await
        .context("Failed to retrieve user teams")?;
    match teams.as_slice() {
        [] => Err(ReportError::NoTeam.into()),
        [team] => {
            info!("Guessing team_id as user's only team: {} ({}).", team.name, team.id);
            Ok(team.id.clone())
        }
        teams => {
            let overview = teams
                .iter()
                .map(|team| format!("{} ({})", team.id, team.name))
                .collect::<Vec<_>>()
                .join(", ");
            Err(ReportError::AmbiguousTeam(overview).into())
        }
    }
}

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// レポート作成を中断する致命的なエラー。
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Missing ClickUp API token (pk_* value): set CLICKUP_PK in the environment or .env, or pass --clickup-token")]
    MissingToken,

    #[error("No ClickUp team given (--clickup-team-id or CLICKUP_TEAM_ID) and the token has no team")]
    NoTeam,

    #[error("No ClickUp team given (--clickup-team-id or CLICKUP_TEAM_ID) and the token has several teams to choose from: {0}")]
    AmbiguousTeam(String),

    #[error("Unauthenticated by ClickUp, is the token valid? (context: {context})")]
    Unauthorized { context: String },

    #[error("Input JSON file is missing keys: {0}")]
    MissingJsonKeys(String),

    #[error("Company logo file does not exist: {0}")]
    LogoNotFound(PathBuf),

    #[error("PDF output requires the `{0}` command to be installed")]
    PdfEngineMissing(String),

    #[error("From date {from} is after to date {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },
}

use std::env;

use anyhow::Result;
use clap::Parser;

mod aggregator;
mod clickup;
mod config;
mod console;
mod datetime;
mod duration;
mod error;
mod html;
mod i18n;
mod logging;
mod pdf;
mod report_command;
mod summary;
mod task_cache;
mod time_entry;

use report_command::{report_command, ReportArgs};

/// ClickUpのタイムエントリーを日毎、タスクごとに集計するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- --from-date 2023-01-01 --to-date 2023-01-31 --as-html
/// $ cargo run -- --from-json time-entries.json --as-pdf
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(flatten)]
    report: ReportArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    logging::setup_logger(args.report.log_level())?;

    report_command(args.report, |key| env::var(key).ok()).await
}

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use log::{info, LevelFilter};

use crate::aggregator::aggregate;
use crate::clickup::{ClickUpClient, ClickUpRepository};
use crate::config::{resolve_team_id, resolve_token};
use crate::console::{ConsolePresenter, ConsoleTimeSheet};
use crate::datetime::{self, parse_date, parse_time_zone, DateRange};
use crate::html::{render_html, write_html, ReportOptions};
use crate::i18n::Language;
use crate::logging::level_from_flags;
use crate::pdf::write_pdf;
use crate::summary::Summary;
use crate::task_cache::TaskCache;

/// レポート作成の引数。
#[derive(Debug, clap::Args)]
pub struct ReportArgs {
    #[clap(
        long = "from-date",
        help = "First day of the report in the format YYYY-MM-DD [default: 12 months before --to-date]",
        parse(try_from_str = parse_date),
    )]
    pub from_date: Option<NaiveDate>,

    #[clap(
        long = "to-date",
        help = "Last day of the report in the format YYYY-MM-DD [default: now]",
        parse(try_from_str = parse_date),
    )]
    pub to_date: Option<NaiveDate>,

    #[clap(long = "clickup-token", help = "ClickUp API token (pk_*), overrides CLICKUP_PK")]
    pub clickup_token: Option<String>,

    #[clap(long = "clickup-team-id", help = "ClickUp team id, overrides CLICKUP_TEAM_ID")]
    pub clickup_team_id: Option<String>,

    #[clap(
        long = "time-zone",
        help = "Time zone used to bucket entries by day",
        default_value = "Europe/Paris",
        parse(try_from_str = parse_time_zone),
    )]
    pub time_zone: Tz,

    #[clap(long, help = "Report language (en_US, fr_FR)", default_value = "en_US")]
    pub language: Language,

    #[clap(
        long = "from-json",
        help = "Build the report from a JSON file written by --as-json instead of the API",
        parse(from_os_str)
    )]
    pub from_json: Option<PathBuf>,

    #[clap(long = "as-json", help = "Write the report as JSON")]
    pub as_json: bool,

    #[clap(long = "json-output-path", default_value = "time-entries.json", parse(from_os_str))]
    pub json_output_path: PathBuf,

    #[clap(long = "as-html", help = "Write the report as HTML")]
    pub as_html: bool,

    #[clap(long = "html-output-path", default_value = "time-entries.html", parse(from_os_str))]
    pub html_output_path: PathBuf,

    #[clap(long = "as-pdf", help = "Write the report as PDF")]
    pub as_pdf: bool,

    #[clap(long = "pdf-output-path", default_value = "time-entries.pdf", parse(from_os_str))]
    pub pdf_output_path: PathBuf,

    #[clap(
        long = "pdf-engine",
        help = "HTML to PDF command, called as `<engine> - <output>`",
        default_value = crate::pdf::DEFAULT_PDF_ENGINE,
    )]
    pub pdf_engine: String,

    #[clap(long = "output-title", default_value = "Time entries")]
    pub output_title: String,

    #[clap(long = "company-logo-img-path", parse(from_os_str))]
    pub company_logo_img_path: Option<PathBuf>,

    #[clap(long = "customer-name")]
    pub customer_name: Option<String>,

    #[clap(long = "consultant-name")]
    pub consultant_name: Option<String>,

    #[clap(long = "customer-signature-field")]
    pub customer_signature_field: bool,

    #[clap(long = "consultant-signature-field")]
    pub consultant_signature_field: bool,

    #[clap(long = "total-hours-as-float", help = "Also show the total as decimal hours")]
    pub total_hours_as_float: bool,

    #[clap(long = "clickup-mention", help = "Mention ClickUp as the data source")]
    pub clickup_mention: bool,

    #[clap(long = "no-pagination-footer", help = "Hide page numbers in the PDF footer")]
    pub no_pagination_footer: bool,

    #[clap(short, long, help = "Show debug logs")]
    pub verbose: bool,

    #[clap(short, long, help = "Only show warnings and errors, skip the console report")]
    pub quiet: bool,
}

impl ReportArgs {
    /// HTML, PDFの見た目に関する設定。
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            title: self.output_title.clone(),
            language: self.language,
            company_logo: self.company_logo_img_path.clone(),
            customer_name: self.customer_name.clone(),
            consultant_name: self.consultant_name.clone(),
            customer_signature_field: self.customer_signature_field,
            consultant_signature_field: self.consultant_signature_field,
            total_hours_as_float: self.total_hours_as_float,
            clickup_mention: self.clickup_mention,
            pagination_footer: !self.no_pagination_footer,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        level_from_flags(self.verbose, self.quiet)
    }
}

/// APIからタイムエントリーを取得して集計する。
pub struct ReportCommand<'a, T: ClickUpRepository> {
    clickup_client: &'a T,
}

impl<'a, T: ClickUpRepository> ReportCommand<'a, T> {
    /// 新しい`ReportCommand`を返す。
    ///
    /// # Arguments
    /// * `clickup_client` - ClickUp APIと通信するためのリポジトリ
    pub fn new(clickup_client: &'a T) -> Self {
        Self { clickup_client }
    }

    /// 指定された期間のタイムエントリーを取得し、集計結果を返す。
    ///
    /// 期間はタイムゾーン上の開始日の00:00:00から終了日の23:59:59までとする。
    /// タイムエントリーは1回のリクエストで全て取得し、タスクは1つにつき1回だけ取得する。
    pub async fn run(
        &self,
        args: &ReportArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Summary> {
        let range = DateRange::resolve(args.from_date, args.to_date, args.time_zone, datetime::now())?;
        let team_id =
            resolve_team_id(self.clickup_client, args.clickup_team_id.as_deref(), env).await?;
        info!(
            "Gathering ClickUp time entries from {} to {}",
            range.start_at.with_timezone(&args.time_zone),
            range.end_at.with_timezone(&args.time_zone)
        );

        let time_entries = self
            .clickup_client
            .read_time_entries(&team_id, &range.start_at, &range.end_at)
            .await
            .context("Failed to retrieve time entries")?;
        info!("Time entries retrieved successfully.");

        let mut cache = TaskCache::new();
        let aggregation = aggregate(
            self.clickup_client,
            &mut cache,
            &time_entries,
            args.time_zone,
            args.language,
        )
        .await?;

        Ok(Summary::from_aggregation(&aggregation, &range))
    }
}

/// レポートを作成し、指定された形式で出力する。
///
/// `--from-json`が指定された場合はAPIを利用せず、保存したJSONから出力する。
/// それ以外ではAPIトークンが無ければ通信する前に終了する。
///
/// # Arguments
///
/// * `args` - レポート作成の引数
/// * `env` - 環境変数を参照する関数
pub async fn report_command(
    args: ReportArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let options = args.report_options();
    options.check_company_logo()?;

    let summary = match &args.from_json {
        Some(path) => Summary::load_json(path)?,
        None => {
            let token = resolve_token(args.clickup_token.as_deref(), &env)?;
            let client = ClickUpClient::new(token);
            ReportCommand::new(&client).run(&args, &env).await?
        }
    };

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    write_outputs(&summary, &args, &options, &mut writer).await
}

/// JSON、コンソール、HTML、PDFの順に出力する。
async fn write_outputs<W: Write>(
    summary: &Summary,
    args: &ReportArgs,
    options: &ReportOptions,
    writer: &mut W,
) -> Result<()> {
    if args.as_json {
        summary.save_json(&args.json_output_path)?;
    }

    if !args.quiet {
        ConsoleTimeSheet::new(writer, options.language, options.total_hours_as_float)
            .show_summary(summary)?;
    }

    if args.as_html {
        write_html(summary, options, &args.html_output_path)?;
    }

    if args.as_pdf {
        let html = render_html(summary, options)?;
        write_pdf(&args.pdf_engine, &html, &args.pdf_output_path).await?;
    }

    Ok(())
}

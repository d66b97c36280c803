use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::info;

use crate::error::ReportError;
use crate::i18n::{Label, Language};
use crate::summary::Summary;

/// HTML, PDFのレポートの見た目に関する設定。
#[derive(Clone, Debug, Default)]
pub struct ReportOptions {
    pub title: String,
    pub language: Language,
    pub company_logo: Option<PathBuf>,
    pub customer_name: Option<String>,
    pub consultant_name: Option<String>,
    pub customer_signature_field: bool,
    pub consultant_signature_field: bool,
    pub total_hours_as_float: bool,
    pub clickup_mention: bool,
    pub pagination_footer: bool,
}

impl ReportOptions {
    /// ロゴのファイルが存在することを確認する。
    pub fn check_company_logo(&self) -> Result<()> {
        match &self.company_logo {
            Some(path) if !path.is_file() => Err(ReportError::LogoNotFound(path.clone()).into()),
            _ => Ok(()),
        }
    }
}

const STYLE: &str = "
body { font-family: sans-serif; font-size: 11pt; color: #222; }
header { display: flex; justify-content: space-between; align-items: center; }
header img { max-height: 80px; }
table { width: 100%; border-collapse: collapse; margin-bottom: 2em; }
th, td { border-bottom: 1px solid #ccc; padding: 4px 8px; text-align: left; }
td.duration, th.duration { text-align: right; }
tr.total td { font-weight: bold; border-top: 2px solid #222; }
.signatures { display: flex; gap: 2em; margin-top: 3em; }
.signature { flex: 1; border: 1px solid #999; height: 8em; padding: 8px; }
.mention { font-size: 8pt; color: #777; }
";

/// 集計結果をHTMLとして描画する。
pub fn render_html(summary: &Summary, options: &ReportOptions) -> Result<String> {
    let language = options.language;
    let label = |label: Label| escape(language.label(label));
    let title = escape(language.title(&options.title));
    let mut html = String::new();

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"{}\">", language.html_lang())?;
    writeln!(html, "<head>\n<meta charset=\"utf-8\">\n<title>{}</title>", title)?;
    writeln!(html, "<style>{}", STYLE)?;
    if options.pagination_footer {
        writeln!(
            html,
            "@page {{ @bottom-right {{ content: \"{} \" counter(page) \" / \" counter(pages); font-size: 8pt; }} }}",
            label(Label::Page)
        )?;
    }
    writeln!(html, "</style>\n</head>\n<body>")?;

    writeln!(html, "<header>")?;
    writeln!(html, "<h1>{}</h1>", title)?;
    if let Some(path) = &options.company_logo {
        writeln!(html, "<img src=\"{}\" alt=\"\">", logo_data_uri(path)?)?;
    }
    writeln!(html, "</header>")?;

    if summary.from_date.is_some() || summary.to_date.is_some() {
        writeln!(
            html,
            "<p class=\"period\">{} &ndash; {}</p>",
            human_iso_date(language, summary.from_date.as_deref()),
            human_iso_date(language, summary.to_date.as_deref())
        )?;
    }
    for (name, heading) in [
        (&options.customer_name, Label::Customer),
        (&options.consultant_name, Label::Consultant),
    ] {
        if let Some(name) = name {
            writeln!(html, "<p><strong>{}</strong>: {}</p>", label(heading), escape(name))?;
        }
    }

    writeln!(html, "<h2>{}</h2>", label(Label::DailyTimeSheet))?;
    writeln!(html, "<table class=\"days\">")?;
    writeln!(
        html,
        "<tr><th>{}</th><th class=\"duration\">{}</th></tr>",
        label(Label::Date),
        label(Label::Duration)
    )?;
    for day in &summary.days {
        writeln!(
            html,
            "<tr><td><time datetime=\"{}\">{}</time></td><td class=\"duration\">{}</td></tr>",
            escape(&day.iso_date),
            escape(&day.human_date),
            escape(&day.total_duration_human)
        )?;
    }
    writeln!(html, "{}", total_row(summary, options, 1))?;
    writeln!(html, "</table>")?;

    writeln!(html, "<h2>{}</h2>", label(Label::TasksSummary))?;
    writeln!(html, "<table class=\"tasks\">")?;
    writeln!(
        html,
        "<tr><th>{}</th><th>{}</th><th>{}</th><th>{}</th><th class=\"duration\">{}</th></tr>",
        label(Label::Task),
        label(Label::List),
        label(Label::Project),
        label(Label::Folder),
        label(Label::Duration)
    )?;
    for task in &summary.tasks {
        writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"duration\">{}</td></tr>",
            escape(&task.name),
            escape(task.list.as_deref().unwrap_or("")),
            escape(task.project.as_deref().unwrap_or("")),
            escape(task.folder.as_deref().unwrap_or("")),
            escape(&task.total_duration_human)
        )?;
    }
    writeln!(html, "{}", total_row(summary, options, 4))?;
    writeln!(html, "</table>")?;

    if options.customer_signature_field || options.consultant_signature_field {
        writeln!(html, "<div class=\"signatures\">")?;
        for (enabled, name, heading) in [
            (
                options.customer_signature_field,
                &options.customer_name,
                Label::Customer,
            ),
            (
                options.consultant_signature_field,
                &options.consultant_name,
                Label::Consultant,
            ),
        ] {
            if enabled {
                let who = name
                    .as_deref()
                    .map(escape)
                    .unwrap_or_else(|| label(heading));
                writeln!(
                    html,
                    "<div class=\"signature\">{} ({})</div>",
                    label(Label::Signature),
                    who
                )?;
            }
        }
        writeln!(html, "</div>")?;
    }

    if options.clickup_mention {
        writeln!(html, "<p class=\"mention\">{}</p>", label(Label::ClickUpMention))?;
    }
    writeln!(html, "</body>\n</html>")?;

    Ok(html)
}

/// HTMLをファイルに書き出す。
pub fn write_html(summary: &Summary, options: &ReportOptions, path: &Path) -> Result<()> {
    let html = render_html(summary, options)?;
    fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());

    Ok(())
}

fn total_row(summary: &Summary, options: &ReportOptions, colspan: usize) -> String {
    let language = options.language;
    let hours_as_float = match summary.total_duration.hours_as_float {
        Some(hours) if options.total_hours_as_float => format!(" ({}h)", language.decimal(hours)),
        _ => String::new(),
    };

    format!(
        "<tr class=\"total\"><td colspan=\"{}\">{}</td><td class=\"duration\">{}{}</td></tr>",
        colspan,
        escape(language.label(Label::Total)),
        summary.total_duration.human(),
        hours_as_float
    )
}

/// `YYYY-MM-DD`で始まる日付を長い形式で表示する。読めない場合はそのまま返す。
fn human_iso_date(language: Language, value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    value
        .get(..10)
        .and_then(|date| chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .map(|date| escape(&language.full_date(date)))
        .unwrap_or_else(|| escape(value))
}

/// ロゴを`data:` URIとして埋め込む。
fn logo_data_uri(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(ReportError::LogoNotFound(path.to_path_buf()).into());
    }
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read logo {}", path.display()))?;
    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "image/png",
    };

    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::ReportError;

/// 既定のHTML-PDF変換コマンド。
pub const DEFAULT_PDF_ENGINE: &str = "weasyprint";

/// 外部コマンドでHTMLをPDFに変換する。
///
/// `<engine> - <output>`の形式で起動し、HTMLは標準入力から渡す。
/// `weasyprint`と`wkhtmltopdf`はどちらもこの形式を受け付ける。
///
/// # Arguments
///
/// * `engine` - 変換コマンド
/// * `html` - 変換するHTML
/// * `path` - 出力するPDFのパス
pub async fn write_pdf(engine: &str, html: &str, path: &Path) -> Result<()> {
    debug!("Converting HTML to PDF with {}", engine);
    let mut child = Command::new(engine)
        .arg("-")
        .arg(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => anyhow::Error::from(ReportError::PdfEngineMissing(engine.to_string())),
            _ => anyhow::Error::from(err).context(format!("Failed to start {}", engine)),
        })?;

    let mut stdin = child.stdin.take().context("Failed to open stdin of PDF engine")?;
    // 標準エラーを読みながら書き込む
    let send_html = async move {
        stdin.write_all(html.as_bytes()).await?;
        stdin.shutdown().await
    };
    let (sent, output) = tokio::join!(send_html, child.wait_with_output());

    let output = output.with_context(|| format!("Failed to wait for {}", engine))?;
    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            engine,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    sent.with_context(|| format!("Failed to send HTML to {}", engine))?;
    info!("Wrote {}", path.display());

    Ok(())
}

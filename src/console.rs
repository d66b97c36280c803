use std::io::Write;

use anyhow::{Context, Result};

use crate::i18n::{Label, Language};
use crate::summary::Summary;

/// Consoleに集計結果を表示するためのtrait。
pub trait ConsolePresenter {
    /// 集計結果を表示する。
    ///
    /// # Arguments
    ///
    /// * `summary` - 表示する集計結果
    fn show_summary(&mut self, summary: &Summary) -> Result<()>;
}

/// 集計結果を日毎、タスクごと、総計の順にテキストで表示する。
pub struct ConsoleTimeSheet<'a, W: Write> {
    writer: &'a mut W,
    language: Language,
    total_hours_as_float: bool,
}

impl<'a, W: Write> ConsoleTimeSheet<'a, W> {
    /// 新しい`ConsoleTimeSheet`を返す。
    pub fn new(writer: &'a mut W, language: Language, total_hours_as_float: bool) -> Self {
        Self {
            writer,
            language,
            total_hours_as_float,
        }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleTimeSheet<'a, W> {
    fn show_summary(&mut self, summary: &Summary) -> Result<()> {
        let language = self.language;
        let mut lines = vec![format!("{}:", language.label(Label::DailyTimeSheet))];
        lines.extend(
            summary
                .days
                .iter()
                .map(|day| format!("{} {}", day.human_date, day.total_duration_human)),
        );

        lines.push(String::new());
        lines.push(format!("{}:", language.label(Label::TasksSummary)));
        lines.extend(summary.tasks.iter().map(|task| {
            format!(
                "{} {} {} {} {}",
                task.name,
                or_dash(&task.list),
                or_dash(&task.project),
                or_dash(&task.folder),
                task.total_duration_human
            )
        }));

        lines.push(String::new());
        let hours_as_float = match summary.total_duration.hours_as_float {
            Some(hours) if self.total_hours_as_float => {
                format!(" ({}h)", language.decimal(hours))
            }
            _ => String::new(),
        };
        lines.push(format!(
            "{}: {}{}",
            language.label(Label::Total),
            summary.total_duration.human(),
            hours_as_float
        ));

        for line in lines {
            writeln!(self.writer, "{}", line)
                .with_context(|| format!("Failed to write line: {}", line))?;
        }

        Ok(())
    }
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

use std::str::FromStr;

use chrono::{Locale, NaiveDate, NaiveTime, TimeZone, Utc};

/// レポートの表示言語。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
    French,
}

/// 翻訳対象の文言。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    DefaultTitle,
    DailyTimeSheet,
    TasksSummary,
    Date,
    Duration,
    Task,
    List,
    Project,
    Folder,
    Total,
    Customer,
    Consultant,
    Signature,
    Page,
    ClickUpMention,
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    /// `fr`で始まる場合はフランス語、それ以外は英語とする。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().to_lowercase().starts_with("fr") {
            Ok(Language::French)
        } else {
            Ok(Language::English)
        }
    }
}

impl Language {
    /// 日付の書式に使うロケール。
    pub fn locale(&self) -> Locale {
        match self {
            Language::English => Locale::en_US,
            Language::French => Locale::fr_FR,
        }
    }

    /// HTMLの`lang`属性。
    pub fn html_lang(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }

    /// 曜日を含む長い形式で日付を表示する。
    pub fn full_date(&self, date: NaiveDate) -> String {
        let pattern = match self {
            Language::English => "%A, %B %-d, %Y",
            Language::French => "%A %-d %B %Y",
        };

        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
            .format_localized(pattern, self.locale())
            .to_string()
    }

    /// 小数点以下2桁の数値を表示する。
    pub fn decimal(&self, value: f64) -> String {
        let formatted = format!("{:.2}", value);
        match self {
            Language::English => formatted,
            Language::French => formatted.replace('.', ","),
        }
    }

    /// 文言を翻訳する。
    pub fn label(&self, label: Label) -> &'static str {
        match self {
            Language::English => match label {
                Label::DefaultTitle => "Time entries",
                Label::DailyTimeSheet => "Daily time sheet",
                Label::TasksSummary => "Tasks summary",
                Label::Date => "Date",
                Label::Duration => "Duration",
                Label::Task => "Task",
                Label::List => "List",
                Label::Project => "Project",
                Label::Folder => "Folder",
                Label::Total => "Total",
                Label::Customer => "Customer",
                Label::Consultant => "Consultant",
                Label::Signature => "Signature",
                Label::Page => "Page",
                Label::ClickUpMention => "Generated from ClickUp time entries",
            },
            Language::French => match label {
                Label::DefaultTitle => "Relevé de temps",
                Label::DailyTimeSheet => "Feuille de temps journalière",
                Label::TasksSummary => "Récapitulatif des tâches",
                Label::Date => "Date",
                Label::Duration => "Durée",
                Label::Task => "Tâche",
                Label::List => "Liste",
                Label::Project => "Projet",
                Label::Folder => "Dossier",
                Label::Total => "Total",
                Label::Customer => "Client",
                Label::Consultant => "Consultant",
                Label::Signature => "Signature",
                Label::Page => "Page",
                Label::ClickUpMention => "Généré à partir des saisies de temps ClickUp",
            },
        }
    }

    /// 既定のタイトルであれば翻訳し、それ以外はそのまま返す。
    pub fn title<'a>(&self, title: &'a str) -> &'a str {
        if title == Language::English.label(Label::DefaultTitle) {
            self.label(Label::DefaultTitle)
        } else {
            title
        }
    }
}

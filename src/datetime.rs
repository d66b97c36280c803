use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ReportError;

/// 期間の開始日を省略した時に遡る月数。
pub const DEFAULT_MONTHS_BACKWARDS: u32 = 12;

/// 夏時間の切り替えで存在しない時刻を探す上限(分)。
const MAX_GAP_MINUTES: u32 = 24 * 60;

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// タイムエントリーを取得する期間。
///
/// 日付は両端を含み、指定されたタイムゾーンの1日全体を対象とする。
#[derive(Clone, Debug, PartialEq)]
pub struct DateRange {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl DateRange {
    /// 開始日、終了日から取得期間を決める。
    ///
    /// 終了日を省略した場合は現在時刻まで、開始日を省略した場合は終了日の
    /// `DEFAULT_MONTHS_BACKWARDS`ヶ月前の00:00:00からとする。
    ///
    /// # Arguments
    ///
    /// * `from_date` - 開始日
    /// * `to_date` - 終了日
    /// * `time_zone` - 日付を解釈するタイムゾーン
    /// * `now` - 現在時刻
    pub fn resolve(
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
        time_zone: Tz,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let (to_date, end_at) = match to_date {
            Some(date) => {
                let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)
                    .context("Failed to set hour, minute, and second")?;
                (date, to_utc(time_zone, date.and_time(end_of_day), true)?)
            }
            None => (now.with_timezone(&time_zone).date_naive(), now),
        };
        let from_date = match from_date {
            Some(date) => date,
            None => to_date
                .checked_sub_months(Months::new(DEFAULT_MONTHS_BACKWARDS))
                .with_context(|| format!("Failed to go back from {}", to_date))?,
        };
        if from_date > to_date {
            return Err(ReportError::InvalidDateRange {
                from: from_date,
                to: to_date,
            }
            .into());
        }
        let start_at = to_utc(time_zone, from_date.and_time(NaiveTime::MIN), false)?;

        Ok(Self {
            from_date,
            to_date,
            start_at,
            end_at,
        })
    }
}

/// タイムゾーン上の日時をUTCに変換する。
///
/// 夏時間の切り替えで曖昧な場合は、`latest`に応じて早い方か遅い方を選ぶ。
/// 存在しない時刻の場合は、1分ずつずらして同じ日の存在する時刻を使う。
/// `latest`の場合は前に、それ以外は後ろにずらす。
fn to_utc(time_zone: Tz, local: NaiveDateTime, latest: bool) -> Result<DateTime<Utc>> {
    let step = if latest {
        Duration::minutes(-1)
    } else {
        Duration::minutes(1)
    };

    let mut candidate = local;
    for _ in 0..MAX_GAP_MINUTES {
        if candidate.date() != local.date() {
            break;
        }
        let mapped = time_zone.from_local_datetime(&candidate);
        let datetime = if latest {
            mapped.latest()
        } else {
            mapped.earliest()
        };
        if let Some(datetime) = datetime {
            return Ok(datetime.with_timezone(&Utc));
        }
        candidate += step;
    }

    Err(anyhow::anyhow!(
        "{} does not exist in time zone {}",
        local,
        time_zone
    ))
}

/// 日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}

/// タイムゾーン名をパースする。
pub fn parse_time_zone(s: &str) -> Result<Tz> {
    s.parse::<Tz>()
        .map_err(|err| anyhow::anyhow!("Unknown time zone {}: {}", s, err))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
    use chrono_tz::America::Sao_Paulo;
    use chrono_tz::Europe::Paris;
    use chrono_tz::Tz;
    use rstest::rstest;

    use super::{mock_datetime, parse_date, parse_time_zone, DateRange};
    use crate::error::ReportError;

    /// 何も設定しない場合は、現在時間が取得できることを確認する。
    ///
    ///  - 現在時刻での比較を行なっているため、ミリ秒単位まで比較するとテストが失敗する可能性があり、秒単位で比較している。
    #[test]
    fn test_now() {
        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// モック時間を設定した時に、その時間が取得できることを確認する。
    #[test]
    fn test_now_specific_datetime() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );

        assert_eq!(mock_datetime::now().to_rfc3339(), datetime);
        mock_datetime::clear_mock_time();
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 指定された日付はタイムゾーン上の1日全体を含む。
    #[test]
    fn test_resolve_explicit_dates() {
        let now = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();

        let range =
            DateRange::resolve(Some(date(2023, 1, 1)), Some(date(2023, 1, 31)), Paris, now)
                .unwrap();

        assert_eq!(range.from_date, date(2023, 1, 1));
        assert_eq!(range.to_date, date(2023, 1, 31));
        assert_eq!(
            range.start_at,
            Utc.with_ymd_and_hms(2022, 12, 31, 23, 0, 0).unwrap()
        );
        assert_eq!(
            range.end_at,
            Utc.with_ymd_and_hms(2023, 1, 31, 22, 59, 59).unwrap()
        );
    }

    /// 日付を省略した場合は、現在時刻と12ヶ月前の日付を使う。
    #[test]
    fn test_resolve_defaults() {
        let now = Utc.with_ymd_and_hms(2023, 6, 15, 22, 30, 0).unwrap();

        let range = DateRange::resolve(None, None, Paris, now).unwrap();

        // パリでは既に16日
        assert_eq!(range.to_date, date(2023, 6, 16));
        assert_eq!(range.end_at, now);
        assert_eq!(range.from_date, date(2022, 6, 16));
        assert_eq!(
            range.start_at,
            Utc.with_ymd_and_hms(2022, 6, 15, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_resolve_from_only() {
        let now = Utc.with_ymd_and_hms(2023, 3, 10, 8, 0, 0).unwrap();

        let range = DateRange::resolve(Some(date(2023, 3, 1)), None, Paris, now).unwrap();

        assert_eq!(range.from_date, date(2023, 3, 1));
        assert_eq!(range.to_date, date(2023, 3, 10));
        assert_eq!(range.end_at, now);
    }

    /// 00:00が存在しない日は、その日の最初に存在する時刻から始める。
    #[rstest]
    #[case::midnight_gap(
        Sao_Paulo,
        date(2018, 11, 4),
        date(2018, 11, 10),
        Utc.with_ymd_and_hms(2018, 11, 4, 3, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2018, 11, 11, 1, 59, 59).unwrap()
    )]
    #[case::no_gap(
        Sao_Paulo,
        date(2018, 11, 3),
        date(2018, 11, 3),
        Utc.with_ymd_and_hms(2018, 11, 3, 3, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2018, 11, 4, 2, 59, 59).unwrap()
    )]
    fn test_resolve_daylight_saving_gap(
        #[case] time_zone: Tz,
        #[case] from: NaiveDate,
        #[case] to: NaiveDate,
        #[case] start_at: DateTime<Utc>,
        #[case] end_at: DateTime<Utc>,
    ) {
        let now = Utc.with_ymd_and_hms(2019, 1, 1, 12, 0, 0).unwrap();

        let range = DateRange::resolve(Some(from), Some(to), time_zone, now).unwrap();

        assert_eq!(range.start_at, start_at);
        assert_eq!(range.end_at, end_at);
    }

    /// 省略した開始日が00:00の存在しない日でも失敗しない。
    #[test]
    fn test_resolve_default_from_in_gap() {
        let now = Utc.with_ymd_and_hms(2019, 11, 4, 15, 0, 0).unwrap();

        let range = DateRange::resolve(None, None, Sao_Paulo, now).unwrap();

        assert_eq!(range.from_date, date(2018, 11, 4));
        assert_eq!(
            range.start_at,
            Utc.with_ymd_and_hms(2018, 11, 4, 3, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_resolve_reversed_range() {
        let now = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();

        let err =
            DateRange::resolve(Some(date(2023, 2, 1)), Some(date(2023, 1, 1)), Paris, now)
                .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::InvalidDateRange { .. })
        ));
    }

    #[rstest]
    #[case("2023-01-31", true)]
    #[case("2023-02-30", false)]
    #[case("31/01/2023", false)]
    fn test_parse_date(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(parse_date(input).is_ok(), ok);
    }

    #[rstest]
    #[case("Europe/Paris", true)]
    #[case("UTC", true)]
    #[case("Mars/Olympus", false)]
    fn test_parse_time_zone(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(parse_time_zone(input).is_ok(), ok);
    }
}

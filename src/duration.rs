use std::fmt;

use serde::{Deserialize, Serialize};

/// 秒数を時間、分、秒に分解した値。
///
/// JSONでは`[hours, minutes, seconds]`の配列として表現する。
/// 秒は端数を保持し、表示時にのみ切り捨てる。
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64, f64)", into = "(f64, f64, f64)")]
pub struct DurationParts {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: f64,
}

impl DurationParts {
    /// 秒数を60での切り捨て除算を2回行い分解する。
    ///
    /// 負の値やNaNは0秒として扱う。
    pub fn from_seconds(total_seconds: f64) -> Self {
        let total_seconds = if total_seconds.is_finite() && total_seconds > 0.0 {
            total_seconds
        } else {
            0.0
        };
        let total_minutes = (total_seconds / 60.0).floor();
        let seconds = (total_seconds - total_minutes * 60.0).max(0.0);
        let hours = (total_minutes / 60.0).floor();
        let minutes = total_minutes - hours * 60.0;

        Self {
            hours: hours as u64,
            minutes: minutes as u64,
            seconds,
        }
    }

    /// 小数点以下2桁に丸めた時間単位の値。
    pub fn hours_as_float(&self) -> f64 {
        let hours =
            self.hours as f64 + self.minutes as f64 / 60.0 + self.seconds / 3600.0;
        (hours * 100.0).round() / 100.0
    }

    /// `1h12m19s`形式の文字列。
    pub fn human(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DurationParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}h{}m{}s",
            self.hours,
            self.minutes,
            self.seconds.trunc() as u64
        )
    }
}

impl From<(f64, f64, f64)> for DurationParts {
    fn from((hours, minutes, seconds): (f64, f64, f64)) -> Self {
        Self {
            hours: hours.max(0.0) as u64,
            minutes: minutes.max(0.0) as u64,
            seconds: seconds.max(0.0),
        }
    }
}

impl From<DurationParts> for (f64, f64, f64) {
    fn from(parts: DurationParts) -> Self {
        (parts.hours as f64, parts.minutes as f64, parts.seconds)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::DurationParts;

    #[rstest]
    #[case::zero(0.0, 0, 0, "0h0m0s")]
    #[case::seconds_only(59.5, 0, 0, "0h0m59s")]
    #[case::one_minute(60.0, 0, 1, "0h1m0s")]
    #[case::one_hour(3600.0, 1, 0, "1h0m0s")]
    #[case::clickup_sample(4339.892, 1, 12, "1h12m19s")]
    #[case::over_a_day(90061.0, 25, 1, "25h1m1s")]
    fn test_from_seconds(
        #[case] input: f64,
        #[case] hours: u64,
        #[case] minutes: u64,
        #[case] human: &str,
    ) {
        let parts = DurationParts::from_seconds(input);

        assert_eq!(parts.hours, hours);
        assert_eq!(parts.minutes, minutes);
        assert_eq!(parts.human(), human);
    }

    /// 分解した値を秒に戻すと、入力の切り捨て値と一致することを確認する。
    #[rstest]
    #[case(0.0)]
    #[case(0.999)]
    #[case(61.25)]
    #[case(3599.999)]
    #[case(4339.892)]
    #[case(123456.789)]
    fn test_decomposition_is_consistent(#[case] input: f64) {
        let parts = DurationParts::from_seconds(input);

        assert!(parts.minutes < 60);
        assert!(parts.seconds < 60.0);
        assert_eq!(
            parts.hours * 3600 + parts.minutes * 60 + parts.seconds.floor() as u64,
            input.floor() as u64
        );
    }

    #[rstest]
    #[case::negative(-10.0)]
    #[case::nan(f64::NAN)]
    fn test_invalid_input_is_zero(#[case] input: f64) {
        assert_eq!(DurationParts::from_seconds(input), DurationParts::default());
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(4339.892, 1.21)]
    #[case(5400.0, 1.5)]
    fn test_hours_as_float(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(DurationParts::from_seconds(input).hours_as_float(), expected);
    }

    #[test]
    fn test_serialize_as_array() {
        let parts = DurationParts::from_seconds(3725.0);

        let json = serde_json::to_string(&parts).unwrap();
        assert_eq!(json, "[1.0,2.0,5.0]");

        let parsed: DurationParts = serde_json::from_str("[1, 2, 5.5]").unwrap();
        assert_eq!(parsed.hours, 1);
        assert_eq!(parsed.minutes, 2);
        assert_eq!(parsed.seconds, 5.5);
    }
}

use chrono::DateTime;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

const BINARY_UNITS: [(&str, u64); 5] = [
    ("Pi", 1_125_899_906_842_624),
    ("Ti", 1_099_511_627_776),
    ("Gi", 1_073_741_824),
    ("Mi", 1_048_576),
    ("Ki", 1_024),
];

const AGE_UNITS: [(&str, i64); 5] = [
    ("y", 365 * 86_400),
    ("d", 86_400),
    ("h", 3_600),
    ("m", 60),
    ("s", 1),
];

/// Renders an elapsed duration with the two most significant non-zero units.
pub fn format_age(seconds: i64) -> String {
    let mut remaining = seconds.max(0);
    let mut parts = Vec::with_capacity(2);
    for (suffix, unit) in AGE_UNITS {
        let amount = remaining / unit;
        remaining %= unit;
        if amount > 0 {
            parts.push(format!("{amount}{suffix}"));
            if parts.len() == 2 {
                break;
            }
        }
    }

    if parts.is_empty() {
        return "0s".to_string();
    }
    parts.concat()
}

pub fn age_since(timestamp: Option<&Time>, now_seconds: i64) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };
    format_age(now_seconds - timestamp.0.as_second())
}

pub fn format_timestamp(timestamp: Option<&Time>) -> String {
    timestamp
        .and_then(|time| DateTime::from_timestamp(time.0.as_second(), 0))
        .map(|value| value.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Long form with two decimals, e.g. `1.50Mi`.
pub fn format_bytes(bytes: u64) -> String {
    for (suffix, unit) in BINARY_UNITS {
        if bytes >= unit {
            return format!("{:.2}{suffix}", bytes as f64 / unit as f64);
        }
    }
    format!("{bytes}B")
}

/// Short form with at most one decimal, e.g. `1.5Mi` or `2Gi`.
pub fn format_bytes_compact(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }

    for (suffix, unit) in BINARY_UNITS {
        if bytes >= unit {
            let whole = bytes / unit;
            let decimal = ((bytes % unit) * 10) / unit;
            if decimal == 0 {
                return format!("{whole}{suffix}");
            }
            return format!("{whole}.{decimal}{suffix}");
        }
    }

    format!("{bytes}B")
}

pub fn format_cpu(millicores: u64) -> String {
    if millicores < 1_000 {
        return format!("{millicores}m");
    }

    let cores = millicores / 1_000;
    let tenths = (millicores % 1_000) / 100;
    if millicores % 1_000 == 0 {
        cores.to_string()
    } else {
        format!("{cores}.{tenths}")
    }
}

/// Cuts `value` to `max` characters, ending in `...` when anything was dropped.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return value.chars().take(max).collect();
    }

    let mut out = value.chars().take(max - 3).collect::<String>();
    out.push_str("...");
    out
}

pub fn pad_right(value: &str, width: usize) -> String {
    let truncated = truncate(value, width);
    let len = truncated.chars().count();
    format!("{truncated}{}", " ".repeat(width.saturating_sub(len)))
}

#[cfg(test)]
mod tests {
    use super::{
        format_age, format_bytes, format_bytes_compact, format_cpu, format_timestamp, pad_right,
        truncate,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    #[test]
    fn age_uses_two_highest_units() {
        assert_eq!(format_age(30), "30s");
        assert_eq!(format_age(45 * 60 + 12), "45m12s");
        assert_eq!(format_age(2 * 86_400 + 5 * 3_600 + 17), "2d5h");
        assert_eq!(format_age(400 * 86_400), "1y35d");
        assert_eq!(format_age(365 * 86_400), "1y");
    }

    #[test]
    fn age_skips_zero_units_and_clamps_negative() {
        assert_eq!(format_age(86_400 + 120), "1d2m");
        assert_eq!(format_age(0), "0s");
        assert_eq!(format_age(-5), "0s");
    }

    #[test]
    fn timestamp_uses_source_calendar_fields() {
        let time = Time("2024-03-05T07:08:09Z".parse().expect("timestamp"));
        assert_eq!(format_timestamp(Some(&time)), "2024-03-05 07:08:09");
        assert_eq!(format_timestamp(None), "-");
    }

    #[test]
    fn bytes_long_and_short_forms() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(1_572_864), "1.50Mi");
        assert_eq!(format_bytes_compact(1_572_864), "1.5Mi");
        assert_eq!(format_bytes_compact(2 * 1_073_741_824), "2Gi");
        assert_eq!(format_bytes_compact(0), "0B");
    }

    #[test]
    fn cpu_renders_millicores_and_cores() {
        assert_eq!(format_cpu(250), "250m");
        assert_eq!(format_cpu(2_000), "2");
        assert_eq!(format_cpu(1_500), "1.5");
    }

    #[test]
    fn truncate_appends_three_dots() {
        assert_eq!(truncate("nginx-deployment", 8), "nginx...");
        assert_eq!(truncate("short", 8), "short");
        assert_eq!(pad_right("web", 6), "web   ");
    }
}

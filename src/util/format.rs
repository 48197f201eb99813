use std::time::SystemTime;

use time::{macros::format_description, OffsetDateTime};

pub const SIZE_UNITS: [(&str, i64); 4] = [
    ("B", 1),
    ("KB", 1024),
    ("MB", 1024 * 1024),
    ("GB", 1024 * 1024 * 1024),
];

pub fn format_size(size: Option<i64>) -> String {
    let size = match size {
        None => return "-".to_string(),
        Some(size) => size,
    };

    let mut value = size.max(0) as f64;
    for suffix in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return if suffix == "B" {
                format!("{} B", value as i64)
            } else {
                format!("{:.1} {}", value, suffix)
            };
        }
        value /= 1024.0;
    }

    format!("{:.1} TB", value)
}

pub fn split_size_bytes(size: i64) -> (String, String) {
    if size <= 0 {
        return ("1".to_string(), "MB".to_string());
    }

    for (unit, factor) in [
        ("GB", 1024 * 1024 * 1024),
        ("MB", 1024 * 1024),
        ("KB", 1024),
    ] {
        if size >= factor && size % factor == 0 {
            return ((size / factor).to_string(), unit.to_string());
        }
    }

    (size.to_string(), "B".to_string())
}

pub fn parse_size_bytes(value: &str, unit: &str) -> Option<i64> {
    let number: i64 = value.trim().parse().ok()?;
    if number <= 0 {
        return None;
    }

    let unit = unit.trim().to_uppercase();
    SIZE_UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, factor)| number * factor)
}

pub fn format_last_modified(last_modified: Option<SystemTime>) -> String {
    let timestamp = match last_modified {
        None => return "-".to_string(),
        Some(timestamp) => timestamp,
    };

    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");

    OffsetDateTime::from(timestamp)
        .format(&format)
        .unwrap_or_else(|_| "-".to_string())
}

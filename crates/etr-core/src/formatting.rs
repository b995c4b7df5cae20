use chrono::{DateTime, TimeZone};

/// Group digits in threes the way Indonesian locales do (`50000` -> `50.000`).
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

pub fn format_rupiah(amount: u64) -> String {
    format!("Rp {}", group_thousands(amount))
}

/// `YYYY-MM-DD` and 24-hour `HH:MM:SS` of the given instant, in its own zone.
pub fn date_and_time<Tz: TimeZone>(at: &DateTime<Tz>) -> (String, String)
where
    Tz::Offset: std::fmt::Display,
{
    (
        at.format("%Y-%m-%d").to_string(),
        at.format("%H:%M:%S").to_string(),
    )
}

use time::{macros::format_description, Date, OffsetDateTime};

/// Parses `YYYY-M-D` as well as zero-padded `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<Date> {
    let format = format_description!("[year]-[month padding:none]-[day padding:none]");
    Date::parse(raw.trim(), format).ok()
}

pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

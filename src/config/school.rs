use crate::{
    config::var_or,
    error::{GateResult, InvalidTimezoneSnafu, ParseTimeSnafu},
};
use jiff::{Timestamp, civil::DateTime, tz::TimeZone};
use snafu::ResultExt;

#[derive(Copy, Clone, Debug)]
pub enum DateFormat {
    ///`Mon 16/06/25 @ 14:05`
    Short,
    ///`14:05`
    TimeOnly,
    ///`16 Jun 2025`
    DateOnly,
}

impl DateFormat {
    const fn pattern(self) -> &'static str {
        match self {
            Self::Short => "%a %d/%m/%y @ %H:%M",
            Self::TimeOnly => "%H:%M",
            Self::DateOnly => "%d %b %Y",
        }
    }
}

/// Where the school is, both on the map and on the web.
#[derive(Debug, Clone)]
pub struct SchoolConfig {
    pub timezone: TimeZone,
    pub public_url: String,
}

impl SchoolConfig {
    pub fn new(timezone: String, public_url: String) -> GateResult<Self> {
        let timezone = TimeZone::get(&timezone).context(InvalidTimezoneSnafu { tz: timezone })?;

        Ok(Self {
            timezone,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> GateResult<Self> {
        Self::new(
            var_or("SECURELEAVE_TIMEZONE", "UTC"),
            var_or("SECURELEAVE_PUBLIC_URL", "http://127.0.0.1:8080"),
        )
    }

    ///the link staff hand to students
    pub fn portal_url(&self) -> String {
        format!("{}/s", self.public_url)
    }

    pub fn format(&self, timestamp: Timestamp, date_format: DateFormat) -> String {
        timestamp
            .to_zoned(self.timezone.clone())
            .strftime(date_format.pattern())
            .to_string()
    }

    pub fn short(&self, timestamp: Timestamp) -> String {
        self.format(timestamp, DateFormat::Short)
    }

    pub fn time_only(&self, timestamp: Timestamp) -> String {
        self.format(timestamp, DateFormat::TimeOnly)
    }

    pub fn date_only(&self, timestamp: Timestamp) -> String {
        self.format(timestamp, DateFormat::DateOnly)
    }

    /// Reads the value of an `<input type="datetime-local">` as school-local time.
    pub fn parse_local(&self, value: &str) -> GateResult<Timestamp> {
        let civil = DateTime::strptime("%Y-%m-%dT%H:%M", value.trim())
            .context(ParseTimeSnafu { original: value })?;
        civil
            .to_zoned(self.timezone.clone())
            .map(|zoned| zoned.timestamp())
            .context(ParseTimeSnafu { original: value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_times_are_read_in_school_time() {
        let nairobi =
            SchoolConfig::new("Africa/Nairobi".into(), "https://gate.example.org/".into()).unwrap();
        let ts = nairobi.parse_local("2025-06-16T14:05").unwrap();

        assert_eq!(ts.to_string(), "2025-06-16T11:05:00Z");
        assert_eq!(nairobi.time_only(ts), "14:05");
        assert_eq!(nairobi.short(ts), "Mon 16/06/25 @ 14:05");
        assert_eq!(nairobi.date_only(ts), "16 Jun 2025");
    }

    #[test]
    fn portal_url_has_no_double_slash() {
        let config = SchoolConfig::new("UTC".into(), "https://gate.example.org/".into()).unwrap();
        assert_eq!(config.portal_url(), "https://gate.example.org/s");
    }

    #[test]
    fn garbage_is_refused() {
        let config = SchoolConfig::new("UTC".into(), String::new()).unwrap();
        assert!(config.parse_local("tomorrow-ish").is_err());
        assert!(SchoolConfig::new("Mars/Olympus".into(), String::new()).is_err());
    }
}

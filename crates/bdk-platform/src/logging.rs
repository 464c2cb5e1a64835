//! Log settings shared by function and API resources

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum LogLevel {
    None,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
    All,
}

impl LogLevel {
    /// Upper-case level name
    #[must_use]
    pub fn as_upper(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
            Self::All => "ALL",
        }
    }
}

/// Log record format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text lines
    #[default]
    Text,
    /// One JSON object per record
    Json,
}

impl LogFormat {
    /// Upper-case format name
    #[must_use]
    pub fn as_upper(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Json => "JSON",
        }
    }
}

/// How long log groups keep records
///
/// Parsed from phrases such as `1 week`, `13 months` or `infinite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogRetention {
    days: Option<u32>,
}

const RETENTION_PERIODS: &[(&str, u32)] = &[
    ("1 day", 1),
    ("3 days", 3),
    ("5 days", 5),
    ("1 week", 7),
    ("2 weeks", 14),
    ("1 month", 30),
    ("2 months", 60),
    ("3 months", 90),
    ("4 months", 120),
    ("5 months", 150),
    ("6 months", 180),
    ("1 year", 365),
    ("13 months", 400),
    ("18 months", 545),
    ("2 years", 731),
    ("3 years", 1096),
    ("5 years", 1827),
    ("6 years", 2192),
    ("7 years", 2557),
    ("8 years", 2922),
    ("9 years", 3288),
    ("10 years", 3653),
];

impl LogRetention {
    /// One week
    pub const ONE_WEEK: Self = Self { days: Some(7) };
    /// Keep forever
    pub const INFINITE: Self = Self { days: None };

    /// Retention in days; `None` keeps records forever
    #[inline]
    #[must_use]
    pub fn days(self) -> Option<u32> {
        self.days
    }
}

impl FromStr for LogRetention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let phrase = s.trim().to_lowercase();
        if phrase == "infinite" {
            return Ok(Self::INFINITE);
        }
        RETENTION_PERIODS
            .iter()
            .find(|(name, _)| *name == phrase)
            .map(|(_, days)| Self { days: Some(*days) })
            .ok_or_else(|| format!("unsupported log retention `{s}`"))
    }
}

impl TryFrom<String> for LogRetention {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LogRetention> for String {
    fn from(value: LogRetention) -> Self {
        value.to_string()
    }
}

impl fmt::Display for LogRetention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.days {
            None => f.write_str("infinite"),
            Some(days) => match RETENTION_PERIODS.iter().find(|(_, d)| *d == days) {
                Some((name, _)) => f.write_str(name),
                None => write!(f, "{days} days"),
            },
        }
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WatchConfigError;

/// Inclusive source line range, written `"12"` or `"12-20"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LineRange {
    start: u32,
    end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Result<Self, WatchConfigError> {
        if start > end {
            return Err(WatchConfigError::InvalidLineRange(format!("{start}-{end}")));
        }
        Ok(Self { start, end })
    }

    pub fn single(line: u32) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    /// Parse a comma separated list such as `"10-12, 40"`.
    pub fn parse_list(text: &str) -> Result<Vec<Self>, WatchConfigError> {
        text.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for LineRange {
    type Err = WatchConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || WatchConfigError::InvalidLineRange(text.to_owned());
        let parse_line = |s: &str| s.trim().parse::<u32>().map_err(|_| invalid());

        match text.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse_line(start)?, parse_line(end)?);
                if start > end {
                    return Err(invalid());
                }
                Ok(Self { start, end })
            }
            None => Ok(Self::single(parse_line(text)?)),
        }
    }
}

impl TryFrom<String> for LineRange {
    type Error = WatchConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LineRange> for String {
    fn from(range: LineRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

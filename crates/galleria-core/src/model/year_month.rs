// ── Year-month values ──
//
// A piece's date has year precision with an optional month. The wire
// encoding is `YYYY-MM`, or `YYYY-null` when the month is unknown.

use std::fmt;

use crate::error::CoreError;

/// A year with an optional month, e.g. "2013-07" or "2017".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: Option<u32>,
}

impl YearMonth {
    pub fn new(year: i32, month: Option<u32>) -> Self {
        Self { year, month }
    }

    /// Encode to the wire format: `"2013-07"` or `"2017-null"`.
    pub fn encode(&self) -> String {
        match self.month {
            Some(month) => format!("{}-{month:02}", self.year),
            None => format!("{}-null", self.year),
        }
    }

    /// Decode from the wire format. The inverse of [`YearMonth::encode`].
    pub fn decode(raw: &str) -> Result<Self, CoreError> {
        let mut elements = raw.splitn(2, '-');

        let year = elements
            .next()
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(|| invalid(raw))?;

        let month = match elements.next() {
            None | Some("null") => None,
            Some(m) => Some(m.parse::<u32>().map_err(|_| invalid(raw))?),
        };

        Ok(Self { year, month })
    }
}

fn invalid(raw: &str) -> CoreError {
    CoreError::Conversion {
        field: String::new(),
        message: format!("malformed year-month value {raw:?}"),
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(month) => write!(f, "{:02}/{}", month, self.year),
            None => write!(f, "{}", self.year),
        }
    }
}

use std::convert::TryFrom;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

/// A date error.
#[derive(Debug, PartialEq, Eq)]
pub struct DateError;

impl std::error::Error for DateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::fmt::Display for DateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unable to decode date")
    }
}

const DAYS_PER_MONTH: [u8; 13] = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Zero based ordinal of the first day of each month
const MONTH_START: [i32; 13] = [0, 0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Years between the founding of Rome and the start of the common era
const AUC_OFFSET: i32 = 753;

/// Controls the output format of a date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// ISO-8601 format
    Iso8601,

    /// Y.M.D where month and day don't have zero padding
    DotShort,
}

/// A temporary object which can be used as an argument to `format!`.
///
/// Used to avoid a needless intermediate allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormatter {
    date: Date,
    format: DateFormat,
}

impl Display for DateFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());
        match self.format {
            DateFormat::Iso8601 if year < 0 => {
                write!(f, "-{:04}-{:02}-{:02}", -i32::from(year), month, day)
            }
            DateFormat::Iso8601 => write!(f, "{:04}-{:02}-{:02}", year, month, day),
            DateFormat::DotShort => write!(f, "{}.{}.{}", year, month, day),
        }
    }
}

/// A calendar date on the games' 365 day calendar (no leap years).
///
/// Internally a date is a single day count relative to the first day of year
/// zero, so dates from either calendar era compare and subtract directly.
/// Dates written in the founding-era (AUC) calendar are converted once, at
/// construction, with [`Date::parse_auc`] or [`Date::from_auc_ymd_opt`].
///
/// ```
/// use rome_loader::common::Date;
/// let start = Date::parse_auc("450.10.1").unwrap();
/// assert_eq!(start, Date::from_ymd(-304, 10, 1));
/// assert_eq!(start.game_fmt().to_string(), "-304.10.1");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    days: i32,
}

impl Debug for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Date {}", self.game_fmt())
    }
}

impl Date {
    /// Create a new date from year, month, and day parts
    ///
    /// Will return `None` if the date does not exist
    ///
    /// ```
    /// use rome_loader::common::Date;
    /// assert_eq!(Date::from_ymd_opt(867, 1, 1), Some(Date::from_ymd(867, 1, 1)));
    /// assert!(Date::from_ymd_opt(800, 0, 3).is_none());
    /// assert!(Date::from_ymd_opt(800, 1, 0).is_none());
    /// assert!(Date::from_ymd_opt(800, 13, 1).is_none());
    /// assert!(Date::from_ymd_opt(2020, 2, 29).is_none());
    /// ```
    pub fn from_ymd_opt(year: i16, month: u8, day: u8) -> Option<Self> {
        if month == 0 || month > 12 || day == 0 || day > DAYS_PER_MONTH[usize::from(month)] {
            return None;
        }

        let days = i32::from(year) * 365 + MONTH_START[usize::from(month)] + i32::from(day) - 1;
        Some(Date { days })
    }

    /// Create a new date from year, month, and day parts
    ///
    /// Will panic if the date does not exist.
    pub fn from_ymd(year: i16, month: u8, day: u8) -> Self {
        Self::from_ymd_opt(year, month, day).unwrap()
    }

    /// Create a date from a founding-era (AUC) year, month, and day.
    ///
    /// There is no year zero in the common era, so AUC 753 maps to 1 BC
    /// (year -1) and AUC 754 maps to 1 AD.
    pub fn from_auc_ymd_opt(year: i16, month: u8, day: u8) -> Option<Self> {
        let year = auc_to_ad(i32::from(year));
        i16::try_from(year)
            .ok()
            .and_then(|year| Self::from_ymd_opt(year, month, day))
    }

    fn from_days(days: i32) -> Option<Self> {
        i16::try_from(days.div_euclid(365)).ok()?;
        Some(Date { days })
    }

    /// Parses a string in the `Y.M.D` game format. Years may be negative.
    ///
    /// ```
    /// use rome_loader::common::Date;
    /// let date = Date::parse("867.1.1").expect("to parse date");
    /// assert_eq!((date.year(), date.month(), date.day()), (867, 1, 1));
    /// assert!(Date::parse("867.2.30").is_err());
    /// ```
    pub fn parse<T: AsRef<[u8]>>(s: T) -> Result<Self, DateError> {
        let (year, month, day) = parse_components(s.as_ref()).ok_or(DateError)?;
        Self::from_ymd_opt(year, month, day).ok_or(DateError)
    }

    /// Parses a founding-era (AUC) date string and converts it to the
    /// common era.
    ///
    /// ```
    /// use rome_loader::common::Date;
    /// let date = Date::parse_auc("727.2.17").unwrap();
    /// assert_eq!(date, Date::from_ymd(-27, 2, 17));
    /// ```
    pub fn parse_auc<T: AsRef<[u8]>>(s: T) -> Result<Self, DateError> {
        let (year, month, day) = parse_components(s.as_ref()).ok_or(DateError)?;
        Self::from_auc_ymd_opt(year, month, day).ok_or(DateError)
    }

    /// Year of the date. Negative years are before the common era.
    pub fn year(&self) -> i16 {
        // from_days guarantees the year fits
        self.days.div_euclid(365) as i16
    }

    /// Month of the date. Range: [1, 12]
    pub fn month(&self) -> u8 {
        month_day_from_ordinal(self.days.rem_euclid(365)).0
    }

    /// Day of the month
    pub fn day(&self) -> u8 {
        month_day_from_ordinal(self.days.rem_euclid(365)).1
    }

    /// Returns the number of days between two dates
    ///
    /// ```
    /// use rome_loader::common::Date;
    /// let date = Date::parse("1400.1.2").unwrap();
    /// let date2 = Date::parse("1401.1.2").unwrap();
    /// assert_eq!(365, date.days_until(&date2));
    /// assert_eq!(-365, date2.days_until(&date));
    /// ```
    pub fn days_until(self, other: &Date) -> i32 {
        other.days - self.days
    }

    /// Return a new date that is the given number of days away, or `None` if
    /// the result is out of range
    ///
    /// ```
    /// use rome_loader::common::Date;
    /// let date = Date::parse("-1.12.31").unwrap();
    /// assert_eq!(date.checked_add_days(1), Some(Date::from_ymd(0, 1, 1)));
    /// ```
    pub fn checked_add_days(self, days: i32) -> Option<Date> {
        self.days.checked_add(days).and_then(Self::from_days)
    }

    /// Formats a date in the game format: Y.M.D
    pub fn game_fmt(&self) -> DateFormatter {
        DateFormatter {
            date: *self,
            format: DateFormat::DotShort,
        }
    }

    /// Formats a date in the ISO 8601 format: YYYY-MM-DD
    ///
    /// ```
    /// use rome_loader::common::Date;
    /// let date = Date::from_ymd(1400, 1, 2);
    /// assert_eq!(date.iso_8601().to_string(), String::from("1400-01-02"));
    /// ```
    pub fn iso_8601(&self) -> DateFormatter {
        DateFormatter {
            date: *self,
            format: DateFormat::Iso8601,
        }
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.game_fmt(), f)
    }
}

impl FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

/// Which calendar era dates in a given file are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// Founding-era years, as written in Imperator saves
    Auc,

    /// Common-era years
    Ad,
}

impl Calendar {
    /// Parse a `Y.M.D` date written in this calendar
    pub fn parse<T: AsRef<[u8]>>(&self, s: T) -> Result<Date, DateError> {
        match self {
            Calendar::Auc => Date::parse_auc(s),
            Calendar::Ad => Date::parse(s),
        }
    }
}

/// Returns true if the data has the shape of a `Y.M.D` date. Useful to
/// pick out dated history blocks from ordinary keys.
pub fn is_date_like(data: &[u8]) -> bool {
    parse_components(data).is_some()
}

fn auc_to_ad(year: i32) -> i32 {
    let year = year - AUC_OFFSET;
    if year <= 0 {
        year - 1
    } else {
        year
    }
}

fn parse_components(data: &[u8]) -> Option<(i16, u8, u8)> {
    let (negative, data) = match data {
        [b'-', rest @ ..] => (true, rest),
        _ => (false, data),
    };

    let mut parts = data.split(|&x| x == b'.');
    let year = parse_part(parts.next()?)?;
    let month = parse_part(parts.next()?)?;
    let day = parse_part(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }

    let year = i16::try_from(year).ok()?;
    let year = if negative { -year } else { year };
    Some((year, u8::try_from(month).ok()?, u8::try_from(day).ok()?))
}

fn parse_part(data: &[u8]) -> Option<u32> {
    if data.is_empty() || data.len() > 5 || !data.iter().all(u8::is_ascii_digit) {
        return None;
    }

    Some(
        data.iter()
            .fold(0u32, |acc, &x| acc * 10 + u32::from(x - b'0')),
    )
}

fn month_day_from_ordinal(ordinal: i32) -> (u8, u8) {
    debug_assert!((0..365).contains(&ordinal));
    let month = MONTH_START
        .iter()
        .rposition(|&start| start <= ordinal)
        .unwrap_or(1)
        .max(1);
    let day = ordinal - MONTH_START[month] + 1;
    (month as u8, day as u8)
}

#[cfg(feature = "derive")]
mod datederive {
    use super::Date;
    use serde::{de, de::Visitor, Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    impl Serialize for Date {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(&self.game_fmt())
        }
    }

    struct DateVisitor;

    impl<'de> Visitor<'de> for DateVisitor {
        type Value = Date;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a date")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Date::parse(v).map_err(|_e| de::Error::custom(format!("invalid date: {}", v)))
        }
    }

    impl<'de> Deserialize<'de> for Date {
        fn deserialize<D>(deserializer: D) -> Result<Date, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_str(DateVisitor)
        }
    }
}

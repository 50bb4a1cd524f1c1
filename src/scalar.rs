use std::borrow::Cow;
use std::error;
use std::fmt;

/// An error that can occur when converting a scalar into the requested type.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarError {
    /// The given string did not contain only numbers
    AllDigits(String),

    /// The given string caused an overflow when calculating its numerical value
    Overflow(String),

    /// The given string was not a recognized boolean value
    InvalidBool(String),

    /// The given string was not a decimal number
    InvalidFloat(String),
}

impl fmt::Display for ScalarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScalarError::AllDigits(x) => write!(f, "did not contain all digits: {}", x),
            ScalarError::InvalidBool(x) => write!(f, "is not a valid bool: {}", x),
            ScalarError::Overflow(x) => write!(f, "caused an overflow: {}", x),
            ScalarError::InvalidFloat(x) => write!(f, "is not a valid decimal: {}", x),
        }
    }
}

impl error::Error for ScalarError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

/// A single value lifted from script text.
///
/// Save files are UTF-8 while older game files are windows-1252, so the
/// scalar keeps the raw bytes and only decides on an encoding when it is
/// converted to a string.
///
/// ```
/// use rome_loader::Scalar;
///
/// let v1 = Scalar::new(b"a");
/// assert_eq!(v1.to_utf8(), "a");
/// ```
#[derive(PartialEq, Eq, Copy, Clone, Hash)]
pub struct Scalar<'a> {
    data: &'a [u8],
}

impl<'a> Scalar<'a> {
    /// Create a new scalar backed by the byte slice
    pub fn new(data: &'a [u8]) -> Scalar<'a> {
        Scalar { data }
    }

    /// View the underlying bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Try converting the scalar to f64
    ///
    /// ```
    /// use rome_loader::Scalar;
    /// assert_eq!(Scalar::new(b"-10.5").to_f64(), Ok(-10.5));
    /// assert!(Scalar::new(b"roman").to_f64().is_err());
    /// ```
    pub fn to_f64(&self) -> Result<f64, ScalarError> {
        to_f64(self.data)
    }

    /// Try converting the scalar to a boolean (`yes` / `no`)
    pub fn to_bool(&self) -> Result<bool, ScalarError> {
        match self.data {
            b"yes" => Ok(true),
            b"no" => Ok(false),
            x => Err(ScalarError::InvalidBool(to_utf8_owned(x))),
        }
    }

    /// Try converting the scalar to i64
    pub fn to_i64(&self) -> Result<i64, ScalarError> {
        to_i64(self.data)
    }

    /// Try converting the scalar to u64
    ///
    /// ```
    /// use rome_loader::Scalar;
    /// assert_eq!(Scalar::new(b"1444").to_u64(), Ok(1444));
    /// assert!(Scalar::new(b"-1").to_u64().is_err());
    /// ```
    pub fn to_u64(&self) -> Result<u64, ScalarError> {
        to_u64(self.data)
    }

    /// Convert scalar data into utf8. Data that is not already utf8 is
    /// interpreted as windows-1252, which allocates.
    ///
    /// ```
    /// use rome_loader::Scalar;
    ///
    /// let v1 = Scalar::new("Jåhkåmåhkke".as_bytes());
    /// assert_eq!(v1.to_utf8(), "Jåhkåmåhkke");
    ///
    /// let v2 = Scalar::new(&[255][..]);
    /// assert_eq!(v2.to_utf8(), "ÿ");
    /// ```
    pub fn to_utf8(&self) -> Cow<'a, str> {
        to_utf8(self.data)
    }

    /// Convert scalar data into an owned string
    pub fn to_utf8_owned(&self) -> String {
        to_utf8_owned(self.data)
    }

    /// Returns if the scalar contains only ascii values
    pub fn is_ascii(&self) -> bool {
        self.data.is_ascii()
    }

    /// Returns the data with `\"` and `\\` escape sequences collapsed
    ///
    /// ```
    /// use rome_loader::Scalar;
    /// let s = Scalar::new(br#"\"jolly\" john"#);
    /// assert_eq!(&*s.unescaped(), br#""jolly" john"#);
    /// ```
    pub fn unescaped(&self) -> Cow<'a, [u8]> {
        if !self.data.contains(&b'\\') {
            return Cow::Borrowed(self.data);
        }

        let mut result = Vec::with_capacity(self.data.len());
        let mut iter = self.data.iter();
        while let Some(&b) = iter.next() {
            if b == b'\\' {
                match iter.next() {
                    Some(&escaped) => result.push(escaped),
                    None => result.push(b),
                }
            } else {
                result.push(b);
            }
        }
        Cow::Owned(result)
    }
}

impl<'a> fmt::Debug for Scalar<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar {{ {} }}", self)
    }
}

impl<'a> fmt::Display for Scalar<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_utf8())
    }
}

#[inline]
fn to_utf8_owned(d: &[u8]) -> String {
    to_utf8(d).into_owned()
}

#[inline]
pub(crate) fn to_utf8(d: &[u8]) -> Cow<str> {
    match std::str::from_utf8(d) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(to_windows_1252(d)),
    }
}

#[inline]
fn to_windows_1252(d: &[u8]) -> String {
    d.iter()
        .map(|&x| crate::data::WINDOWS_1252[usize::from(x)])
        .collect()
}

#[inline]
fn to_u64(d: &[u8]) -> Result<u64, ScalarError> {
    if d.is_empty() {
        return Err(ScalarError::AllDigits(to_utf8_owned(d)));
    }

    let mut result: u64 = 0;
    for &x in d {
        if !x.is_ascii_digit() {
            return Err(ScalarError::AllDigits(to_utf8_owned(d)));
        }

        result = result
            .checked_mul(10)
            .and_then(|acc| acc.checked_add(u64::from(x - b'0')))
            .ok_or_else(|| ScalarError::Overflow(to_utf8_owned(d)))?;
    }

    Ok(result)
}

#[inline]
fn to_i64(d: &[u8]) -> Result<i64, ScalarError> {
    let (negative, digits) = match d {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        _ => (false, d),
    };

    let magnitude = to_u64(digits).map_err(|e| match e {
        ScalarError::AllDigits(_) => ScalarError::AllDigits(to_utf8_owned(d)),
        _ => ScalarError::Overflow(to_utf8_owned(d)),
    })?;

    if negative {
        0i64.checked_sub_unsigned(magnitude)
            .ok_or_else(|| ScalarError::Overflow(to_utf8_owned(d)))
    } else {
        i64::try_from(magnitude).map_err(|_| ScalarError::Overflow(to_utf8_owned(d)))
    }
}

#[inline]
fn to_f64(d: &[u8]) -> Result<f64, ScalarError> {
    match d.iter().position(|&x| x == b'.') {
        None => to_i64(d).map(|x| x as f64),
        Some(_) if !is_number(d) => Err(ScalarError::InvalidFloat(to_utf8_owned(d))),
        Some(_) => std::str::from_utf8(d)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| ScalarError::InvalidFloat(to_utf8_owned(d))),
    }
}

/// Returns true for an optionally signed run of digits with at most one
/// interior decimal point
pub(crate) fn is_number(d: &[u8]) -> bool {
    let digits = match d {
        [b'-', rest @ ..] | [b'+', rest @ ..] => rest,
        _ => d,
    };

    let mut parts = digits.splitn(2, |&x| x == b'.');
    let lead = parts.next().unwrap_or_default();
    let all_digits = |x: &[u8]| !x.is_empty() && x.iter().all(u8::is_ascii_digit);
    match parts.next() {
        None => all_digits(lead),
        Some(trail) => all_digits(lead) && all_digits(trail),
    }
}

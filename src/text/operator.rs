use std::fmt::Display;

/// An operator token that sits between a key and its value.
///
/// Nearly every binding in save and script files uses [`Operator::Equal`].
/// The comparison operators only show up in trigger blocks of game scripts.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Operator {
    /// A `<` token
    LessThan,

    /// A `<=` token
    LessThanEqual,

    /// A `>` token
    GreaterThan,

    /// A `>=` token
    GreaterThanEqual,

    /// A `!=` token
    NotEqual,

    /// A `==` token
    Exact,

    /// A `=` token
    Equal,

    /// A `?=` token
    Exists,
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Operator {
    /// Returns how the operator is written
    ///
    /// ```
    /// use rome_loader::text::Operator;
    /// assert_eq!(Operator::LessThanEqual.symbol(), "<=");
    /// assert_eq!(Operator::Equal.symbol(), "=");
    /// assert_eq!(Operator::Exists.symbol(), "?=");
    /// ```
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::LessThan => "<",
            Operator::LessThanEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanEqual => ">=",
            Operator::Exact => "==",
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Exists => "?=",
        }
    }

    /// Decode the operator at the start of the data. Returns the operator and
    /// how many bytes it spans.
    pub(crate) fn lex(data: &[u8]) -> Option<(Operator, usize)> {
        match data {
            [b'=', b'=', ..] => Some((Operator::Exact, 2)),
            [b'=', ..] => Some((Operator::Equal, 1)),
            [b'<', b'=', ..] => Some((Operator::LessThanEqual, 2)),
            [b'<', ..] => Some((Operator::LessThan, 1)),
            [b'>', b'=', ..] => Some((Operator::GreaterThanEqual, 2)),
            [b'>', ..] => Some((Operator::GreaterThan, 1)),
            [b'!', b'=', ..] => Some((Operator::NotEqual, 2)),
            [b'?', b'=', ..] => Some((Operator::Exists, 2)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(b"=", Operator::Equal, 1)]
    #[case(b"==", Operator::Exact, 2)]
    #[case(b"=={", Operator::Exact, 2)]
    #[case(b"<", Operator::LessThan, 1)]
    #[case(b"<=", Operator::LessThanEqual, 2)]
    #[case(b">5", Operator::GreaterThan, 1)]
    #[case(b">=", Operator::GreaterThanEqual, 2)]
    #[case(b"!=", Operator::NotEqual, 2)]
    #[case(b"?=", Operator::Exists, 2)]
    fn test_operator_lex(#[case] input: &[u8], #[case] op: Operator, #[case] len: usize) {
        assert_eq!(Operator::lex(input), Some((op, len)));
        assert_eq!(op.symbol().len(), len);
    }

    #[rstest]
    #[case(b"!")]
    #[case(b"?")]
    #[case(b"")]
    #[case(b"a")]
    fn test_operator_lex_none(#[case] input: &[u8]) {
        assert_eq!(Operator::lex(input), None);
    }
}

use super::Operator;
use crate::data::{is_boundary, is_unknown, is_whitespace};
use crate::scalar::is_number;
use crate::Scalar;
use std::fmt;
use tracing::warn;

/// Location of a token in the source text. Lines and columns are zero based.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Position {
    /// Byte offset from the start of the input
    pub offset: usize,

    /// Line number
    pub line: usize,

    /// Byte column within the line
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line + 1, self.column + 1)
    }
}

/// What a token is
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind<'a> {
    /// A `{`
    Open,

    /// A `}`
    Close,

    /// An operator between key and value
    Operator(Operator),

    /// An unquoted identifier
    Bare(Scalar<'a>),

    /// An unquoted number with an optional sign and at most one decimal point
    Number(Scalar<'a>),

    /// The contents of a double quoted string. Escapes are left intact.
    Quoted(Scalar<'a>),
}

impl<'a> TokenKind<'a> {
    /// Returns the scalar for identifier, number, and quoted tokens
    #[inline]
    pub fn as_scalar(&self) -> Option<Scalar<'a>> {
        match self {
            TokenKind::Bare(s) | TokenKind::Number(s) | TokenKind::Quoted(s) => Some(*s),
            _ => None,
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Open => String::from("{"),
            TokenKind::Close => String::from("}"),
            TokenKind::Operator(op) => String::from(op.symbol()),
            TokenKind::Bare(s) | TokenKind::Number(s) => s.to_utf8_owned(),
            TokenKind::Quoted(s) => format!("\"{}\"", s),
        }
    }
}

/// A lexed token and where it starts
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub position: Position,
}

/// Splits script text into tokens.
///
/// The lexer never fails. Bytes that can't start a token are skipped with a
/// warning and an unterminated quote swallows the rest of the input.
///
/// ```
/// use rome_loader::text::{Lexer, TokenKind, Operator};
/// use rome_loader::Scalar;
/// let kinds: Vec<_> = Lexer::new(b"a = { 1 }").map(|t| t.kind).collect();
/// assert_eq!(kinds, vec![
///     TokenKind::Bare(Scalar::new(b"a")),
///     TokenKind::Operator(Operator::Equal),
///     TokenKind::Open,
///     TokenKind::Number(Scalar::new(b"1")),
///     TokenKind::Close,
/// ]);
/// ```
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    data: &'a [u8],
    position: Position,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over the data. A leading UTF-8 byte order mark is skipped.
    pub fn new(data: &'a [u8]) -> Self {
        let offset = if data.starts_with(b"\xef\xbb\xbf") { 3 } else { 0 };
        Lexer {
            data,
            position: Position {
                offset,
                line: 0,
                column: 0,
            },
        }
    }

    /// The position of the next byte to be read
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    fn rest(&self) -> &'a [u8] {
        &self.data[self.position.offset..]
    }

    #[inline]
    fn bump(&mut self, amt: usize) {
        let end = self.position.offset + amt;
        for &b in &self.data[self.position.offset..end] {
            if b == b'\n' {
                self.position.line += 1;
                self.position.column = 0;
            } else {
                self.position.column += 1;
            }
        }
        self.position.offset = end;
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let rest = self.rest();
            let ws = rest.iter().take_while(|&&b| is_whitespace(b)).count();
            self.bump(ws);

            if self.rest().first() != Some(&b'#') {
                return;
            }

            let comment = self
                .rest()
                .iter()
                .position(|&b| b == b'\n')
                .unwrap_or(self.rest().len());
            self.bump(comment);
        }
    }

    fn skip_unknown(&mut self) {
        let start = self.position;
        let data = self.data;
        let mut end = start.offset;
        while end < data.len() {
            let b = data[end];
            let lone_operator = matches!(b, b'!' | b'?') && Operator::lex(&data[end..]).is_none();
            if !is_unknown(b) && !lone_operator {
                break;
            }
            end += 1;
        }

        let skipped = end - start.offset;
        warn!(
            "skipping {} unknown character(s) at {}: {:?}",
            skipped,
            start,
            crate::scalar::to_utf8(&data[start.offset..end])
        );
        self.bump(skipped);
    }

    fn lex_quoted(&mut self, start: Position) -> Token<'a> {
        let data = &self.rest()[1..];
        let mut i = 0;
        while i < data.len() {
            match data[i] {
                b'\\' => i += 2,
                b'"' => {
                    self.bump(i + 2);
                    return Token {
                        kind: TokenKind::Quoted(Scalar::new(&data[..i])),
                        position: start,
                    };
                }
                _ => i += 1,
            }
        }

        warn!("unterminated quote starting at {}", start);
        self.bump(data.len() + 1);
        Token {
            kind: TokenKind::Quoted(Scalar::new(data)),
            position: start,
        }
    }

    fn lex_bare(&mut self, start: Position) -> Token<'a> {
        let rest = self.rest();
        let len = rest.iter().position(|&b| is_boundary(b)).unwrap_or(rest.len());
        let text = &rest[..len];
        self.bump(len);
        let scalar = Scalar::new(text);
        let kind = if is_number(text) {
            TokenKind::Number(scalar)
        } else {
            TokenKind::Bare(scalar)
        };

        Token {
            kind,
            position: start,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.skip_whitespace_and_comments();
            let start = self.position;
            let rest = self.rest();
            let b = *rest.first()?;
            let kind = match b {
                b'{' => TokenKind::Open,
                b'}' => TokenKind::Close,
                b'"' => return Some(self.lex_quoted(start)),
                b'=' | b'<' | b'>' | b'!' | b'?' => match Operator::lex(rest) {
                    Some((op, len)) => {
                        self.bump(len);
                        return Some(Token {
                            kind: TokenKind::Operator(op),
                            position: start,
                        });
                    }
                    None => {
                        self.skip_unknown();
                        continue;
                    }
                },
                x if is_unknown(x) => {
                    self.skip_unknown();
                    continue;
                }
                _ => return Some(self.lex_bare(start)),
            };

            self.bump(1);
            return Some(Token {
                kind,
                position: start,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use rstest::*;

    fn kinds(data: &[u8]) -> Vec<TokenKind> {
        Lexer::new(data).map(|t| t.kind).collect()
    }

    fn bare(s: &[u8]) -> TokenKind {
        TokenKind::Bare(Scalar::new(s))
    }

    fn num(s: &[u8]) -> TokenKind {
        TokenKind::Number(Scalar::new(s))
    }

    fn quoted(s: &[u8]) -> TokenKind {
        TokenKind::Quoted(Scalar::new(s))
    }

    const EQ: TokenKind<'static> = TokenKind::Operator(Operator::Equal);

    #[test]
    fn test_simple_event() {
        assert_eq!(kinds(b"foo=bar"), vec![bare(b"foo"), EQ, bare(b"bar")]);
    }

    #[test]
    fn test_nested_scope() {
        assert_eq!(
            kinds(b"c = { d = 2 }"),
            vec![
                bare(b"c"),
                EQ,
                TokenKind::Open,
                bare(b"d"),
                EQ,
                num(b"2"),
                TokenKind::Close
            ]
        );
    }

    #[rstest]
    #[case(b"10", true)]
    #[case(b"-10.5", true)]
    #[case(b"450.10.1", false)]
    #[case(b"ROM", false)]
    #[case(b"1e5", false)]
    fn test_numbers(#[case] input: &[u8], #[case] is_num: bool) {
        let expected = if is_num { num(input) } else { bare(input) };
        assert_eq!(kinds(input), vec![expected]);
    }

    #[test]
    fn test_quoted_with_escapes() {
        assert_eq!(
            kinds(br#"name = "the \"great\" \\ one""#),
            vec![bare(b"name"), EQ, quoted(br#"the \"great\" \\ one"#)]
        );
    }

    #[test]
    fn test_quoted_spans_lines() {
        let tokens: Vec<_> = Lexer::new(b"a = \"x\ny\" b").collect();
        assert_eq!(tokens[2].kind, quoted(b"x\ny"));
        assert_eq!(tokens[3].kind, bare(b"b"));
        assert_eq!(tokens[3].position.line, 1);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(kinds(b"a = \"open"), vec![bare(b"a"), EQ, quoted(b"open")]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds(b"# header\na = 1 # trailing { \n# last"),
            vec![bare(b"a"), EQ, num(b"1")]
        );
    }

    #[test]
    fn test_bom_is_skipped() {
        assert_eq!(kinds(b"\xef\xbb\xbfa=b"), vec![bare(b"a"), EQ, bare(b"b")]);
    }

    #[rstest]
    #[case(b"a [ b", vec![bare(b"a"), bare(b"b")])]
    #[case(b"a\x01\x02b", vec![bare(b"a"), bare(b"b")])]
    #[case(b"! a ?", vec![bare(b"a")])]
    #[case(b"a != b", vec![bare(b"a"), TokenKind::Operator(Operator::NotEqual), bare(b"b")])]
    #[case(b"a ?= b", vec![bare(b"a"), TokenKind::Operator(Operator::Exists), bare(b"b")])]
    fn test_unknown_characters(#[case] input: &[u8], #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(input), expected);
    }

    #[rstest]
    #[case(b"a<=b", Operator::LessThanEqual)]
    #[case(b"a>=b", Operator::GreaterThanEqual)]
    #[case(b"a<b", Operator::LessThan)]
    #[case(b"a>b", Operator::GreaterThan)]
    #[case(b"a==b", Operator::Exact)]
    fn test_operators(#[case] input: &[u8], #[case] op: Operator) {
        assert_eq!(
            kinds(input),
            vec![bare(b"a"), TokenKind::Operator(op), bare(b"b")]
        );
    }

    #[test]
    fn test_semicolon_whitespace() {
        assert_eq!(kinds(b"a=1;b=2"), vec![bare(b"a"), EQ, num(b"1"), bare(b"b"), EQ, num(b"2")]);
    }

    #[test]
    fn test_positions() {
        let tokens: Vec<_> = Lexer::new(b"a = 1\n  b = { }").collect();
        let positions: Vec<_> = tokens
            .iter()
            .map(|t| (t.position.line, t.position.column))
            .collect();
        assert_eq!(positions, vec![(0, 0), (0, 2), (0, 4), (1, 2), (1, 4), (1, 6), (1, 8)]);
        assert_eq!(tokens[3].position.offset, 8);
    }

    #[quickcheck]
    fn lexer_terminates_with_increasing_offsets(data: Vec<u8>) -> bool {
        let offsets: Vec<_> = Lexer::new(&data).map(|t| t.position.offset).collect();
        offsets.windows(2).all(|w| w[0] < w[1]) && offsets.len() <= data.len()
    }
}

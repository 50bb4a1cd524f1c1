use super::{Lexer, Position, Token, TokenKind};
use crate::common::{Calendar, Date};
use crate::errors::{Error, ErrorKind};
use crate::{GameVersion, Scalar};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// A token stream with one token of lookahead
#[derive(Debug, Clone)]
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Option<Token<'a>>>,
}

impl<'a> TokenStream<'a> {
    /// Create a token stream over script text
    pub fn new(data: &'a [u8]) -> Self {
        TokenStream {
            lexer: Lexer::new(data),
            peeked: None,
        }
    }

    fn peek(&mut self) -> Option<&Token<'a>> {
        let lexer = &mut self.lexer;
        self.peeked.get_or_insert_with(|| lexer.next()).as_ref()
    }

    fn next(&mut self) -> Option<Token<'a>> {
        match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next(),
        }
    }

    /// Position of the next unread token
    pub fn position(&self) -> Position {
        match &self.peeked {
            Some(Some(token)) => token.position,
            _ => self.lexer.position(),
        }
    }
}

/// A cursor over one brace delimited region of a token stream.
///
/// The root scope ends at the end of input while a nested scope ends at its
/// matching `}`. A nested scope that runs out of input is an error.
#[derive(Debug)]
pub struct Scope<'s, 'a> {
    stream: &'s mut TokenStream<'a>,
    nested: bool,
    closed: bool,
    opened_at: Position,
}

impl<'s, 'a> Scope<'s, 'a> {
    /// The top level scope of a stream
    pub fn root(stream: &'s mut TokenStream<'a>) -> Self {
        let opened_at = stream.position();
        Scope {
            stream,
            nested: false,
            closed: false,
            opened_at,
        }
    }

    fn enter(&mut self, opened_at: Position) -> Scope<'_, 'a> {
        Scope {
            stream: self.stream,
            nested: true,
            closed: false,
            opened_at,
        }
    }

    /// Where the scope was opened
    pub fn opened_at(&self) -> Position {
        self.opened_at
    }

    /// Returns true once the scope has been read to its end
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn eof(&self) -> Error {
        Error::new(ErrorKind::Eof {
            position: self.opened_at,
        })
    }

    /// Next raw token in this scope. `None` marks the end of the scope.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, Error> {
        while !self.closed {
            match self.stream.next() {
                None if self.nested => return Err(self.eof()),
                None => self.closed = true,
                Some(Token {
                    kind: TokenKind::Close,
                    position,
                }) => {
                    if self.nested {
                        self.closed = true;
                    } else {
                        warn!("skipping stray closing brace at {}", position);
                    }
                }
                Some(token) => return Ok(Some(token)),
            }
        }

        Ok(None)
    }

    /// Look at the next token without consuming it. Closing braces are
    /// reported as is.
    pub fn peek_token(&mut self) -> Option<&Token<'a>> {
        if self.closed {
            None
        } else {
            self.stream.peek()
        }
    }

    /// Consume everything up to and including the matching close
    pub fn skip_rest(&mut self) -> Result<(), Error> {
        let mut depth = 0usize;
        while !self.closed {
            match self.stream.next().map(|t| t.kind) {
                None if self.nested => return Err(self.eof()),
                None => self.closed = true,
                Some(TokenKind::Open) => depth += 1,
                Some(TokenKind::Close) if depth > 0 => depth -= 1,
                Some(TokenKind::Close) if self.nested => self.closed = true,
                Some(TokenKind::Close) => warn!("skipping stray closing brace"),
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// The key of a dispatched item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key<'a> {
    scalar: Scalar<'a>,
    quoted: bool,
    position: Position,
}

impl<'a> Key<'a> {
    /// The raw key
    pub fn as_scalar(&self) -> Scalar<'a> {
        self.scalar
    }

    /// The key as text
    pub fn text(&self) -> Cow<'a, str> {
        self.scalar.to_utf8()
    }

    /// Returns true if the key was written in quotes
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Where the key starts
    pub fn position(&self) -> Position {
        self.position
    }

    /// Interpret the key as a numeric ID
    pub fn read_u64(&self) -> Result<u64, Error> {
        self.scalar.to_u64().map_err(|source| {
            Error::new(ErrorKind::Scalar {
                position: self.position,
                source,
            })
        })
    }

    /// Interpret the key as a date, as in dated history blocks
    pub fn read_date(&self, calendar: Calendar) -> Result<Date, Error> {
        calendar.parse(self.scalar.as_bytes()).map_err(|source| {
            Error::new(ErrorKind::Date {
                position: self.position,
                source,
            })
        })
    }
}

#[derive(Debug)]
enum Value<'v, 'a> {
    Absent,
    Scalar(Token<'a>),
    Scope {
        header: Option<Scalar<'a>>,
        scope: Scope<'v, 'a>,
    },
}

/// A cursor positioned on the value of a dispatched item.
///
/// A value is a scalar (`a = 1`), a scope (`a = { .. }`), a header scope
/// (`color = rgb { .. }`), or absent for items without an operator such as
/// the entries of `{ 1 2 3 }`. Whatever a handler leaves unread is skipped
/// once the handler returns.
#[derive(Debug)]
pub struct ValueReader<'v, 'a> {
    value: Value<'v, 'a>,
    position: Position,
}

impl<'v, 'a> ValueReader<'v, 'a> {
    /// Where the value (or the key of an absent value) starts
    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns true for `{ .. }` values
    pub fn is_scope(&self) -> bool {
        matches!(self.value, Value::Scope { .. })
    }

    /// Returns true when the key had no value
    pub fn is_absent(&self) -> bool {
        matches!(self.value, Value::Absent)
    }

    /// The identifier in front of a header scope like `rgb { .. }`
    pub fn header(&self) -> Option<Scalar<'a>> {
        match self.value {
            Value::Scope { header, .. } => header,
            _ => None,
        }
    }

    fn unexpected(&self, expected: &'static str) -> Error {
        let found = match &self.value {
            Value::Absent => String::from("nothing"),
            Value::Scalar(token) => token.kind.describe(),
            Value::Scope { .. } => String::from("{"),
        };

        Error::new(ErrorKind::UnexpectedToken {
            position: self.position,
            expected,
            found,
        })
    }

    fn scalar_error(&self, source: crate::ScalarError) -> Error {
        Error::new(ErrorKind::Scalar {
            position: self.position,
            source,
        })
    }

    /// The raw scalar value. Quoted values keep their escapes.
    pub fn read_scalar(&self) -> Result<Scalar<'a>, Error> {
        match self.value {
            Value::Scalar(token) => token
                .kind
                .as_scalar()
                .ok_or_else(|| self.unexpected("a scalar")),
            _ => Err(self.unexpected("a scalar")),
        }
    }

    /// Read the value as text. Quoted values are unescaped.
    pub fn read_string(&self) -> Result<String, Error> {
        match self.value {
            Value::Scalar(Token {
                kind: TokenKind::Quoted(s),
                ..
            }) => Ok(crate::scalar::to_utf8(&s.unescaped()).into_owned()),
            _ => self.read_scalar().map(|x| x.to_utf8_owned()),
        }
    }

    /// Read the value as an unsigned integer
    pub fn read_u64(&self) -> Result<u64, Error> {
        let scalar = self.read_scalar()?;
        scalar.to_u64().map_err(|e| self.scalar_error(e))
    }

    /// Read the value as a signed integer
    pub fn read_i64(&self) -> Result<i64, Error> {
        let scalar = self.read_scalar()?;
        scalar.to_i64().map_err(|e| self.scalar_error(e))
    }

    /// Read the value as a decimal
    pub fn read_f64(&self) -> Result<f64, Error> {
        let scalar = self.read_scalar()?;
        scalar.to_f64().map_err(|e| self.scalar_error(e))
    }

    /// Read a `yes` / `no` value
    pub fn read_bool(&self) -> Result<bool, Error> {
        let scalar = self.read_scalar()?;
        scalar.to_bool().map_err(|e| self.scalar_error(e))
    }

    /// Read a common era date
    pub fn read_date(&self) -> Result<Date, Error> {
        self.read_calendar_date(Calendar::Ad)
    }

    /// Read a founding era (AUC) date
    pub fn read_auc_date(&self) -> Result<Date, Error> {
        self.read_calendar_date(Calendar::Auc)
    }

    /// Read a date written in the given calendar
    pub fn read_calendar_date(&self, calendar: Calendar) -> Result<Date, Error> {
        let scalar = self.read_scalar()?;
        calendar.parse(scalar.as_bytes()).map_err(|source| {
            Error::new(ErrorKind::Date {
                position: self.position,
                source,
            })
        })
    }

    /// Read a dotted game version
    pub fn read_version(&self) -> Result<GameVersion, Error> {
        let text = self.read_string()?;
        GameVersion::parse(&text).map_err(|source| {
            Error::new(ErrorKind::Version {
                position: self.position,
                source,
            })
        })
    }

    /// The nested scope, for handlers that dispatch with a parser of their own
    pub fn scope(&mut self) -> Result<&mut Scope<'v, 'a>, Error> {
        if !self.is_scope() {
            return Err(self.unexpected("{"));
        }

        match &mut self.value {
            Value::Scope { scope, .. } => Ok(scope),
            _ => unreachable!("checked above"),
        }
    }

    /// Read every scalar of a list value (`{ a "b" 3 }`). A lone scalar is
    /// read as a list of one.
    pub fn read_strings(&mut self) -> Result<Vec<String>, Error> {
        if !self.is_scope() {
            return self.read_string().map(|x| vec![x]);
        }

        let scope = self.scope()?;
        let mut result = Vec::new();
        while let Some(token) = scope.next_token()? {
            match token.kind {
                TokenKind::Quoted(s) => result.push(crate::scalar::to_utf8(&s.unescaped()).into_owned()),
                TokenKind::Bare(s) | TokenKind::Number(s) => result.push(s.to_utf8_owned()),
                kind => {
                    skip_nested(scope, &token)?;
                    return Err(Error::new(ErrorKind::UnexpectedToken {
                        position: token.position,
                        expected: "a list of scalars",
                        found: kind.describe(),
                    }))
                }
            }
        }

        Ok(result)
    }

    /// Read every entry of a list of IDs (`{ 1 2 3 }`)
    pub fn read_u64s(&mut self) -> Result<Vec<u64>, Error> {
        if !self.is_scope() {
            return self.read_u64().map(|x| vec![x]);
        }

        let scope = self.scope()?;
        let mut result = Vec::new();
        while let Some(token) = scope.next_token()? {
            let parsed = match token.kind {
                TokenKind::Number(s) | TokenKind::Bare(s) | TokenKind::Quoted(s) => s
                    .to_u64()
                    .map_err(|source| {
                        Error::new(ErrorKind::Scalar {
                            position: token.position,
                            source,
                        })
                    })?,
                kind => {
                    skip_nested(scope, &token)?;
                    return Err(Error::new(ErrorKind::UnexpectedToken {
                        position: token.position,
                        expected: "a list of ids",
                        found: kind.describe(),
                    }))
                }
            };
            result.push(parsed);
        }

        Ok(result)
    }

    /// Visit each anonymous object of a list value (`{ { .. } { .. } }`).
    /// Scalars between the objects are skipped.
    pub fn for_each_scope<F>(&mut self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&mut ValueReader<'_, 'a>) -> Result<(), Error>,
    {
        let scope = self.scope()?;
        while let Some(token) = scope.next_token()? {
            match token.kind {
                TokenKind::Open => {
                    let mut item = ValueReader {
                        value: Value::Scope {
                            header: None,
                            scope: scope.enter(token.position),
                        },
                        position: token.position,
                    };
                    f(&mut item)?;
                    item.finish()?;
                }
                kind => debug!("skipping {} in object list at {}", kind.describe(), token.position),
            }
        }

        Ok(())
    }

    /// Skip the rest of the value
    pub fn skip(&mut self) -> Result<(), Error> {
        match &mut self.value {
            Value::Scope { scope, .. } => scope.skip_rest(),
            _ => Ok(()),
        }
    }

    fn finish(mut self) -> Result<(), Error> {
        self.skip()
    }
}

/// What keys a handler is registered for
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Exactly this key
    Keyword(String),

    /// Any scalar key: bare, quoted, or numeric
    AnyString,

    /// Any unquoted key
    AnyBare,

    /// Any quoted key
    AnyQuoted,

    /// Keys made only of digits
    AnyUnsigned,

    /// Unquoted keys that are signed integers
    AnyInteger,

    /// Keys accepted by the function
    Predicate(fn(&str) -> bool),

    /// Every key no other registration matches
    CatchAll,
}

impl Pattern {
    fn matches(&self, key: &Key) -> bool {
        match self {
            Pattern::Keyword(k) => key.text() == k.as_str(),
            Pattern::AnyString => true,
            Pattern::AnyBare => !key.quoted,
            Pattern::AnyQuoted => key.quoted,
            Pattern::AnyUnsigned => !key.quoted && key.scalar.to_u64().is_ok(),
            Pattern::AnyInteger => !key.quoted && key.scalar.to_i64().is_ok(),
            Pattern::Predicate(f) => f(&key.text()),
            Pattern::CatchAll => true,
        }
    }
}

impl From<&str> for Pattern {
    fn from(keyword: &str) -> Self {
        Pattern::Keyword(String::from(keyword))
    }
}

impl From<String> for Pattern {
    fn from(keyword: String) -> Self {
        Pattern::Keyword(keyword)
    }
}

/// What to do with keys that match no registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "derive", derive(serde::Deserialize))]
#[cfg_attr(feature = "derive", serde(rename_all = "lowercase"))]
pub enum UnregisteredPolicy {
    /// Skip silently
    #[default]
    Ignore,

    /// Skip and emit a debug event
    Log,

    /// Skip and record the key in the returned [`IgnoredKeys`]
    Collect,
}

/// Keys that a parse skipped for lack of a handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredKeys {
    keys: BTreeSet<String>,
}

impl IgnoredKeys {
    /// Record a key
    pub fn insert(&mut self, key: String) {
        self.keys.insert(key);
    }

    /// Fold in the keys of another parse
    pub fn merge(&mut self, other: IgnoredKeys) {
        self.keys.extend(other.keys);
    }

    /// Returns true if the key was skipped
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Number of distinct skipped keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if nothing was skipped
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Skipped keys in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|x| x.as_str())
    }
}

type Handler<'h> = Box<dyn FnMut(&Key<'_>, &mut ValueReader<'_, '_>) -> Result<(), Error> + 'h>;

/// A keyword dispatch parser.
///
/// Handlers are registered per key and the parser walks a scope, handing
/// each item's value to the first matching handler. Exact keywords are
/// consulted first, then patterns in registration order, and finally the
/// catch-all. A parser runs once: `parse` consumes it so that registrations
/// never leak between scopes.
///
/// ```
/// use rome_loader::text::{Parser, Pattern};
/// use std::cell::RefCell;
///
/// let seen = RefCell::new(Vec::new());
/// let mut parser = Parser::new();
/// parser.register("a", |_key, value| {
///     seen.borrow_mut().push(value.read_u64()?);
///     Ok(())
/// });
/// parser.register(Pattern::AnyUnsigned, |key, _value| {
///     seen.borrow_mut().push(key.read_u64()? * 100);
///     Ok(())
/// });
/// parser.parse_slice(b"a = 1 2 = yes b = 3").unwrap();
/// assert_eq!(seen.into_inner(), vec![1, 200]);
/// ```
pub struct Parser<'h> {
    keywords: HashMap<String, Handler<'h>>,
    patterns: Vec<(Pattern, Handler<'h>)>,
    catch_all: Option<Handler<'h>>,
    policy: UnregisteredPolicy,
}

impl<'h> Default for Parser<'h> {
    fn default() -> Self {
        Parser::new()
    }
}

impl<'h> std::fmt::Debug for Parser<'h> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("keywords", &self.keywords.keys().collect::<Vec<_>>())
            .field(
                "patterns",
                &self.patterns.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            )
            .field("catch_all", &self.catch_all.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<'h> Parser<'h> {
    /// Create a parser without any registrations
    pub fn new() -> Self {
        Parser {
            keywords: HashMap::new(),
            patterns: Vec::new(),
            catch_all: None,
            policy: UnregisteredPolicy::default(),
        }
    }

    /// Create a parser that treats unregistered keys with the given policy
    pub fn with_policy(policy: UnregisteredPolicy) -> Self {
        Parser {
            policy,
            ..Parser::new()
        }
    }

    /// Set how keys without a handler are treated
    pub fn policy(&mut self, policy: UnregisteredPolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    /// Bind a handler to a pattern. A later handler for the same keyword
    /// replaces the earlier one.
    pub fn register<P, F>(&mut self, pattern: P, handler: F) -> &mut Self
    where
        P: Into<Pattern>,
        F: FnMut(&Key<'_>, &mut ValueReader<'_, '_>) -> Result<(), Error> + 'h,
    {
        let handler: Handler<'h> = Box::new(handler);
        match pattern.into() {
            Pattern::Keyword(keyword) => {
                self.keywords.insert(keyword, handler);
            }
            Pattern::CatchAll => self.catch_all = Some(handler),
            pattern => self.patterns.push((pattern, handler)),
        }
        self
    }

    /// Bind a handler to an exact keyword
    pub fn register_keyword<F>(&mut self, keyword: &str, handler: F) -> &mut Self
    where
        F: FnMut(&Key<'_>, &mut ValueReader<'_, '_>) -> Result<(), Error> + 'h,
    {
        self.register(keyword, handler)
    }

    /// Bind a handler for every key nothing else matches
    pub fn register_catch_all<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&Key<'_>, &mut ValueReader<'_, '_>) -> Result<(), Error> + 'h,
    {
        self.register(Pattern::CatchAll, handler)
    }

    fn handler_for(&mut self, key: &Key) -> Option<&mut Handler<'h>> {
        let text = key.text();
        if self.keywords.contains_key(text.as_ref()) {
            return self.keywords.get_mut(text.as_ref());
        }

        match self.patterns.iter().position(|(p, _)| p.matches(key)) {
            Some(idx) => Some(&mut self.patterns[idx].1),
            None => self.catch_all.as_mut(),
        }
    }

    /// Parse script text with the registered handlers
    pub fn parse_slice(self, data: &[u8]) -> Result<IgnoredKeys, Error> {
        let mut stream = TokenStream::new(data);
        let mut root = Scope::root(&mut stream);
        self.parse(&mut root)
    }

    /// Dispatch every item of the scope and consume the scope to its end
    pub fn parse(mut self, scope: &mut Scope<'_, '_>) -> Result<IgnoredKeys, Error> {
        let mut ignored = IgnoredKeys::default();
        while let Some(token) = scope.next_token()? {
            let (scalar, quoted) = match token.kind {
                TokenKind::Bare(s) | TokenKind::Number(s) => (s, false),
                TokenKind::Quoted(s) => (s, true),
                TokenKind::Operator(op) => {
                    warn!("skipping stray operator {} at {}", op, token.position);
                    continue;
                }
                TokenKind::Open => {
                    let mut anonymous = scope.enter(token.position);
                    anonymous.skip_rest()?;
                    self.unregistered("{...}", token.position, &mut ignored);
                    continue;
                }
                TokenKind::Close => continue,
            };

            let key = Key {
                scalar,
                quoted,
                position: token.position,
            };

            let mut value = read_value(scope, &key)?;
            match self.handler_for(&key) {
                Some(handler) => handler(&key, &mut value)?,
                None => self.unregistered(&key.text(), key.position, &mut ignored),
            }
            value.finish()?;
        }

        Ok(ignored)
    }

    fn unregistered(&self, key: &str, position: Position, ignored: &mut IgnoredKeys) {
        match self.policy {
            UnregisteredPolicy::Ignore => {}
            UnregisteredPolicy::Log => debug!("ignoring unregistered key {} at {}", key, position),
            UnregisteredPolicy::Collect => ignored.insert(String::from(key)),
        }
    }
}

/// Consume the object a list reader stopped on so the list itself can still
/// be skipped to its end
fn skip_nested(scope: &mut Scope<'_, '_>, token: &Token<'_>) -> Result<(), Error> {
    match token.kind {
        TokenKind::Open => scope.enter(token.position).skip_rest(),
        _ => Ok(()),
    }
}

fn read_value<'v, 'a>(
    scope: &'v mut Scope<'_, 'a>,
    key: &Key<'a>,
) -> Result<ValueReader<'v, 'a>, Error> {
    let has_operator = matches!(
        scope.peek_token(),
        Some(Token {
            kind: TokenKind::Operator(_),
            ..
        })
    );

    if has_operator {
        scope.stream.next();
    }

    let next = scope.peek_token().copied();
    let value = match next {
        Some(Token {
            kind: TokenKind::Open,
            position,
        }) => {
            scope.stream.next();
            ValueReader {
                value: Value::Scope {
                    header: None,
                    scope: scope.enter(position),
                },
                position,
            }
        }
        Some(
            token @ Token {
                kind: TokenKind::Bare(_) | TokenKind::Number(_) | TokenKind::Quoted(_),
                ..
            },
        ) if has_operator => {
            scope.stream.next();
            let header = match token.kind {
                TokenKind::Bare(s) => Some(s),
                _ => None,
            };

            match (header, scope.peek_token().map(|t| (t.kind, t.position))) {
                (Some(header), Some((TokenKind::Open, position))) => {
                    scope.stream.next();
                    ValueReader {
                        value: Value::Scope {
                            header: Some(header),
                            scope: scope.enter(position),
                        },
                        position: token.position,
                    }
                }
                _ => ValueReader {
                    value: Value::Scalar(token),
                    position: token.position,
                },
            }
        }
        _ => ValueReader {
            value: Value::Absent,
            position: key.position,
        },
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::cell::RefCell;

    #[test]
    fn test_dispatch_nested() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register("a", |_, v| {
            calls.borrow_mut().push(format!("a={}", v.read_u64()?));
            Ok(())
        });
        parser.register("b", |_, v| {
            calls.borrow_mut().push(format!("b={}", v.read_string()?));
            Ok(())
        });
        parser.register("c", |_, v| {
            let mut inner = Parser::new();
            inner.register("d", |_, v| {
                calls.borrow_mut().push(format!("d={}", v.read_u64()?));
                Ok(())
            });
            inner.parse(v.scope()?)?;
            calls.borrow_mut().push(String::from("c"));
            Ok(())
        });

        parser
            .parse_slice(br#"a = 1 b = "x y" c = { d = 2 } "#)
            .unwrap();
        assert_eq!(calls.into_inner(), vec!["a=1", "b=x y", "d=2", "c"]);
    }

    #[test]
    fn test_unread_scope_is_skipped() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register("skipped", |_, _| Ok(()));
        parser.register("after", |_, v| {
            calls.borrow_mut().push(v.read_u64()?);
            Ok(())
        });

        parser
            .parse_slice(b"skipped = { a = { b = c } d = { } } after = 5")
            .unwrap();
        assert_eq!(calls.into_inner(), vec![5]);
    }

    #[test]
    fn test_keyword_before_pattern() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register(Pattern::AnyString, |k, _| {
            calls.borrow_mut().push(format!("any:{}", k.text()));
            Ok(())
        });
        parser.register("name", |_, _| {
            calls.borrow_mut().push(String::from("keyword"));
            Ok(())
        });
        parser.parse_slice(b"name = a other = b").unwrap();
        assert_eq!(calls.into_inner(), vec!["keyword", "any:other"]);
    }

    #[test]
    fn test_keyword_overwrite() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register("a", |_, _| {
            calls.borrow_mut().push(1);
            Ok(())
        });
        parser.register("a", |_, _| {
            calls.borrow_mut().push(2);
            Ok(())
        });
        parser.parse_slice(b"a = 1").unwrap();
        assert_eq!(calls.into_inner(), vec![2]);
    }

    #[test]
    fn test_patterns_in_registration_order() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register(Pattern::AnyUnsigned, |_, _| {
            calls.borrow_mut().push("unsigned");
            Ok(())
        });
        parser.register(Pattern::AnyInteger, |_, _| {
            calls.borrow_mut().push("integer");
            Ok(())
        });
        parser.register_catch_all(|_, _| {
            calls.borrow_mut().push("catch-all");
            Ok(())
        });
        parser.parse_slice(b"1 = a -1 = b \"1\" = c x = d").unwrap();
        assert_eq!(
            calls.into_inner(),
            vec!["unsigned", "integer", "catch-all", "catch-all"]
        );
    }

    #[test]
    fn test_predicate_pattern() {
        let count = RefCell::new(0);
        let mut parser = Parser::new();
        parser.register(Pattern::Predicate(|s| s.starts_with("SAV")), |_, _| {
            *count.borrow_mut() += 1;
            Ok(())
        });
        let ignored = {
            let mut parser = parser;
            parser.policy(UnregisteredPolicy::Collect);
            parser.parse_slice(b"SAV0102 = 1 SAVE = 2 other = 3").unwrap()
        };
        assert_eq!(count.into_inner(), 2);
        assert_eq!(ignored.iter().collect::<Vec<_>>(), vec!["other"]);
    }

    #[test]
    fn test_collect_policy() {
        let mut parser = Parser::new();
        parser.policy(UnregisteredPolicy::Collect);
        parser.register("known", |_, _| Ok(()));
        let ignored = parser
            .parse_slice(b"known = 1 unknown = { a = b } { 1 2 } unknown = 2")
            .unwrap();
        assert_eq!(ignored.len(), 2);
        assert!(ignored.contains("unknown"));
        assert!(ignored.contains("{...}"));
    }

    #[rstest]
    #[case(UnregisteredPolicy::Ignore, &[])]
    #[case(UnregisteredPolicy::Log, &[])]
    #[case(UnregisteredPolicy::Collect, &["b", "d"])]
    fn test_unregistered_policies(
        #[case] policy: UnregisteredPolicy,
        #[case] expected: &[&str],
    ) {
        let seen = RefCell::new(Vec::new());
        let mut parser = Parser::with_policy(policy);
        parser.register("a", |_, v| {
            seen.borrow_mut().push(v.read_u64()?);
            Ok(())
        });
        let ignored = parser.parse_slice(b"a = 1 b = { c } a = 2 d = 3").unwrap();
        assert_eq!(seen.into_inner(), vec![1, 2]);
        assert_eq!(ignored.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_absent_values() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register(Pattern::AnyUnsigned, |k, v| {
            assert!(v.is_absent());
            calls.borrow_mut().push(k.read_u64()?);
            Ok(())
        });
        parser.parse_slice(b"1 2 3").unwrap();
        assert_eq!(calls.into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn test_header_scope() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register("color", |_, v| {
            let header = v.header().map(|x| x.to_utf8_owned());
            calls.borrow_mut().push((header, v.read_u64s()?));
            Ok(())
        });
        parser.parse_slice(b"color = rgb { 10 20 30 } color = { 1 }").unwrap();
        assert_eq!(
            calls.into_inner(),
            vec![
                (Some(String::from("rgb")), vec![10, 20, 30]),
                (None, vec![1])
            ]
        );
    }

    #[test]
    fn test_rejected_list_is_skipped_whole() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register("ids", |_, v| {
            let err = v.read_u64s().unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::UnexpectedToken { .. }));
            Ok(())
        });
        parser.register("after", |_, v| {
            calls.borrow_mut().push(v.read_u64()?);
            Ok(())
        });
        parser
            .parse_slice(b"ids = { 1 { 2 { 3 } } 4 } after = 5")
            .unwrap();
        assert_eq!(calls.into_inner(), vec![5]);
    }

    #[test]
    fn test_scope_without_operator() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register("list", |_, v| {
            calls.borrow_mut().extend(v.read_strings()?);
            Ok(())
        });
        parser.parse_slice(br#"list { a "b c" 3 }"#).unwrap();
        assert_eq!(calls.into_inner(), vec!["a", "b c", "3"]);
    }

    #[test]
    fn test_for_each_scope() {
        let starts = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register("terms", |_, v| {
            v.for_each_scope(|item| {
                let mut inner = Parser::new();
                inner.register("start", |_, v| {
                    starts.borrow_mut().push(v.read_auc_date()?);
                    Ok(())
                });
                inner.parse(item.scope()?)?;
                Ok(())
            })
        });
        parser
            .parse_slice(b"terms = { { start = 450.1.1 x = { } } { start = \"451.1.1\" } }")
            .unwrap();
        assert_eq!(
            starts.into_inner(),
            vec![Date::from_ymd(-304, 1, 1), Date::from_ymd(-303, 1, 1)]
        );
    }

    #[test]
    fn test_handler_error_propagates() {
        let mut parser = Parser::new();
        parser.register("a", |_, v| v.read_u64().map(|_| ()));
        let err = parser.parse_slice(b"a = hello").unwrap_err();
        match err.kind() {
            ErrorKind::Scalar { position, .. } => assert_eq!(position.column, 4),
            kind => panic!("unexpected error: {:?}", kind),
        }
    }

    #[test]
    fn test_unclosed_scope_is_eof() {
        let mut parser = Parser::new();
        parser.register("a", |_, _| Ok(()));
        let err = parser.parse_slice(b"a = { b = 1").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Eof { .. }));
    }

    #[test]
    fn test_stray_tokens_are_skipped() {
        let calls = RefCell::new(Vec::new());
        let mut parser = Parser::new();
        parser.register("a", |_, v| {
            calls.borrow_mut().push(v.read_u64()?);
            Ok(())
        });
        parser.parse_slice(b"} a = 1 } = a = 2").unwrap();
        assert_eq!(calls.into_inner(), vec![1, 2]);
    }

    #[test]
    fn test_quoted_value_unescapes() {
        let name = RefCell::new(String::new());
        let mut parser = Parser::new();
        parser.register("name", |_, v| {
            *name.borrow_mut() = v.read_string()?;
            Ok(())
        });
        parser.parse_slice(br#"name = "the \"bold\"""#).unwrap();
        assert_eq!(name.into_inner(), r#"the "bold""#);
    }

    #[test]
    fn test_missing_value() {
        let seen = RefCell::new(None);
        let mut parser = Parser::new();
        parser.register("a", |_, v| {
            *seen.borrow_mut() = Some(v.is_absent());
            Ok(())
        });
        parser.register("b", |_, _| Ok(()));
        parser.parse_slice(b"a = } b = 1").unwrap();
        assert_eq!(seen.into_inner(), Some(true));
    }
}

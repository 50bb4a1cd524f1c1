//! Tokenizing and keyword dispatch for clausewitz plaintext
//!
//! The [`Lexer`] turns bytes into [`Token`]s. A [`Parser`] walks a
//! [`Scope`] of those tokens and hands each item's value to the handler
//! registered for its key. Handlers recurse by running a parser of their own
//! over [`ValueReader::scope`].
mod dispatch;
mod lexer;
mod operator;

pub use self::dispatch::{
    IgnoredKeys, Key, Parser, Pattern, Scope, TokenStream, UnregisteredPolicy, ValueReader,
};
pub use self::lexer::{Lexer, Position, Token, TokenKind};
pub use self::operator::*;

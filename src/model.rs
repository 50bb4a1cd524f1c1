//! Typed collections of game entities and the builders that fill them.
//!
//! Each entity module registers a table of keyword handlers with a
//! [`Parser`](crate::text::Parser) and turns one section of script text into
//! a [`Collection`]. References between entities are parsed as pending
//! [`Link`]s and resolved later by the [linker](crate::link).

mod character;
mod collection;
mod country;
mod family;
mod history;
mod jobs;
mod pop;
mod province;
mod reference;
mod unit;

pub use self::character::*;
pub use self::collection::*;
pub use self::country::*;
pub use self::family::*;
pub use self::history::*;
pub use self::jobs::*;
pub use self::pop::*;
pub use self::province::*;
pub use self::reference::*;
pub use self::unit::*;

use crate::errors::{Error, ErrorKind};
use crate::text::{IgnoredKeys, Key, Parser, Pattern, UnregisteredPolicy, ValueReader};
use std::cell::RefCell;
use tracing::{debug, warn};

/// An entity left out of its collection because it failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEntity {
    pub collection: &'static str,
    pub id: u64,
    pub reason: &'static str,
}

/// State shared by the builders of one parse: the unregistered key policy
/// and what was skipped along the way
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    policy: UnregisteredPolicy,
    dropped: Vec<DroppedEntity>,
    ignored: IgnoredKeys,
}

impl BuildContext {
    /// Create a context whose parsers use the policy
    pub fn new(policy: UnregisteredPolicy) -> Self {
        BuildContext {
            policy,
            ..Default::default()
        }
    }

    /// A fresh parser configured with this context's policy
    pub fn parser<'h>(&self) -> Parser<'h> {
        Parser::with_policy(self.policy)
    }

    /// Record keys a parser skipped
    pub fn ignore(&mut self, keys: IgnoredKeys) {
        self.ignored.merge(keys);
    }

    /// Record an entity that was not inserted
    pub fn drop_entity(&mut self, collection: &'static str, id: u64, reason: &'static str) {
        debug!("dropping {} {}: {}", collection, id, reason);
        self.dropped.push(DroppedEntity {
            collection,
            id,
            reason,
        });
    }

    /// Entities that were not inserted
    pub fn dropped(&self) -> &[DroppedEntity] {
        &self.dropped
    }

    /// Keys that no handler was registered for
    pub fn ignored(&self) -> &IgnoredKeys {
        &self.ignored
    }

    /// Fold in the results of another context, such as one used on a worker
    /// thread
    pub fn merge(&mut self, other: BuildContext) {
        self.dropped.extend(other.dropped);
        self.ignored.merge(other.ignored);
    }

    pub(crate) fn into_parts(self) -> (Vec<DroppedEntity>, IgnoredKeys) {
        (self.dropped, self.ignored)
    }
}

/// Read an ID keyed database such as `{ 1 = { .. } 2 = none }` into the
/// collection. Entries written as `none` are deleted entities and skipped.
/// The builder returns `None` for entries it drops.
pub(crate) fn parse_database<T, F>(
    value: &mut ValueReader<'_, '_>,
    ctx: &mut BuildContext,
    collection: &mut Collection<T>,
    mut build: F,
) -> Result<(), Error>
where
    T: Entity,
    F: FnMut(u64, &mut ValueReader<'_, '_>, &mut BuildContext) -> Result<Option<T>, Error>,
{
    let mut parser = ctx.parser();
    parser.register(Pattern::AnyUnsigned, |key, v| {
        let id = key.read_u64()?;
        if !v.is_scope() {
            if v.read_scalar().map(|x| x.as_bytes() != b"none").unwrap_or(true) {
                debug!("skipping {} {} without a body", T::COLLECTION, id);
            }
            return Ok(());
        }

        if let Some(entity) = build(id, v, &mut *ctx)? {
            collection.insert(entity)?;
        }
        Ok(())
    });

    let ignored = parser.parse(value.scope()?)?;
    ctx.ignore(ignored);
    Ok(())
}

/// Lose only the field when its value fails to decode. Malformed scalars
/// and values of the wrong shape are logged and read as `None`. Errors about
/// the structure of the input still propagate.
///
/// Only pass reads that leave the stream balanced when they fail, such as the
/// scalar readers of the handler's own value.
pub(crate) fn skip_malformed<T>(
    key: &Key<'_>,
    read: Result<T, Error>,
) -> Result<Option<T>, Error> {
    match read {
        Ok(x) => Ok(Some(x)),
        Err(e) => match e.kind() {
            ErrorKind::Scalar { .. }
            | ErrorKind::Date { .. }
            | ErrorKind::Version { .. }
            | ErrorKind::UnexpectedToken { .. } => {
                warn!("skipping malformed {}: {}", key.text(), e);
                Ok(None)
            }
            _ => Err(e),
        },
    }
}

/// Read an ID reference as a pending link. A malformed ID reads as absent.
pub(crate) fn read_link(key: &Key<'_>, value: &ValueReader<'_, '_>) -> Result<Link, Error> {
    let id = skip_malformed(key, read_optional_id(value))?;
    Ok(Link::from_id(id.flatten()))
}

/// Read a name that is either a plain string or a localization block like
/// `{ name = "ROME_NAME" }`
pub(crate) fn read_name(value: &mut ValueReader<'_, '_>) -> Result<Option<String>, Error> {
    if !value.is_scope() {
        return value.read_string().map(Some);
    }

    let name = RefCell::new(None);
    let mut parser = Parser::new();
    parser.register("name", |key, v| {
        if let Some(text) = skip_malformed(key, v.read_string())? {
            *name.borrow_mut() = Some(text);
        }
        Ok(())
    });
    parser.parse(value.scope()?)?;
    Ok(name.into_inner())
}

/// Read a scalar ID where `none` and `4294967295` stand for no reference
pub(crate) fn read_optional_id(value: &ValueReader<'_, '_>) -> Result<Option<u64>, Error> {
    let scalar = value.read_scalar()?;
    match scalar.as_bytes() {
        b"none" | b"4294967295" => Ok(None),
        _ => value.read_u64().map(Some),
    }
}

use super::{parse_database, skip_malformed, BuildContext, Collection, Entity};
use crate::errors::Error;
use crate::text::ValueReader;
use std::cell::RefCell;
use tracing::info;

/// A noble family
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Family {
    pub id: u64,
    pub key: Option<String>,
    pub culture: Option<String>,
    pub prestige: f64,
    pub minor: bool,

    /// Characters that belong to the family. Filled in by the linker from
    /// each character's family reference.
    pub members: Vec<u64>,
}

impl Entity for Family {
    const COLLECTION: &'static str = "families";

    fn id(&self) -> u64 {
        self.id
    }
}

impl Family {
    /// A family with only an ID
    pub fn new(id: u64) -> Self {
        Family {
            id,
            ..Default::default()
        }
    }

    /// Build a family from its save block
    pub fn parse(
        id: u64,
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Family, Error> {
        let family = RefCell::new(Family::new(id));
        let mut parser = ctx.parser();
        parser.register("key", |key, v| {
            family.borrow_mut().key = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("culture", |key, v| {
            family.borrow_mut().culture = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("prestige", |key, v| {
            if let Some(prestige) = skip_malformed(key, v.read_f64())? {
                family.borrow_mut().prestige = prestige;
            }
            Ok(())
        });
        parser.register("minor_family", |key, v| {
            if let Some(minor) = skip_malformed(key, v.read_bool())? {
                family.borrow_mut().minor = minor;
            }
            Ok(())
        });

        ctx.ignore(parser.parse(value.scope()?)?);
        Ok(family.into_inner())
    }
}

/// Read the `family` section: `{ families = { <id> = { .. } } }`
pub fn parse_families(
    value: &mut ValueReader<'_, '_>,
    ctx: &mut BuildContext,
) -> Result<Collection<Family>, Error> {
    info!("Loading Families...");
    let mut families = Collection::new();
    let mut parser = ctx.parser();
    parser.register("families", |_, v| {
        parse_database(v, &mut *ctx, &mut families, |id, v, ctx| {
            Family::parse(id, v, ctx).map(Some)
        })
    });

    let ignored = parser.parse(value.scope()?)?;
    ctx.ignore(ignored);
    info!("Loaded {} families.", families.len());
    Ok(families)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Parser, UnregisteredPolicy};
    use crate::ErrorKind;

    fn families(data: &[u8]) -> Result<Collection<Family>, Error> {
        let result = RefCell::new(None);
        let mut ctx = BuildContext::new(UnregisteredPolicy::Ignore);
        let mut parser = Parser::new();
        parser.register("family", |_, v| {
            *result.borrow_mut() = Some(parse_families(v, &mut ctx)?);
            Ok(())
        });
        parser.parse_slice(data)?;
        Ok(result.into_inner().unwrap_or_default())
    }

    #[test]
    fn test_parse_families() {
        let families = families(
            br#"family = { families = {
                1 = { key = "Cornelius" culture = roman prestige = 120.5 minor_family = no }
                2 = { key = "Barcid" culture = carthaginian minor_family = yes }
                3 = none
            } }"#,
        )
        .unwrap();

        assert_eq!(families.len(), 2);
        let cornelii = families.lookup(1).unwrap();
        assert_eq!(cornelii.key.as_deref(), Some("Cornelius"));
        assert_eq!(cornelii.prestige, 120.5);
        assert!(!cornelii.minor);
        assert!(families.lookup(2).unwrap().minor);
        assert!(cornelii.members.is_empty());
    }

    #[test]
    fn test_duplicate_family() {
        let err = families(b"family = { families = { 1 = { } 1 = { } } }").unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::DuplicateId {
                collection: "families",
                id: 1
            }
        ));
    }
}

use super::{
    parse_database, read_link, read_name, read_optional_id, skip_malformed, BuildContext,
    Collection, Entity, Link, Links,
};
use crate::errors::Error;
use crate::text::ValueReader;
use std::cell::RefCell;
use tracing::info;

/// A cohort or ship
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Subunit {
    pub id: u64,
    pub category: Option<String>,
    pub kind: Option<String>,
    pub strength: f64,

    /// The recruiting province or pop, as written in the save
    pub home: Option<u64>,
}

impl Entity for Subunit {
    const COLLECTION: &'static str = "subunits";

    fn id(&self) -> u64 {
        self.id
    }
}

impl Subunit {
    pub fn new(id: u64) -> Self {
        Subunit {
            id,
            ..Default::default()
        }
    }

    /// Build a subunit from its save block
    pub fn parse(
        id: u64,
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Subunit, Error> {
        let subunit = RefCell::new(Subunit::new(id));
        let mut parser = ctx.parser();
        parser.register("category", |key, v| {
            subunit.borrow_mut().category = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("type", |key, v| {
            subunit.borrow_mut().kind = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("strength", |key, v| {
            if let Some(strength) = skip_malformed(key, v.read_f64())? {
                subunit.borrow_mut().strength = strength;
            }
            Ok(())
        });
        parser.register("home", |key, v| {
            subunit.borrow_mut().home = skip_malformed(key, read_optional_id(v))?.flatten();
            Ok(())
        });

        ctx.ignore(parser.parse(value.scope()?)?);
        Ok(subunit.into_inner())
    }
}

/// An army or navy
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unit {
    pub id: u64,
    pub name: Option<String>,
    pub country: Link,
    pub is_army: bool,
    pub subunits: Links,
}

impl Entity for Unit {
    const COLLECTION: &'static str = "units";

    fn id(&self) -> u64 {
        self.id
    }
}

impl Unit {
    pub fn new(id: u64) -> Self {
        Unit {
            id,
            ..Default::default()
        }
    }

    /// Build a unit from its save block. Subunits are either repeated
    /// `cohort = <id>` entries or a `subunits = { .. }` list.
    pub fn parse(
        id: u64,
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Unit, Error> {
        let unit = RefCell::new(Unit::new(id));
        let mut parser = ctx.parser();
        parser.register("unit_name", |key, v| {
            unit.borrow_mut().name = skip_malformed(key, read_name(v))?.flatten();
            Ok(())
        });
        parser.register("country", |key, v| {
            unit.borrow_mut().country = read_link(key, v)?;
            Ok(())
        });
        parser.register("is_army", |key, v| {
            if let Some(is_army) = skip_malformed(key, v.read_bool())? {
                unit.borrow_mut().is_army = is_army;
            }
            Ok(())
        });
        for name in ["cohort", "ship", "subunits"] {
            parser.register(name, |key, v| {
                let ids = skip_malformed(key, v.read_u64s())?.unwrap_or_default();
                let mut unit = unit.borrow_mut();
                for id in ids {
                    unit.subunits.push_pending(id);
                }
                Ok(())
            });
        }

        ctx.ignore(parser.parse(value.scope()?)?);
        Ok(unit.into_inner())
    }
}

/// The contents of the `armies` section
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Armies {
    pub subunits: Collection<Subunit>,
    pub units: Collection<Unit>,
}

/// Read the `armies` section:
/// `{ subunit_database = { <id> = { .. } } units_database = { <id> = { .. } } }`
pub fn parse_armies(
    value: &mut ValueReader<'_, '_>,
    ctx: &mut BuildContext,
) -> Result<Armies, Error> {
    info!("Loading Units...");
    let mut subunits = Collection::new();
    let mut units = Collection::new();
    let nested = RefCell::new(BuildContext::new(ctx.policy));
    let mut parser = ctx.parser();
    parser.register("subunit_database", |_, v| {
        parse_database(v, &mut nested.borrow_mut(), &mut subunits, |id, v, ctx| {
            Subunit::parse(id, v, ctx).map(Some)
        })
    });
    parser.register("units_database", |_, v| {
        parse_database(v, &mut nested.borrow_mut(), &mut units, |id, v, ctx| {
            Unit::parse(id, v, ctx).map(Some)
        })
    });

    let ignored = parser.parse(value.scope()?)?;
    ctx.ignore(ignored);
    ctx.merge(nested.into_inner());
    info!("Loaded {} units with {} subunits.", units.len(), subunits.len());
    Ok(Armies { subunits, units })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Parser, UnregisteredPolicy};

    #[test]
    fn test_parse_armies() {
        let result = RefCell::new(None);
        let mut ctx = BuildContext::new(UnregisteredPolicy::Collect);
        let mut parser = Parser::new();
        parser.register("armies", |_, v| {
            *result.borrow_mut() = Some(parse_armies(v, &mut ctx)?);
            Ok(())
        });
        parser
            .parse_slice(
                br#"armies = {
                    subunit_database = {
                        100 = { category = levy type = light_infantry strength = 0.75 home = 12 morale = 1 }
                        101 = { category = regular type = archers strength = 1 home = 4294967295 }
                        102 = none
                    }
                    units_database = {
                        7 = { unit_name = { name = "LEGIO_I" } country = 1 is_army = yes cohort = 100 cohort = 101 }
                        8 = { unit_name = "Classis" country = 2 is_army = no subunits = { 103 } }
                    }
                }"#,
            )
            .unwrap();

        let armies = result.into_inner().unwrap();
        assert_eq!(armies.subunits.len(), 2);
        let levy = armies.subunits.lookup(100).unwrap();
        assert_eq!(levy.kind.as_deref(), Some("light_infantry"));
        assert_eq!(levy.strength, 0.75);
        assert_eq!(levy.home, Some(12));
        assert_eq!(armies.subunits.lookup(101).unwrap().home, None);

        let legion = armies.units.lookup(7).unwrap();
        assert_eq!(legion.name.as_deref(), Some("LEGIO_I"));
        assert_eq!(legion.country, Link::Pending(1));
        assert!(legion.is_army);
        assert_eq!(legion.subunits, Links::Pending(vec![100, 101]));
        assert_eq!(armies.units.lookup(8).unwrap().subunits, Links::Pending(vec![103]));
        assert!(ctx.ignored().contains("morale"));
    }
}

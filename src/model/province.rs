use super::{
    parse_database, read_link, read_name, skip_malformed, BuildContext, Collection, Entity, Link,
    Links,
};
use crate::errors::Error;
use crate::text::ValueReader;
use std::cell::RefCell;
use tracing::info;

/// A map province
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Province {
    pub id: u64,
    pub name: Option<String>,
    pub culture: Option<String>,
    pub religion: Option<String>,
    pub owner: Link,

    /// Pops living in the province
    pub pops: Links,
}

impl Entity for Province {
    const COLLECTION: &'static str = "provinces";

    fn id(&self) -> u64 {
        self.id
    }
}

impl Province {
    /// A province with only an ID
    pub fn new(id: u64) -> Self {
        Province {
            id,
            ..Default::default()
        }
    }

    /// Build a province from its save block. Pops are listed either with a
    /// repeated `pop = <id>` or a `pops = { .. }` list.
    pub fn parse(
        id: u64,
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Province, Error> {
        let province = RefCell::new(Province::new(id));
        let mut parser = ctx.parser();
        parser.register("province_name", |key, v| {
            province.borrow_mut().name = skip_malformed(key, read_name(v))?.flatten();
            Ok(())
        });
        parser.register("culture", |key, v| {
            province.borrow_mut().culture = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("religion", |key, v| {
            province.borrow_mut().religion = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("owner", |key, v| {
            province.borrow_mut().owner = read_link(key, v)?;
            Ok(())
        });
        for name in ["pop", "pops"] {
            parser.register(name, |key, v| {
                let ids = skip_malformed(key, v.read_u64s())?.unwrap_or_default();
                let mut province = province.borrow_mut();
                for id in ids {
                    province.pops.push_pending(id);
                }
                Ok(())
            });
        }

        ctx.ignore(parser.parse(value.scope()?)?);
        Ok(province.into_inner())
    }
}

/// Read the `provinces` section: `{ <id> = { .. } }`
pub fn parse_provinces(
    value: &mut ValueReader<'_, '_>,
    ctx: &mut BuildContext,
) -> Result<Collection<Province>, Error> {
    info!("Loading Provinces...");
    let mut provinces = Collection::new();
    parse_database(value, ctx, &mut provinces, |id, v, ctx| {
        Province::parse(id, v, ctx).map(Some)
    })?;
    info!("Loaded {} provinces.", provinces.len());
    Ok(provinces)
}

use super::{parse_database, skip_malformed, BuildContext, Collection, Entity};
use crate::errors::Error;
use crate::text::ValueReader;
use std::cell::RefCell;
use tracing::info;

/// A population unit living in a province
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pop {
    pub id: u64,
    pub kind: Option<String>,
    pub culture: Option<String>,
    pub religion: Option<String>,
}

impl Entity for Pop {
    const COLLECTION: &'static str = "pops";

    fn id(&self) -> u64 {
        self.id
    }
}

impl Pop {
    /// A pop with only an ID
    pub fn new(id: u64) -> Self {
        Pop {
            id,
            ..Default::default()
        }
    }

    /// Build a pop from its save block
    pub fn parse(
        id: u64,
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Pop, Error> {
        let pop = RefCell::new(Pop::new(id));
        let mut parser = ctx.parser();
        parser.register("type", |key, v| {
            pop.borrow_mut().kind = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("culture", |key, v| {
            pop.borrow_mut().culture = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("religion", |key, v| {
            pop.borrow_mut().religion = skip_malformed(key, v.read_string())?;
            Ok(())
        });

        ctx.ignore(parser.parse(value.scope()?)?);
        Ok(pop.into_inner())
    }
}

/// Read the `population` section: `{ pops = { <id> = { .. } } }`
pub fn parse_pops(
    value: &mut ValueReader<'_, '_>,
    ctx: &mut BuildContext,
) -> Result<Collection<Pop>, Error> {
    let mut pops = Collection::new();
    let mut parser = ctx.parser();
    parser.register("pops", |_, v| {
        parse_database(v, &mut *ctx, &mut pops, |id, v, ctx| {
            Pop::parse(id, v, ctx).map(Some)
        })
    });

    let ignored = parser.parse(value.scope()?)?;
    ctx.ignore(ignored);
    info!("Loaded {} pops.", pops.len());
    Ok(pops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Parser, UnregisteredPolicy};

    #[test]
    fn test_parse_pops() {
        let pops = RefCell::new(None);
        let mut ctx = BuildContext::new(UnregisteredPolicy::Ignore);
        let mut parser = Parser::new();
        parser.register("population", |_, v| {
            *pops.borrow_mut() = Some(parse_pops(v, &mut ctx)?);
            Ok(())
        });
        parser
            .parse_slice(
                br#"population = {
                    pops = {
                        10 = { type = "citizen" culture = "roman" religion = "roman_pantheon" }
                        11 = none
                        12 = { type = "slaves" culture = "carthaginian" }
                    }
                }"#,
            )
            .unwrap();

        let pops = pops.into_inner().unwrap();
        assert_eq!(pops.len(), 2);
        let pop = pops.lookup(12).unwrap();
        assert_eq!(pop.kind.as_deref(), Some("slaves"));
        assert_eq!(pop.culture.as_deref(), Some("carthaginian"));
        assert_eq!(pop.religion, None);
    }
}

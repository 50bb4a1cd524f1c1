use super::{read_link, skip_malformed, BuildContext, Link};
use crate::common::Date;
use crate::errors::Error;
use crate::text::ValueReader;
use std::cell::RefCell;
use tracing::info;

/// A character appointed to govern a region for a country
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Governorship {
    pub country: Link,
    pub character: Link,
    pub region: Option<String>,
    pub start_date: Option<Date>,
}

impl Governorship {
    /// Build a governorship from its save block:
    /// `{ who = 1 character = 5 governorship = "central_italy_region" start_date = 450.1.1 }`
    pub fn parse(
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Governorship, Error> {
        let job = RefCell::new(Governorship::default());
        let mut parser = ctx.parser();
        parser.register("who", |key, v| {
            job.borrow_mut().country = read_link(key, v)?;
            Ok(())
        });
        parser.register("character", |key, v| {
            job.borrow_mut().character = read_link(key, v)?;
            Ok(())
        });
        parser.register("governorship", |key, v| {
            job.borrow_mut().region = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("start_date", |key, v| {
            job.borrow_mut().start_date = skip_malformed(key, v.read_auc_date())?;
            Ok(())
        });

        ctx.ignore(parser.parse(value.scope()?)?);
        Ok(job.into_inner())
    }
}

/// Read the `jobs` section. Governorships keep the order of the save.
pub fn parse_jobs(
    value: &mut ValueReader<'_, '_>,
    ctx: &mut BuildContext,
) -> Result<Vec<Governorship>, Error> {
    info!("Loading Governorships...");
    let mut governorships = Vec::new();
    let nested = RefCell::new(BuildContext::new(ctx.policy));
    let mut parser = ctx.parser();
    parser.register("governorship", |_, v| {
        governorships.push(Governorship::parse(v, &mut nested.borrow_mut())?);
        Ok(())
    });

    let ignored = parser.parse(value.scope()?)?;
    ctx.ignore(ignored);
    ctx.merge(nested.into_inner());
    info!("Loaded {} governorships.", governorships.len());
    Ok(governorships)
}

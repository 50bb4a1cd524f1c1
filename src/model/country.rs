use super::{
    parse_database, read_link, read_name, skip_malformed, BuildContext, Collection, Entity, Link,
    Links,
};
use crate::common::Date;
use crate::errors::Error;
use crate::text::{Parser, ValueReader};
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// How a pre-Imperator ruler names the country they ruled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryKey {
    /// The save's numeric country ID
    Id(u64),

    /// The country tag such as `ROM`
    Tag(String),
}

/// A ruler from before the save's start, read from the prehistory file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreImperatorRuler {
    pub name: Option<String>,
    pub country: Option<CountryKey>,
}

/// A span of time a character ruled a country
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulerTerm {
    pub character: Link,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub government: Option<String>,
    pub pre_imperator: Option<PreImperatorRuler>,
}

const NO_START_DATE: &str = "no start date";

impl RulerTerm {
    /// Collection name used when a term is dropped
    pub const COLLECTION: &'static str = "ruler terms";

    /// A term without a ruling character
    pub fn new(start_date: Date) -> Self {
        RulerTerm {
            character: Link::Absent,
            start_date,
            end_date: None,
            government: None,
            pre_imperator: None,
        }
    }

    /// Build a term from a save `ruler_term` block of the country:
    /// `{ character = 5 start_date = 450.10.1 government = "..." }`
    ///
    /// Terms without a start date are dropped and `None` is returned.
    pub fn parse_save(
        country: u64,
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Option<RulerTerm>, Error> {
        let character = RefCell::new(Link::Absent);
        let start_date = RefCell::new(None);
        let government = RefCell::new(None);
        let mut parser = ctx.parser();
        parser.register("character", |key, v| {
            *character.borrow_mut() = read_link(key, v)?;
            Ok(())
        });
        parser.register("start_date", |key, v| {
            *start_date.borrow_mut() = skip_malformed(key, v.read_auc_date())?;
            Ok(())
        });
        parser.register("government", |key, v| {
            *government.borrow_mut() = skip_malformed(key, v.read_string())?;
            Ok(())
        });

        ctx.ignore(parser.parse(value.scope()?)?);
        let start_date = match start_date.into_inner() {
            Some(date) => date,
            None => {
                warn!("dropping ruler term of country {} without a start date", country);
                ctx.drop_entity(RulerTerm::COLLECTION, country, NO_START_DATE);
                return Ok(None);
            }
        };

        let mut term = RulerTerm::new(start_date);
        term.character = character.into_inner();
        term.government = government.into_inner();
        Ok(Some(term))
    }

    /// Build a term from a prehistory `ruler` block:
    /// `{ country = ROM name = "Romulus" start_date = 1.1.1 end_date = 38.1.1 }`
    ///
    /// Returns `None` when the block has no start date.
    pub fn parse_prehistory(value: &mut ValueReader<'_, '_>) -> Result<Option<RulerTerm>, Error> {
        let ruler = RefCell::new(PreImperatorRuler::default());
        let start_date = RefCell::new(None);
        let end_date = RefCell::new(None);
        let mut parser = Parser::new();
        parser.register("name", |key, v| {
            ruler.borrow_mut().name = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("country", |key, v| {
            let country = match v.read_u64() {
                Ok(id) => Some(CountryKey::Id(id)),
                Err(_) => skip_malformed(key, v.read_string())?.map(CountryKey::Tag),
            };
            ruler.borrow_mut().country = country;
            Ok(())
        });
        parser.register("start_date", |key, v| {
            *start_date.borrow_mut() = skip_malformed(key, v.read_auc_date())?;
            Ok(())
        });
        parser.register("end_date", |key, v| {
            *end_date.borrow_mut() = skip_malformed(key, v.read_auc_date())?;
            Ok(())
        });
        parser.parse(value.scope()?)?;

        Ok(start_date.into_inner().map(|start| {
            let mut term = RulerTerm::new(start);
            term.end_date = end_date.into_inner();
            term.pre_imperator = Some(ruler.into_inner());
            term
        }))
    }
}

/// A playable country
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Country {
    pub id: u64,
    pub tag: String,
    pub name: Option<String>,
    pub government: Option<String>,

    /// The capital province
    pub capital: Link,
    pub families: Links,
    pub monarch: Link,

    /// Ordered by start date once loading finishes
    pub ruler_terms: Vec<RulerTerm>,

    /// How many rulers of each name came before the save's start
    pub historical_regnal_numbers: BTreeMap<String, u64>,

    /// Provinces owned by the country. Filled in by the linker.
    pub provinces: Vec<u64>,

    /// Set when a player controls the country
    pub player: bool,
}

impl Entity for Country {
    const COLLECTION: &'static str = "countries";

    fn id(&self) -> u64 {
        self.id
    }
}

impl Country {
    /// A country with only an ID and tag
    pub fn new(id: u64, tag: &str) -> Self {
        Country {
            id,
            tag: String::from(tag),
            ..Default::default()
        }
    }

    /// Build a country from its save block
    pub fn parse(
        id: u64,
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Country, Error> {
        let country = RefCell::new(Country::new(id, ""));
        let terms = RefCell::new(Vec::new());
        let nested = RefCell::new(BuildContext::new(ctx.policy));
        let mut parser = ctx.parser();
        parser.register("tag", |key, v| {
            if let Some(tag) = skip_malformed(key, v.read_string())? {
                country.borrow_mut().tag = tag;
            }
            Ok(())
        });
        parser.register("country_name", |key, v| {
            country.borrow_mut().name = skip_malformed(key, read_name(v))?.flatten();
            Ok(())
        });
        parser.register("government_key", |key, v| {
            country.borrow_mut().government = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("capital", |key, v| {
            country.borrow_mut().capital = read_link(key, v)?;
            Ok(())
        });
        parser.register("monarch", |key, v| {
            country.borrow_mut().monarch = read_link(key, v)?;
            Ok(())
        });
        for name in ["family", "families"] {
            parser.register(name, |key, v| {
                let ids = skip_malformed(key, v.read_u64s())?.unwrap_or_default();
                let mut country = country.borrow_mut();
                for id in ids {
                    country.families.push_pending(id);
                }
                Ok(())
            });
        }
        parser.register("ruler_term", |_, v| {
            if !v.is_scope() {
                return Ok(());
            }

            if let Some(term) = RulerTerm::parse_save(id, v, &mut nested.borrow_mut())? {
                terms.borrow_mut().push(term);
            }
            Ok(())
        });
        parser.register("historical_regnal_numbers", |_, v| {
            if !v.is_scope() {
                return Ok(());
            }

            let numbers = RefCell::new(BTreeMap::new());
            let mut inner = Parser::new();
            inner.register_catch_all(|name, v| {
                if let Some(number) = skip_malformed(name, v.read_u64())? {
                    numbers.borrow_mut().insert(name.text().into_owned(), number);
                }
                Ok(())
            });
            inner.parse(v.scope()?)?;
            country.borrow_mut().historical_regnal_numbers = numbers.into_inner();
            Ok(())
        });

        let ignored = parser.parse(value.scope()?)?;
        ctx.ignore(ignored);
        ctx.merge(nested.into_inner());

        let mut country = country.into_inner();
        country.ruler_terms = terms.into_inner();
        Ok(country)
    }

    /// Returns true if ruler terms are in non-decreasing start date order
    pub fn has_chronological_terms(&self) -> bool {
        self.ruler_terms
            .windows(2)
            .all(|w| w[0].start_date <= w[1].start_date)
    }

    /// Stable sort of the ruler terms by start date
    pub fn sort_ruler_terms(&mut self) {
        self.ruler_terms.sort_by_key(|t| t.start_date);
    }
}

/// Read the `country` section: `{ country_database = { <id> = { .. } } }`
pub fn parse_countries(
    value: &mut ValueReader<'_, '_>,
    ctx: &mut BuildContext,
) -> Result<Collection<Country>, Error> {
    info!("Loading Countries...");
    let mut countries = Collection::new();
    let mut parser = ctx.parser();
    parser.register("country_database", |_, v| {
        parse_database(v, &mut *ctx, &mut countries, |id, v, ctx| {
            Country::parse(id, v, ctx).map(Some)
        })
    });

    let ignored = parser.parse(value.scope()?)?;
    ctx.ignore(ignored);
    info!("Loaded {} countries.", countries.len());
    Ok(countries)
}

//! Resolve the references between entity collections once every collection
//! has been built.
//!
//! A reference whose target is missing never aborts the load. The field is
//! cleared, a warning is logged, and an [`OrphanReference`] is recorded in
//! the [`LinkReport`].

use crate::errors::{Error, LoadStage};
use crate::model::{rebuild_children, Collection, Country, CountryKey, Link, RulerTerm};
use crate::text::Parser;
use crate::World;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// A kind of reference between two collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    CharacterFamily,
    CharacterCountry,
    CharacterParent,
    ProvincePop,
    ProvinceOwner,
    CountryFamily,
    CountryCapital,
    CountryMonarch,
    RulerTermCharacter,
    UnitCountry,
    UnitSubunit,
    GovernorshipCountry,
    GovernorshipCharacter,
    PlayedCountry,
    PrehistoryCountry,
}

impl Relation {
    /// A short name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::CharacterFamily => "character family",
            Relation::CharacterCountry => "character country",
            Relation::CharacterParent => "character parent",
            Relation::ProvincePop => "province pop",
            Relation::ProvinceOwner => "province owner",
            Relation::CountryFamily => "country family",
            Relation::CountryCapital => "country capital",
            Relation::CountryMonarch => "country monarch",
            Relation::RulerTermCharacter => "ruler term character",
            Relation::UnitCountry => "unit country",
            Relation::UnitSubunit => "unit subunit",
            Relation::GovernorshipCountry => "governorship country",
            Relation::GovernorshipCharacter => "governorship character",
            Relation::PlayedCountry => "played country",
            Relation::PrehistoryCountry => "prehistory country",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to an ID that does not exist in the target collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanReference {
    pub relation: Relation,

    /// ID of the entity holding the reference
    pub from: u64,

    /// The missing ID
    pub to: u64,
}

/// A country whose historical regnal numbers disagree with its pre-Imperator
/// rulers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegnalMismatch {
    pub country: u64,
    pub tag: String,
    pub expected: BTreeMap<String, u64>,
    pub found: BTreeMap<String, u64>,
}

/// Outcome of linking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    linked: BTreeMap<Relation, usize>,
    orphans: Vec<OrphanReference>,
    pruned_families: Vec<u64>,
    regnal_mismatches: Vec<RegnalMismatch>,
}

impl LinkReport {
    /// Number of references of the relation that resolved
    pub fn linked(&self, relation: Relation) -> usize {
        self.linked.get(&relation).copied().unwrap_or(0)
    }

    /// References whose target was missing
    pub fn orphans(&self) -> &[OrphanReference] {
        &self.orphans
    }

    /// Number of orphans of a relation
    pub fn orphan_count(&self, relation: Relation) -> usize {
        self.orphans.iter().filter(|x| x.relation == relation).count()
    }

    /// Families removed for having no members
    pub fn pruned_families(&self) -> &[u64] {
        &self.pruned_families
    }

    /// Countries that failed the regnal number check
    pub fn regnal_mismatches(&self) -> &[RegnalMismatch] {
        &self.regnal_mismatches
    }

    fn link<F>(&mut self, relation: Relation, from: u64, link: &mut Link, exists: F)
    where
        F: FnOnce(u64) -> bool,
    {
        match link.resolve(exists) {
            Some(Ok(_)) => *self.linked.entry(relation).or_default() += 1,
            Some(Err(to)) => self.orphan(relation, from, to),
            None => {}
        }
    }

    fn count(&mut self, relation: Relation, linked: usize) {
        *self.linked.entry(relation).or_default() += linked;
    }

    fn orphan(&mut self, relation: Relation, from: u64, to: u64) {
        warn!("{} {} references missing id {}", relation, from, to);
        self.orphans.push(OrphanReference { relation, from, to });
    }
}

/// Resolve every pending reference in the world.
///
/// Runs in a fixed order: characters to families (families without members
/// are then pruned), characters to countries and parents, provinces to pops
/// and owners, countries to families, capitals, monarchs and rulers, units,
/// governorships, and played countries. Children caches are rebuilt and
/// ruler terms are sorted by start date at the end.
pub fn link_world(world: &mut World) -> LinkReport {
    let mut report = LinkReport::default();
    link_character_families(world, &mut report);
    prune_families(world, &mut report);
    link_characters(world, &mut report);
    link_provinces(world, &mut report);
    link_countries(world, &mut report);
    link_units(world, &mut report);
    link_governorships(world, &mut report);
    link_played_countries(world, &mut report);

    let edges = rebuild_children(&mut world.characters);
    info!("<> {} parent child links rebuilt", edges);

    for country in world.countries.iter_mut() {
        country.sort_ruler_terms();
    }

    info!("<> {} orphaned references", report.orphans.len());
    report
}

fn link_character_families(world: &mut World, report: &mut LinkReport) {
    let families = &mut world.families;
    for family in families.iter_mut() {
        family.members.clear();
    }

    for character in world.characters.iter_mut() {
        let id = character.id;
        report.link(Relation::CharacterFamily, id, &mut character.family, |x| {
            families.contains(x)
        });
        if let Some(family) = character.family.resolved().and_then(|x| families.get_mut(x)) {
            family.members.push(id);
        }
    }

    info!(
        "<> {} characters linked to families",
        report.linked(Relation::CharacterFamily)
    );
}

fn prune_families(world: &mut World, report: &mut LinkReport) {
    let mut pruned = Vec::new();
    world.families.retain(|family| {
        if family.members.is_empty() {
            pruned.push(family.id);
            false
        } else {
            true
        }
    });

    info!("<> {} families without members removed", pruned.len());
    report.pruned_families.extend(pruned);
}

fn link_characters(world: &mut World, report: &mut LinkReport) {
    let countries = &world.countries;
    let known: HashSet<u64> = world.characters.iter().map(|x| x.id).collect();
    for character in world.characters.iter_mut() {
        let id = character.id;
        report.link(Relation::CharacterCountry, id, &mut character.country, |x| {
            countries.contains(x)
        });
        report.link(Relation::CharacterParent, id, &mut character.father, |x| {
            known.contains(&x)
        });
        report.link(Relation::CharacterParent, id, &mut character.mother, |x| {
            known.contains(&x)
        });
    }

    info!(
        "<> {} characters linked to countries",
        report.linked(Relation::CharacterCountry)
    );
}

fn link_provinces(world: &mut World, report: &mut LinkReport) {
    let pops = &world.pops;
    let countries = &mut world.countries;
    for country in countries.iter_mut() {
        country.provinces.clear();
    }

    for province in world.provinces.iter_mut() {
        let id = province.id;
        let orphans = province.pops.resolve(|x| pops.contains(x));
        report.count(Relation::ProvincePop, province.pops.resolved().len());
        for to in orphans {
            report.orphan(Relation::ProvincePop, id, to);
        }

        report.link(Relation::ProvinceOwner, id, &mut province.owner, |x| {
            countries.contains(x)
        });
        if let Some(country) = province.owner.resolved().and_then(|x| countries.get_mut(x)) {
            country.provinces.push(id);
        }
    }

    info!("<> {} pops linked to provinces", report.linked(Relation::ProvincePop));
    info!(
        "<> {} provinces linked to countries",
        report.linked(Relation::ProvinceOwner)
    );
}

fn link_countries(world: &mut World, report: &mut LinkReport) {
    let families = &world.families;
    let provinces = &world.provinces;
    let characters = &world.characters;
    for country in world.countries.iter_mut() {
        let id = country.id;
        let orphans = country.families.resolve(|x| families.contains(x));
        report.count(Relation::CountryFamily, country.families.resolved().len());
        for to in orphans {
            report.orphan(Relation::CountryFamily, id, to);
        }

        report.link(Relation::CountryCapital, id, &mut country.capital, |x| {
            provinces.contains(x)
        });
        report.link(Relation::CountryMonarch, id, &mut country.monarch, |x| {
            characters.contains(x)
        });

        for term in country.ruler_terms.iter_mut() {
            report.link(Relation::RulerTermCharacter, id, &mut term.character, |x| {
                characters.contains(x)
            });
        }
    }

    info!(
        "<> {} families linked to countries",
        report.linked(Relation::CountryFamily)
    );
    info!(
        "<> {} ruler terms linked to characters",
        report.linked(Relation::RulerTermCharacter)
    );
}

fn link_units(world: &mut World, report: &mut LinkReport) {
    let countries = &world.countries;
    let subunits = &world.armies.subunits;
    for unit in world.armies.units.iter_mut() {
        let id = unit.id;
        report.link(Relation::UnitCountry, id, &mut unit.country, |x| {
            countries.contains(x)
        });

        let orphans = unit.subunits.resolve(|x| subunits.contains(x));
        report.count(Relation::UnitSubunit, unit.subunits.resolved().len());
        for to in orphans {
            report.orphan(Relation::UnitSubunit, id, to);
        }
    }

    info!("<> {} units linked to countries", report.linked(Relation::UnitCountry));
}

fn link_governorships(world: &mut World, report: &mut LinkReport) {
    let countries = &world.countries;
    let characters = &world.characters;
    for (idx, job) in world.governorships.iter_mut().enumerate() {
        let from = idx as u64;
        report.link(Relation::GovernorshipCountry, from, &mut job.country, |x| {
            countries.contains(x)
        });
        report.link(Relation::GovernorshipCharacter, from, &mut job.character, |x| {
            characters.contains(x)
        });
    }

    info!(
        "<> {} governorships linked",
        report.linked(Relation::GovernorshipCharacter)
    );
}

fn link_played_countries(world: &mut World, report: &mut LinkReport) {
    let mut players = Vec::with_capacity(world.player_countries.len());
    for id in world.player_countries.drain(..) {
        match world.countries.get_mut(id) {
            Some(country) => {
                country.player = true;
                report.count(Relation::PlayedCountry, 1);
                players.push(id);
            }
            None => report.orphan(Relation::PlayedCountry, 0, id),
        }
    }
    world.player_countries = players;
}

/// Read pre-Imperator ruler terms from a script file and add them to their
/// countries. Returns the number of terms added.
pub fn load_prehistory(
    path: &Path,
    countries: &mut Collection<Country>,
    report: &mut LinkReport,
) -> Result<usize, Error> {
    info!("Loading pre-Imperator rulers from {}", path.display());
    let data = std::fs::read(path).map_err(|e| Error::io(LoadStage::Link, e))?;
    apply_prehistory(&data, countries, report)
}

/// Add the ruler terms of prehistory script text to their countries, sort
/// the terms, and run the regnal number check
pub fn apply_prehistory(
    data: &[u8],
    countries: &mut Collection<Country>,
    report: &mut LinkReport,
) -> Result<usize, Error> {
    let terms = RefCell::new(Vec::new());
    let mut parser = Parser::new();
    parser.register("ruler", |_, v| {
        if let Some(term) = RulerTerm::parse_prehistory(v)? {
            terms.borrow_mut().push(term);
        } else {
            warn!("skipping pre-Imperator ruler without a start date at {}", v.position());
        }
        Ok(())
    });
    parser.parse_slice(data)?;

    let tags: HashMap<String, u64> = countries
        .iter()
        .map(|x| (x.tag.clone(), x.id))
        .collect();

    let mut added = 0;
    for term in terms.into_inner() {
        let key = term.pre_imperator.as_ref().and_then(|x| x.country.clone());
        let target = match &key {
            Some(CountryKey::Id(id)) => Some(*id),
            Some(CountryKey::Tag(tag)) => tags.get(tag).copied(),
            None => None,
        };

        match target.and_then(|id| countries.get_mut(id)) {
            Some(country) => {
                country.ruler_terms.push(term);
                added += 1;
            }
            None => {
                warn!("skipping pre-Imperator ruler for missing country {:?}", key);
                if let Some(CountryKey::Id(id)) = key {
                    report.orphan(Relation::PrehistoryCountry, 0, id);
                }
            }
        }
    }

    for country in countries.iter_mut() {
        country.sort_ruler_terms();
    }

    report.count(Relation::PrehistoryCountry, added);
    report.regnal_mismatches = verify_regnal_numbers(countries);
    info!("<> {} pre-Imperator ruler terms added", added);
    Ok(added)
}

/// Compare how often each pre-Imperator ruler name occurs with the country's
/// historical regnal numbers
pub fn verify_regnal_numbers(countries: &Collection<Country>) -> Vec<RegnalMismatch> {
    let mut mismatches = Vec::new();
    for country in countries.iter() {
        let mut found: BTreeMap<String, u64> = BTreeMap::new();
        let names = country
            .ruler_terms
            .iter()
            .filter_map(|x| x.pre_imperator.as_ref())
            .filter_map(|x| x.name.as_ref());
        for name in names {
            *found.entry(name.clone()).or_default() += 1;
        }

        if found != country.historical_regnal_numbers {
            debug!(
                "regnal numbers of {} do not match its pre-Imperator rulers: {:?} vs {:?}",
                country.tag, country.historical_regnal_numbers, found
            );
            mismatches.push(RegnalMismatch {
                country: country.id,
                tag: country.tag.clone(),
                expected: country.historical_regnal_numbers.clone(),
                found,
            });
        }
    }

    mismatches
}

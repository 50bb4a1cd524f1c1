use crate::common::Date;
use crate::errors::{Error, ErrorKind};
use crate::link::{link_world, load_prehistory, LinkReport};
use crate::model::{
    parse_armies, parse_characters, parse_countries, parse_families, parse_jobs, parse_pops,
    parse_provinces, Armies, BuildContext, Character, Collection, Country, DroppedEntity, Family,
    Governorship, Pop, Province,
};
use crate::save::{open_save, Melter, SaveFormat};
use crate::text::{IgnoredKeys, Parser, Pattern};
use crate::{GameVersion, LoadOptions};
use std::cell::RefCell;
use tracing::info;

/// The cross-linked contents of a save
#[derive(Debug, Clone, PartialEq, Default)]
pub struct World {
    /// Game version that wrote the save
    pub version: Option<GameVersion>,

    /// Date the save was made, converted to the common era
    pub end_date: Option<Date>,
    pub dlcs: Vec<String>,
    pub mods: Vec<String>,
    pub families: Collection<Family>,
    pub characters: Collection<Character>,
    pub countries: Collection<Country>,
    pub provinces: Collection<Province>,
    pub pops: Collection<Pop>,
    pub armies: Armies,

    /// In save order
    pub governorships: Vec<Governorship>,

    /// Countries controlled by players
    pub player_countries: Vec<u64>,
}

/// What a load recovered from without failing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// How the save was encoded on disk
    pub format: Option<SaveFormat>,

    /// Entities left out for failing validation
    pub dropped: Vec<DroppedEntity>,

    /// Keys without a handler, when collected
    pub ignored: IgnoredKeys,
    pub link: LinkReport,
}

impl World {
    /// Load, parse, and link a save.
    ///
    /// Compressed saves are handed to the melter first. Nothing is returned
    /// unless every stage succeeds.
    ///
    /// ```no_run
    /// use rome_loader::{CommandMelter, LoadOptions, World};
    ///
    /// let options = LoadOptions::builder("save.rome").build();
    /// let (world, report) = World::load(&options, &CommandMelter::default()).unwrap();
    /// println!("{} characters, {} orphans", world.characters.len(), report.link.orphans().len());
    /// ```
    pub fn load(options: &LoadOptions, melter: &dyn Melter) -> Result<(World, LoadReport), Error> {
        let source = open_save(options, melter)?;
        let (mut world, ctx) = World::parse(source.data(), options)?;
        let (dropped, ignored) = ctx.into_parts();

        info!("*** Linking save ***");
        let mut link = link_world(&mut world);
        if let Some(path) = options.prehistory_path() {
            load_prehistory(path, &mut world.countries, &mut link)?;
        }

        let report = LoadReport {
            format: Some(source.format()),
            dropped,
            ignored,
            link,
        };
        Ok((world, report))
    }

    /// Parse plaintext save data into unlinked collections.
    ///
    /// The version is checked against the bounds of the options as soon as
    /// it is read.
    pub fn parse(data: &[u8], options: &LoadOptions) -> Result<(World, BuildContext), Error> {
        info!("*** Parsing save ***");
        let world = RefCell::new(World::default());
        let ctx = RefCell::new(BuildContext::new(options.unregistered()));
        let mut parser = ctx.borrow().parser();
        parser.register(Pattern::Predicate(|s| s.starts_with("SAV")), |_, _| Ok(()));
        parser.register("version", |_, v| {
            let found = v.read_version()?;
            let (min, max) = (options.min_version(), options.max_version());
            if found < min || !max.is_largerish_than(&found) {
                return Err(Error::new(ErrorKind::VersionMismatch { found, min, max }));
            }
            info!("Save game version: {}", found);
            world.borrow_mut().version = Some(found);
            Ok(())
        });
        parser.register("date", |_, v| {
            let date = v.read_auc_date()?;
            info!("Save date: {}", date);
            world.borrow_mut().end_date = Some(date);
            Ok(())
        });
        parser.register("enabled_dlcs", |_, v| {
            let dlcs = v.read_strings()?;
            info!("Enabled DLCs: {}", dlcs.join(", "));
            world.borrow_mut().dlcs = dlcs;
            Ok(())
        });
        parser.register("enabled_mods", |_, v| {
            let mods = v.read_strings()?;
            info!("Enabled mods: {}", mods.len());
            world.borrow_mut().mods = mods;
            Ok(())
        });
        parser.register("family", |_, v| {
            let families = parse_families(v, &mut ctx.borrow_mut())?;
            world.borrow_mut().families = families;
            Ok(())
        });
        parser.register("character", |_, v| {
            let characters = parse_characters(v, &mut ctx.borrow_mut())?;
            world.borrow_mut().characters = characters;
            Ok(())
        });
        parser.register("provinces", |_, v| {
            let provinces = parse_provinces(v, &mut ctx.borrow_mut())?;
            world.borrow_mut().provinces = provinces;
            Ok(())
        });
        parser.register("population", |_, v| {
            let pops = parse_pops(v, &mut ctx.borrow_mut())?;
            world.borrow_mut().pops = pops;
            Ok(())
        });
        parser.register("country", |_, v| {
            let countries = parse_countries(v, &mut ctx.borrow_mut())?;
            world.borrow_mut().countries = countries;
            Ok(())
        });
        parser.register("armies", |_, v| {
            let armies = parse_armies(v, &mut ctx.borrow_mut())?;
            world.borrow_mut().armies = armies;
            Ok(())
        });
        parser.register("jobs", |_, v| {
            let governorships = parse_jobs(v, &mut ctx.borrow_mut())?;
            world.borrow_mut().governorships = governorships;
            Ok(())
        });
        parser.register("played_country", |_, v| {
            let player = RefCell::new(None);
            let mut inner = Parser::new();
            inner.register("country", |_, v| {
                *player.borrow_mut() = Some(v.read_u64()?);
                Ok(())
            });
            inner.parse(v.scope()?)?;
            if let Some(id) = player.into_inner() {
                world.borrow_mut().player_countries.push(id);
            }
            Ok(())
        });

        let ignored = parser.parse_slice(data)?;
        let mut ctx = ctx.into_inner();
        ctx.ignore(ignored);
        Ok((world.into_inner(), ctx))
    }
}

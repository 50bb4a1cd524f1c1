use rome_loader::{CommandMelter, LoadOptions, World};
use std::env;
use std::error;

fn main() -> Result<(), Box<dyn error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut builder = LoadOptions::builder(&args[1]);
    if let Some(prehistory) = args.get(2) {
        builder = builder.prehistory(prehistory);
    }

    let options = builder.build();
    let (world, report) = World::load(&options, &CommandMelter::default())?;
    println!("version: {}", world.version.map(|x| x.to_string()).unwrap_or_default());
    println!("date: {}", world.end_date.map(|x| x.to_string()).unwrap_or_default());
    println!("families: {}", world.families.len());
    println!("characters: {}", world.characters.len());
    println!("countries: {}", world.countries.len());
    println!("provinces: {}", world.provinces.len());
    println!("pops: {}", world.pops.len());
    println!("units: {}", world.armies.units.len());
    println!("governorships: {}", world.governorships.len());
    println!("dropped: {}", report.dropped.len());
    println!("orphans: {}", report.link.orphans().len());
    for mismatch in report.link.regnal_mismatches() {
        println!("regnal mismatch: {}", mismatch.tag);
    }

    Ok(())
}

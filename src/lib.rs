/*!

Loads [Imperator: Rome](https://en.wikipedia.org/wiki/Imperator:_Rome) saves and
Clausewitz script files into a validated, cross-linked model of characters, families,
countries, provinces, pops, and military units.

## Features

- ✔ Format aware: debug mode plaintext saves are read directly, compressed saves are melted by
  an external tool
- ✔ Extensible: sections are parsed by registering keyword handlers rather than by one fixed
  schema
- ✔ Forgiving: broken references are recorded and cleared instead of aborting the load
- ✔ Concurrent: directories of history scripts are parsed on a rayon pool

## Quick Start

```no_run
use rome_loader::{CommandMelter, LoadOptions, World};

let options = LoadOptions::builder("autosave.rome")
    .prehistory("configurables/prehistory.txt")
    .build();

let (world, report) = World::load(&options, &CommandMelter::default()).unwrap();
for country in world.countries.iter().filter(|x| x.player) {
    println!("{} owns {} provinces", country.tag, country.provinces.len());
}

println!("{} references could not be resolved", report.link.orphans().len());
```

## Keyword Dispatch

The parser underneath walks a scope and hands each value to the handler registered for its
key. Handlers read scalars directly or open a nested parser on the value's scope.

```rust
use rome_loader::text::{Parser, Pattern};
use std::cell::RefCell;

let data = br#"
    tag = "ROM"
    capital = 1
    historical_regnal_numbers = { Marcus = 2 Lucius = 1 }
"#;

let tag = RefCell::new(String::new());
let names = RefCell::new(Vec::new());
let mut parser = Parser::new();
parser.register("tag", |_, value| {
    *tag.borrow_mut() = value.read_string()?;
    Ok(())
});
parser.register("historical_regnal_numbers", |_, value| {
    let mut inner = Parser::new();
    inner.register(Pattern::AnyBare, |key, _| {
        names.borrow_mut().push(key.text().into_owned());
        Ok(())
    });
    inner.parse(value.scope()?)?;
    Ok(())
});

parser.parse_slice(&data[..]).unwrap();
assert_eq!(tag.into_inner(), "ROM");
assert_eq!(names.into_inner(), vec!["Marcus", "Lucius"]);
```

Keys without a handler are skipped according to the [`UnregisteredPolicy`](text::UnregisteredPolicy).

## Caveats

Caller is responsible for:

- Providing a [`Melter`](save::Melter) for compressed saves. The default runs `rakaly melt`.
- Resolving localization keys such as `ROME_NAME`, which are returned as is.

*/

pub mod common;
mod config;
mod data;
mod errors;
pub mod link;
mod loader;
pub mod model;
pub mod save;
mod scalar;
pub mod text;
mod version;
mod world;

pub use self::config::*;
pub use self::errors::*;
pub use self::link::{LinkReport, OrphanReference, Relation};
pub use self::loader::*;
pub use self::save::{CommandMelter, MeltError, Melter, SaveFormat};
pub use self::scalar::{Scalar, ScalarError};
pub use self::version::*;
pub use self::world::*;

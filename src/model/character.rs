use super::{
    parse_database, read_link, read_name, skip_malformed, BuildContext, Collection, Entity,
    History, HistoryValue, Link,
};
use crate::common::{is_date_like, Calendar};
use crate::errors::Error;
use crate::text::{Parser, Pattern, ValueReader};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::info;

/// A person in the game world
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Character {
    pub id: u64,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub culture: Option<String>,
    pub religion: Option<String>,
    pub dynasty: Option<String>,
    pub female: bool,
    pub traits: Vec<String>,

    /// Dated field changes, including the birth and death entries
    pub history: History,

    pub family: Link,
    pub country: Link,
    pub father: Link,
    pub mother: Link,

    /// Derived from the father and mother references of other characters
    pub children: Vec<u64>,
}

impl Entity for Character {
    const COLLECTION: &'static str = "characters";

    fn id(&self) -> u64 {
        self.id
    }
}

const NO_BIRTH_DATE: &str = "no birth date";

impl Character {
    /// A character with only an ID
    pub fn new(id: u64) -> Self {
        Character {
            id,
            ..Default::default()
        }
    }

    /// Build a character from its save block.
    ///
    /// Save dates are in the founding era calendar and `birth_date` /
    /// `death_date` become history entries. Characters without a birth date
    /// are dropped and `None` is returned.
    pub fn parse_save(
        id: u64,
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Option<Character>, Error> {
        let character = RefCell::new(Character::new(id));
        let mut parser = ctx.parser();
        parser.register("first_name_loc", |key, v| {
            character.borrow_mut().name = skip_malformed(key, read_name(v))?.flatten();
            Ok(())
        });
        parser.register("first_name", |key, v| {
            character.borrow_mut().name = skip_malformed(key, read_name(v))?.flatten();
            Ok(())
        });
        parser.register("nickname", |key, v| {
            character.borrow_mut().nickname = skip_malformed(key, read_name(v))?.flatten();
            Ok(())
        });
        parser.register("culture", |key, v| {
            character.borrow_mut().culture = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("religion", |key, v| {
            character.borrow_mut().religion = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("female", |key, v| {
            if let Some(female) = skip_malformed(key, v.read_bool())? {
                character.borrow_mut().female = female;
            }
            Ok(())
        });
        parser.register("traits", |key, v| {
            if let Some(traits) = skip_malformed(key, v.read_strings())? {
                character.borrow_mut().traits = traits;
            }
            Ok(())
        });
        parser.register("birth_date", |key, v| {
            if let Some(date) = skip_malformed(key, v.read_auc_date())? {
                let value = HistoryValue::Text(String::from("yes"));
                character.borrow_mut().history.add(date, "birth", value);
            }
            Ok(())
        });
        parser.register("death_date", |key, v| {
            if let Some(date) = skip_malformed(key, v.read_auc_date())? {
                let value = HistoryValue::Text(String::from("yes"));
                character.borrow_mut().history.add(date, "death", value);
            }
            Ok(())
        });
        parser.register("family", |key, v| {
            character.borrow_mut().family = read_link(key, v)?;
            Ok(())
        });
        parser.register("country", |key, v| {
            character.borrow_mut().country = read_link(key, v)?;
            Ok(())
        });
        parser.register("father", |key, v| {
            character.borrow_mut().father = read_link(key, v)?;
            Ok(())
        });
        parser.register("mother", |key, v| {
            character.borrow_mut().mother = read_link(key, v)?;
            Ok(())
        });

        ctx.ignore(parser.parse(value.scope()?)?);
        Ok(validate(character.into_inner(), ctx))
    }

    /// Build a character from a script history file entry, where dates are
    /// in the common era and live in dated blocks:
    ///
    /// ```text
    /// 163110 = {
    ///     name = "Alaric" female = no father = 163108
    ///     350.1.1 = { birth = yes }
    ///     410.1.1 = { death = { death_reason = death_illness } }
    /// }
    /// ```
    pub fn parse_history(
        id: u64,
        value: &mut ValueReader<'_, '_>,
        ctx: &mut BuildContext,
    ) -> Result<Option<Character>, Error> {
        let character = RefCell::new(Character::new(id));
        let mut parser = ctx.parser();
        parser.register("name", |key, v| {
            character.borrow_mut().name = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("dynasty", |key, v| {
            character.borrow_mut().dynasty = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("culture", |key, v| {
            character.borrow_mut().culture = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("religion", |key, v| {
            character.borrow_mut().religion = skip_malformed(key, v.read_string())?;
            Ok(())
        });
        parser.register("female", |key, v| {
            if let Some(female) = skip_malformed(key, v.read_bool())? {
                character.borrow_mut().female = female;
            }
            Ok(())
        });
        parser.register("trait", |key, v| {
            if let Some(name) = skip_malformed(key, v.read_string())? {
                character.borrow_mut().traits.push(name);
            }
            Ok(())
        });
        parser.register("father", |key, v| {
            character.borrow_mut().father = read_link(key, v)?;
            Ok(())
        });
        parser.register("mother", |key, v| {
            character.borrow_mut().mother = read_link(key, v)?;
            Ok(())
        });
        parser.register(
            Pattern::Predicate(|s| is_date_like(s.as_bytes())),
            |key, v| {
                let date = match skip_malformed(key, key.read_date(Calendar::Ad))? {
                    Some(date) => date,
                    None => return Ok(()),
                };

                let mut block = Parser::new();
                block.register_catch_all(|field, v| {
                    let value = if v.is_scope() {
                        HistoryValue::Block
                    } else if v.is_absent() {
                        return Ok(());
                    } else {
                        match skip_malformed(field, v.read_string())? {
                            Some(text) => HistoryValue::Text(text),
                            None => return Ok(()),
                        }
                    };
                    character
                        .borrow_mut()
                        .history
                        .add(date, &field.text(), value);
                    Ok(())
                });
                block.parse(v.scope()?)?;
                Ok(())
            },
        );

        ctx.ignore(parser.parse(value.scope()?)?);
        Ok(validate(character.into_inner(), ctx))
    }
}

fn validate(character: Character, ctx: &mut BuildContext) -> Option<Character> {
    if character.history.birth_date().is_none() {
        ctx.drop_entity(Character::COLLECTION, character.id, NO_BIRTH_DATE);
        None
    } else {
        Some(character)
    }
}

/// Read the `character` section: `{ database = { <id> = { .. } } }`
pub fn parse_characters(
    value: &mut ValueReader<'_, '_>,
    ctx: &mut BuildContext,
) -> Result<Collection<Character>, Error> {
    info!("Loading Characters...");
    let mut characters = Collection::new();
    let mut parser = ctx.parser();
    parser.register("database", |_, v| {
        parse_database(v, &mut *ctx, &mut characters, Character::parse_save)
    });

    let ignored = parser.parse(value.scope()?)?;
    ctx.ignore(ignored);
    info!("Loaded {} characters.", characters.len());
    Ok(characters)
}

/// Recompute every character's children from the father and mother
/// references that are not absent. Returns the number of parent to child
/// edges.
pub fn rebuild_children(characters: &mut Collection<Character>) -> usize {
    let mut children: HashMap<u64, Vec<u64>> = HashMap::new();
    for character in characters.iter() {
        for parent in [character.father, character.mother] {
            let parent = parent.resolved().or_else(|| parent.pending());
            if let Some(parent) = parent {
                children.entry(parent).or_default().push(character.id);
            }
        }
    }

    let mut edges = 0;
    for character in characters.iter_mut() {
        character.children = children.remove(&character.id).unwrap_or_default();
        edges += character.children.len();
    }
    edges
}

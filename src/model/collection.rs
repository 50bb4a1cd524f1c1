use crate::errors::{Error, ErrorKind};
use std::collections::HashMap;

/// A record that is keyed by a numeric ID assigned in the source data
pub trait Entity {
    /// Name of the collection the entity lives in, used in errors and logs
    const COLLECTION: &'static str;

    /// The entity's ID
    fn id(&self) -> u64;
}

/// Entities in insertion order with an index by ID.
///
/// ```
/// use rome_loader::model::{Collection, Pop};
///
/// let mut pops = Collection::new();
/// pops.insert(Pop::new(5)).unwrap();
/// assert!(pops.insert(Pop::new(5)).is_err());
/// assert!(pops.get(5).is_some());
/// assert!(pops.lookup(6).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
    index: HashMap<u64, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Entity> Collection<T> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity. An ID that is already present is an error.
    pub fn insert(&mut self, item: T) -> Result<(), Error> {
        let id = item.id();
        if self.index.contains_key(&id) {
            return Err(Error::new(ErrorKind::DuplicateId {
                collection: T::COLLECTION,
                id,
            }));
        }

        self.index.insert(id, self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// Find an entity by ID
    pub fn get(&self, id: u64) -> Option<&T> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    /// Find an entity by ID for modification
    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    /// Find an entity by ID, failing with `NotFound` when it is absent
    pub fn lookup(&self, id: u64) -> Result<&T, Error> {
        self.get(id).ok_or_else(|| {
            Error::new(ErrorKind::NotFound {
                collection: T::COLLECTION,
                id,
            })
        })
    }

    /// Returns true if an entity has the ID
    pub fn contains(&self, id: u64) -> bool {
        self.index.contains_key(&id)
    }

    /// Keep only the entities the predicate accepts. Order is preserved.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.items.retain(f);
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id(), i))
            .collect();
    }
}

impl<T> Collection<T> {
    /// Entities in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Entities in insertion order for modification. IDs must not change.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no entities
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

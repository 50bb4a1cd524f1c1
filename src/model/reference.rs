/// A reference to another entity by ID.
///
/// References are `Pending` from parsing until the linker runs, after which
/// they are either `Resolved` to a live entity or `Absent`.
///
/// ```
/// use rome_loader::model::Link;
///
/// let mut family = Link::Pending(4);
/// assert_eq!(family.resolved(), None);
/// family.resolve(|id| id == 4);
/// assert_eq!(family.resolved(), Some(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Link<I = u64> {
    /// No reference
    #[default]
    Absent,

    /// Parsed but not yet checked against the target collection
    Pending(I),

    /// Points at a live entity
    Resolved(I),
}

impl<I: Copy> Link<I> {
    /// Create a pending link from an optional ID
    pub fn from_id(id: Option<I>) -> Self {
        match id {
            Some(id) => Link::Pending(id),
            None => Link::Absent,
        }
    }

    /// The ID of a resolved link
    pub fn resolved(&self) -> Option<I> {
        match self {
            Link::Resolved(id) => Some(*id),
            _ => None,
        }
    }

    /// The ID of a link that has not been linked yet
    pub fn pending(&self) -> Option<I> {
        match self {
            Link::Pending(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns true for pending links
    pub fn is_pending(&self) -> bool {
        matches!(self, Link::Pending(_))
    }

    /// Resolve a pending link if the target exists, otherwise make it
    /// absent. Returns the outcome for pending links and `None` for links
    /// that were not pending.
    pub fn resolve<F>(&mut self, exists: F) -> Option<Result<I, I>>
    where
        F: FnOnce(I) -> bool,
    {
        let id = self.pending()?;
        if exists(id) {
            *self = Link::Resolved(id);
            Some(Ok(id))
        } else {
            *self = Link::Absent;
            Some(Err(id))
        }
    }
}

/// A list of references to other entities by ID. Like [`Link`], the whole
/// list is either pending or resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Links<I = u64> {
    /// Parsed but not yet checked against the target collection
    Pending(Vec<I>),

    /// Only IDs of live entities
    Resolved(Vec<I>),
}

impl<I> Default for Links<I> {
    fn default() -> Self {
        Links::Pending(Vec::new())
    }
}

impl<I: Copy> Links<I> {
    /// Add a pending ID
    pub fn push_pending(&mut self, id: I) {
        if let Links::Pending(ids) = self {
            ids.push(id);
        }
    }

    /// IDs of live entities. Empty until linked.
    pub fn resolved(&self) -> &[I] {
        match self {
            Links::Resolved(ids) => ids,
            Links::Pending(_) => &[],
        }
    }

    /// Returns true while the list has not been linked
    pub fn is_pending(&self) -> bool {
        matches!(self, Links::Pending(_))
    }

    /// Keep the pending IDs that exist and return the ones that don't. A
    /// resolved list is left alone.
    pub fn resolve<F>(&mut self, mut exists: F) -> Vec<I>
    where
        F: FnMut(I) -> bool,
    {
        let pending = match self {
            Links::Pending(ids) => std::mem::take(ids),
            Links::Resolved(_) => return Vec::new(),
        };

        let (live, orphans): (Vec<I>, Vec<I>) = pending.into_iter().partition(|&id| exists(id));
        *self = Links::Resolved(live);
        orphans
    }
}

//! Search handles and the table of virtual listings behind them.

use std::collections::HashMap;

/// One snapshotted search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listed {
    /// A virtual file, by its backing path
    File(String),
    /// A virtual folder, by its apparent path
    Folder(String),
}

impl Listed {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Listed::File(path) | Listed::Folder(path) => path,
        }
    }
}

#[derive(Debug)]
enum Inner<S> {
    Virtual(u64),
    Real(S),
}

/// Handle returned by a find-first call.
///
/// Either a listing owned by the engine or a search the real filesystem
/// opened; callers cannot tell them apart.
#[derive(Debug)]
pub struct SearchHandle<S>(Inner<S>);

impl<S> SearchHandle<S> {
    pub(crate) fn virtual_listing(id: u64) -> Self {
        Self(Inner::Virtual(id))
    }

    pub(crate) fn real(search: S) -> Self {
        Self(Inner::Real(search))
    }

    #[must_use]
    pub fn is_virtual(&self) -> bool {
        matches!(self.0, Inner::Virtual(_))
    }

    pub(crate) fn virtual_id(&self) -> Option<u64> {
        match self.0 {
            Inner::Virtual(id) => Some(id),
            Inner::Real(_) => None,
        }
    }

    pub(crate) fn real_mut(&mut self) -> Option<&mut S> {
        match &mut self.0 {
            Inner::Real(search) => Some(search),
            Inner::Virtual(_) => None,
        }
    }

    pub(crate) fn into_real(self) -> Result<S, u64> {
        match self.0 {
            Inner::Real(search) => Ok(search),
            Inner::Virtual(id) => Err(id),
        }
    }
}

/// Open virtual listings, consumed back to front
#[derive(Debug, Default)]
pub struct SearchTable {
    next_id: u64,
    listings: HashMap<u64, Vec<Listed>>,
}

impl SearchTable {
    /// Stores a listing and returns its id
    pub fn open(&mut self, listing: Vec<Listed>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        _ = self.listings.insert(id, listing);
        id
    }

    /// Takes the next entry. `None` when exhausted or unknown.
    pub fn pop(&mut self, id: u64) -> Option<Listed> {
        self.listings.get_mut(&id)?.pop()
    }

    /// Drops a listing; false when the id was not open
    pub fn close(&mut self, id: u64) -> bool {
        self.listings.remove(&id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

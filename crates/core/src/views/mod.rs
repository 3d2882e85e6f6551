//! Identity-stable views over a [`ServerState`].
//!
//! Every view is materialized through a [`Memo`] keyed on the snapshot's
//! identity, so for one snapshot the same id always resolves to the same `Arc`,
//! whether it is reached directly or through `parent` / `children`. Consumers
//! can compare views with `Arc::ptr_eq` instead of comparing contents.

mod album;
mod catalog;
mod hierarchy;
mod person;
mod search;
mod tag;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

pub use album::Album;
pub use catalog::Catalog;
pub use hierarchy::Hierarchy;
pub use person::Person;
pub use search::SavedSearch;
pub use tag::Tag;

use crate::error::Result;
use crate::memo::{KeyPart, Memo, MemoKey};
use crate::reference::Reference;
use crate::state::{Record, ServerState, UserState};

/// A shared, ordered list of views.
pub type ViewList<T> = Arc<[Arc<T>]>;

pub type ByIdMemo<T> = Memo<(Arc<ServerState>, Reference<T>), Arc<T>>;
pub type ListMemo<K, T> = Memo<(Arc<ServerState>, Reference<K>), ViewList<T>>;
pub type ChildMemo<T> = Memo<(Arc<ServerState>, Reference<Catalog>, Reference<T>), ViewList<T>>;

/// The view cache. Create one per process (or per test); nothing is global.
///
/// Entries are kept for as long as the `Views` lives unless released with
/// [`Views::retain`] or [`Views::clear`].
#[derive(Default)]
pub struct Views {
    catalog_list: Memo<(Arc<ServerState>,), ViewList<Catalog>>,
    catalogs: ByIdMemo<Catalog>,
    albums: ByIdMemo<Album>,
    tags: ByIdMemo<Tag>,
    people: ByIdMemo<Person>,
    searches: ByIdMemo<SavedSearch>,
    catalog_albums: ListMemo<Catalog, Album>,
    root_albums: ListMemo<Catalog, Album>,
    catalog_tags: ListMemo<Catalog, Tag>,
    root_tags: ListMemo<Catalog, Tag>,
    catalog_people: ListMemo<Catalog, Person>,
    catalog_searches: ListMemo<Catalog, SavedSearch>,
    album_children: ChildMemo<Album>,
    tag_children: ChildMemo<Tag>,
}

impl Views {
    pub fn new() -> Self {
        Self::default()
    }

    /// All catalogs of the logged-in user; empty when logged out.
    pub fn catalogs(&self, state: &Arc<ServerState>) -> Result<ViewList<Catalog>> {
        self.catalog_list.get_or_try_init(&(state.clone(),), || {
            let Some(user) = state.user.as_ref() else {
                return Ok(Arc::from(Vec::new()));
            };
            let catalogs = user
                .catalogs
                .keys()
                .map(|id| Catalog::from_state(self, state, id))
                .collect::<Result<Vec<_>>>()?;
            Ok(catalogs.into())
        })
    }

    /// Number of cached views and view lists.
    pub fn len(&self) -> usize {
        self.catalog_list.len()
            + self.catalogs.len()
            + self.albums.len()
            + self.tags.len()
            + self.people.len()
            + self.searches.len()
            + self.catalog_albums.len()
            + self.root_albums.len()
            + self.catalog_tags.len()
            + self.root_tags.len()
            + self.catalog_people.len()
            + self.catalog_searches.len()
            + self.album_children.len()
            + self.tag_children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops everything cached for snapshots other than `live`.
    ///
    /// Views own their snapshot, so cached views keep old snapshots alive until
    /// this is called (typically with just the current snapshot after a
    /// replacement). Returns the number of entries dropped.
    pub fn retain(&self, live: &[&Arc<ServerState>]) -> usize {
        let live: HashSet<KeyPart> = live
            .iter()
            .map(|state| state.memo_key().part().clone())
            .collect();
        let keep = |part: &KeyPart| live.contains(part);
        let dropped = self.catalog_list.retain_leading(keep)
            + self.catalogs.retain_leading(keep)
            + self.albums.retain_leading(keep)
            + self.tags.retain_leading(keep)
            + self.people.retain_leading(keep)
            + self.searches.retain_leading(keep)
            + self.catalog_albums.retain_leading(keep)
            + self.root_albums.retain_leading(keep)
            + self.catalog_tags.retain_leading(keep)
            + self.root_tags.retain_leading(keep)
            + self.catalog_people.retain_leading(keep)
            + self.catalog_searches.retain_leading(keep)
            + self.album_children.retain_leading(keep)
            + self.tag_children.retain_leading(keep);
        debug!(dropped, "released views of stale snapshots");
        dropped
    }

    pub fn clear(&self) {
        self.catalog_list.clear();
        self.catalogs.clear();
        self.albums.clear();
        self.tags.clear();
        self.people.clear();
        self.searches.clear();
        self.catalog_albums.clear();
        self.root_albums.clear();
        self.catalog_tags.clear();
        self.root_tags.clear();
        self.catalog_people.clear();
        self.catalog_searches.clear();
        self.album_children.clear();
        self.tag_children.clear();
    }
}

/// A view kind resolvable from a snapshot by id.
pub trait Entity: Sized + Send + Sync + 'static {
    type Record: Record<Kind = Self> + Send + Sync + 'static;

    /// Finds the record for `id` among the user's catalogs, or fails with the
    /// kind's `Unknown*` error.
    fn lookup(user: &UserState, id: &Reference<Self>) -> Result<Arc<Self::Record>>;

    fn wrap(state: Arc<ServerState>, record: Arc<Self::Record>) -> Self;

    fn memo(views: &Views) -> &ByIdMemo<Self>;

    fn state(&self) -> &Arc<ServerState>;

    fn record(&self) -> &Arc<Self::Record>;

    /// Resolves `id` in `state`. The same `(state, id)` pair always yields the same `Arc`.
    fn from_state(
        views: &Views,
        state: &Arc<ServerState>,
        id: impl Into<Reference<Self>>,
    ) -> Result<Arc<Self>> {
        let id = id.into();
        Self::memo(views).get_or_try_init(&(state.clone(), id.clone()), || {
            let record = Self::lookup(state.user()?, &id)?;
            Ok(Arc::new(Self::wrap(state.clone(), record)))
        })
    }

    /// Like [`Entity::from_state`], but an unresolvable id yields `None`.
    fn safe_from_state(
        views: &Views,
        state: &Arc<ServerState>,
        id: impl Into<Reference<Self>>,
    ) -> Option<Arc<Self>> {
        match Self::from_state(views, state, id) {
            Ok(view) => Some(view),
            Err(err) if err.is_lookup_failure() => {
                debug!(code = ?err.code(), "lookup failed: {err}");
                None
            }
            Err(err) => {
                warn!("unexpected error resolving view: {err}");
                None
            }
        }
    }

    /// Builds a typed reference from a raw id or a record.
    fn reference(data: impl Into<Reference<Self>>) -> Reference<Self> {
        data.into()
    }

    fn to_ref(&self) -> Reference<Self> {
        self.record().id().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::state::{AlbumState, CatalogState};

    fn sample_state() -> Arc<ServerState> {
        let c1 = CatalogState::new("c1", "Family")
            .with_album(AlbumState::new("a1", "c1", "Holidays"));
        let c2 = CatalogState::new("c2", "Work");
        ServerState::new(UserState::new("me@example.com").with_catalog(c1).with_catalog(c2))
    }

    #[test]
    fn test_catalogs_listing_memoized() {
        let views = Views::new();
        let state = sample_state();

        let first = views.catalogs(&state).unwrap();
        let second = views.catalogs(&state).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let ids: Vec<&str> = first.iter().map(|c| c.id().id()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);

        let c1 = Catalog::from_state(&views, &state, "c1").unwrap();
        assert!(Arc::ptr_eq(&first[0], &c1));
    }

    #[test]
    fn test_catalogs_empty_when_logged_out() {
        let views = Views::new();
        let catalogs = views.catalogs(&ServerState::logged_out()).unwrap();
        assert!(catalogs.is_empty());
    }

    #[test]
    fn test_failed_lookup_not_cached() {
        let views = Views::new();
        let state = sample_state();
        let err = Catalog::from_state(&views, &state, "nope").unwrap_err();
        assert!(matches!(err, Error::UnknownCatalog(_)));
        assert!(views.is_empty());
    }

    #[test]
    fn test_reference_from_id_or_record() {
        let record = AlbumState::new("a1", "c1", "Holidays");
        assert_eq!(Album::reference("a1"), Album::reference(&record));
    }

    #[test]
    fn test_retain_releases_stale_snapshots() {
        let views = Views::new();
        let old = sample_state();
        let current = old
            .update_catalog(&"c2".into(), |c| CatalogState::new(c.id.clone(), "Office"))
            .unwrap();

        let old_list = views.catalogs(&old).unwrap();
        views.catalogs(&current).unwrap();
        assert_eq!(views.retain(&[&old, &current]), 0);

        let before = views.len();
        let dropped = views.retain(&[&current]);
        assert!(dropped > 0);
        assert_eq!(views.len(), before - dropped);

        // Only the caller's handles keep the old snapshot alive now.
        drop(old_list);
        assert_eq!(Arc::strong_count(&old), 1);

        let c2 = Catalog::from_state(&views, &current, "c2").unwrap();
        assert_eq!(c2.name(), "Office");
        assert!(Catalog::safe_from_state(&views, &old, "c2").is_some());
    }

    #[test]
    fn test_clear() {
        let views = Views::new();
        let state = sample_state();
        let before = Catalog::from_state(&views, &state, "c1").unwrap();
        views.clear();
        assert!(views.is_empty());
        let after = Catalog::from_state(&views, &state, "c1").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }
}

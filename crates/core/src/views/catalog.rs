use std::fmt;
use std::sync::Arc;

use super::{
    Album, ByIdMemo, Entity, Hierarchy, ListMemo, Person, SavedSearch, Tag, ViewList, Views,
};
use crate::error::Result;
use crate::reference::Reference;
use crate::state::{CatalogState, ServerState, UserState};

/// A catalog and the albums, tags, people and saved searches it owns.
pub struct Catalog {
    state: Arc<ServerState>,
    record: Arc<CatalogState>,
}

impl Catalog {
    pub fn id(&self) -> &Reference<Catalog> {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn storage(&self) -> Option<&str> {
        self.record.storage.as_deref()
    }

    pub fn albums(&self, views: &Views) -> Result<ViewList<Album>> {
        self.materialize(views, &views.catalog_albums, |c| {
            c.albums.keys().cloned().collect()
        })
    }

    pub fn root_albums(&self, views: &Views) -> Result<ViewList<Album>> {
        self.materialize(views, &views.root_albums, |c| Album::child_ids(c, None))
    }

    pub fn tags(&self, views: &Views) -> Result<ViewList<Tag>> {
        self.materialize(views, &views.catalog_tags, |c| c.tags.keys().cloned().collect())
    }

    pub fn root_tags(&self, views: &Views) -> Result<ViewList<Tag>> {
        self.materialize(views, &views.root_tags, |c| Tag::child_ids(c, None))
    }

    pub fn people(&self, views: &Views) -> Result<ViewList<Person>> {
        self.materialize(views, &views.catalog_people, |c| {
            c.people.keys().cloned().collect()
        })
    }

    pub fn searches(&self, views: &Views) -> Result<ViewList<SavedSearch>> {
        self.materialize(views, &views.catalog_searches, |c| {
            c.searches.keys().cloned().collect()
        })
    }

    fn materialize<T: Entity>(
        &self,
        views: &Views,
        memo: &ListMemo<Catalog, T>,
        ids: impl FnOnce(&CatalogState) -> Vec<Reference<T>>,
    ) -> Result<ViewList<T>> {
        memo.get_or_try_init(&(self.state.clone(), self.id().clone()), || {
            ids(&self.record)
                .into_iter()
                .map(|id| T::from_state(views, &self.state, id))
                .collect::<Result<Vec<_>>>()
                .map(Into::into)
        })
    }
}

impl Entity for Catalog {
    type Record = CatalogState;

    fn lookup(user: &UserState, id: &Reference<Self>) -> Result<Arc<CatalogState>> {
        user.catalog(id).cloned()
    }

    fn wrap(state: Arc<ServerState>, record: Arc<CatalogState>) -> Self {
        Self { state, record }
    }

    fn memo(views: &Views) -> &ByIdMemo<Self> {
        &views.catalogs
    }

    fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    fn record(&self) -> &Arc<CatalogState> {
        &self.record
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .finish_non_exhaustive()
    }
}

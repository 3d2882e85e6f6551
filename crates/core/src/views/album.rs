use std::fmt;
use std::sync::Arc;

use super::{ByIdMemo, Catalog, ChildMemo, Entity, Hierarchy, Views};
use crate::error::{Error, Result};
use crate::reference::{ref_is, Reference};
use crate::state::{AlbumState, CatalogState, ServerState, UserState};

/// An album, possibly nested under a parent album of the same catalog.
pub struct Album {
    state: Arc<ServerState>,
    record: Arc<AlbumState>,
}

impl Album {
    pub fn id(&self) -> &Reference<Album> {
        &self.record.id
    }
}

impl Entity for Album {
    type Record = AlbumState;

    fn lookup(user: &UserState, id: &Reference<Self>) -> Result<Arc<AlbumState>> {
        user.find_album(id)
            .cloned()
            .ok_or_else(|| Error::UnknownAlbum(id.id().to_string()))
    }

    fn wrap(state: Arc<ServerState>, record: Arc<AlbumState>) -> Self {
        Self { state, record }
    }

    fn memo(views: &Views) -> &ByIdMemo<Self> {
        &views.albums
    }

    fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    fn record(&self) -> &Arc<AlbumState> {
        &self.record
    }
}

impl Hierarchy for Album {
    fn name(&self) -> &str {
        &self.record.name
    }

    fn catalog_ref(&self) -> &Reference<Catalog> {
        &self.record.catalog
    }

    fn parent_ref(&self) -> Option<&Reference<Self>> {
        self.record.parent.as_ref()
    }

    fn child_ids(catalog: &CatalogState, parent: Option<&Reference<Self>>) -> Vec<Reference<Self>> {
        catalog
            .albums
            .values()
            .filter(|album| ref_is(album.parent.as_ref(), parent))
            .map(|album| album.id.clone())
            .collect()
    }

    fn children_memo(views: &Views) -> &ChildMemo<Self> {
        &views.album_children
    }
}

impl fmt::Debug for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Album")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .field("parent", &self.record.parent)
            .finish_non_exhaustive()
    }
}

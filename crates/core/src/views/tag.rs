use std::fmt;
use std::sync::Arc;

use super::{ByIdMemo, Catalog, ChildMemo, Entity, Hierarchy, Views};
use crate::error::{Error, Result};
use crate::reference::{ref_is, Reference};
use crate::state::{CatalogState, ServerState, TagState, UserState};

/// A tag, possibly nested under a parent tag of the same catalog.
pub struct Tag {
    state: Arc<ServerState>,
    record: Arc<TagState>,
}

impl Tag {
    pub fn id(&self) -> &Reference<Tag> {
        &self.record.id
    }
}

impl Entity for Tag {
    type Record = TagState;

    fn lookup(user: &UserState, id: &Reference<Self>) -> Result<Arc<TagState>> {
        user.find_tag(id)
            .cloned()
            .ok_or_else(|| Error::UnknownTag(id.id().to_string()))
    }

    fn wrap(state: Arc<ServerState>, record: Arc<TagState>) -> Self {
        Self { state, record }
    }

    fn memo(views: &Views) -> &ByIdMemo<Self> {
        &views.tags
    }

    fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    fn record(&self) -> &Arc<TagState> {
        &self.record
    }
}

impl Hierarchy for Tag {
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
            .tags
            .values()
            .filter(|tag| ref_is(tag.parent.as_ref(), parent))
            .map(|tag| tag.id.clone())
            .collect()
    }

    fn children_memo(views: &Views) -> &ChildMemo<Self> {
        &views.tag_children
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .field("parent", &self.record.parent)
            .finish_non_exhaustive()
    }
}

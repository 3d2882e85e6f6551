use std::fmt;
use std::sync::Arc;

use super::{ByIdMemo, Catalog, Entity, Views};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::reference::Reference;
use crate::state::{SavedSearchState, ServerState, UserState};

/// A named query stored in a catalog.
pub struct SavedSearch {
    state: Arc<ServerState>,
    record: Arc<SavedSearchState>,
}

impl SavedSearch {
    pub fn id(&self) -> &Reference<SavedSearch> {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn shared(&self) -> bool {
        self.record.shared
    }

    pub fn query(&self) -> &Query {
        &self.record.query
    }

    pub fn catalog(&self, views: &Views) -> Result<Arc<Catalog>> {
        Catalog::from_state(views, &self.state, &self.record.catalog)
    }
}

impl Entity for SavedSearch {
    type Record = SavedSearchState;

    fn lookup(user: &UserState, id: &Reference<Self>) -> Result<Arc<SavedSearchState>> {
        user.find_search(id)
            .cloned()
            .ok_or_else(|| Error::UnknownSearch(id.id().to_string()))
    }

    fn wrap(state: Arc<ServerState>, record: Arc<SavedSearchState>) -> Self {
        Self { state, record }
    }

    fn memo(views: &Views) -> &ByIdMemo<Self> {
        &views.searches
    }

    fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    fn record(&self) -> &Arc<SavedSearchState> {
        &self.record
    }
}

impl fmt::Debug for SavedSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavedSearch")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .field("shared", &self.record.shared)
            .finish_non_exhaustive()
    }
}

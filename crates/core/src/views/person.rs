use std::fmt;
use std::sync::Arc;

use super::{ByIdMemo, Catalog, Entity, Views};
use crate::error::{Error, Result};
use crate::reference::Reference;
use crate::state::{PersonState, ServerState, UserState};

pub struct Person {
    state: Arc<ServerState>,
    record: Arc<PersonState>,
}

impl Person {
    pub fn id(&self) -> &Reference<Person> {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn catalog(&self, views: &Views) -> Result<Arc<Catalog>> {
        Catalog::from_state(views, &self.state, &self.record.catalog)
    }
}

impl Entity for Person {
    type Record = PersonState;

    fn lookup(user: &UserState, id: &Reference<Self>) -> Result<Arc<PersonState>> {
        user.find_person(id)
            .cloned()
            .ok_or_else(|| Error::UnknownPerson(id.id().to_string()))
    }

    fn wrap(state: Arc<ServerState>, record: Arc<PersonState>) -> Self {
        Self { state, record }
    }

    fn memo(views: &Views) -> &ByIdMemo<Self> {
        &views.people
    }

    fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    fn record(&self) -> &Arc<PersonState> {
        &self.record
    }
}

impl fmt::Debug for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Person")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .finish_non_exhaustive()
    }
}

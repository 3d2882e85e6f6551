//! The normalized server snapshot.
//!
//! A [`ServerState`] is never mutated after construction. Every `with_*` /
//! `without_*` helper builds a new snapshot and reuses untouched branches by
//! `Arc`, so identity-keyed caches keep their entries for those branches.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::query::Query;
use crate::reference::Reference;
use crate::views::{Album, Catalog, Person, SavedSearch, Tag};

/// Records of one kind, keyed by id.
pub type RecordMap<T, R> = BTreeMap<Reference<T>, Arc<R>>;

/// A normalized record that knows its own id.
pub trait Record {
    type Kind;

    fn id(&self) -> &Reference<Self::Kind>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerState {
    #[serde(default)]
    pub user: Option<Arc<UserState>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(default, with = "records")]
    pub catalogs: RecordMap<Catalog, CatalogState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogState {
    pub id: Reference<Catalog>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, with = "records")]
    pub albums: RecordMap<Album, AlbumState>,
    #[serde(default, with = "records")]
    pub tags: RecordMap<Tag, TagState>,
    #[serde(default, with = "records")]
    pub people: RecordMap<Person, PersonState>,
    #[serde(default, with = "records")]
    pub searches: RecordMap<SavedSearch, SavedSearchState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumState {
    pub id: Reference<Album>,
    pub catalog: Reference<Catalog>,
    pub name: String,
    #[serde(default)]
    pub parent: Option<Reference<Album>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagState {
    pub id: Reference<Tag>,
    pub catalog: Reference<Catalog>,
    pub name: String,
    #[serde(default)]
    pub parent: Option<Reference<Tag>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonState {
    pub id: Reference<Person>,
    pub catalog: Reference<Catalog>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearchState {
    pub id: Reference<SavedSearch>,
    pub catalog: Reference<Catalog>,
    pub name: String,
    #[serde(default)]
    pub shared: bool,
    pub query: Query,
}

macro_rules! record {
    ($record:ty, $kind:ty) => {
        impl Record for $record {
            type Kind = $kind;

            fn id(&self) -> &Reference<$kind> {
                &self.id
            }
        }

        impl From<&$record> for Reference<$kind> {
            fn from(record: &$record) -> Self {
                record.id.clone()
            }
        }
    };
}

record!(CatalogState, Catalog);
record!(AlbumState, Album);
record!(TagState, Tag);
record!(PersonState, Person);
record!(SavedSearchState, SavedSearch);

/// Record maps travel as arrays and are keyed by id on decode.
mod records {
    use std::sync::Arc;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Record, RecordMap};

    pub fn serialize<S, K, R>(map: &RecordMap<K, R>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        R: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, K, R>(deserializer: D) -> Result<RecordMap<K, R>, D::Error>
    where
        D: Deserializer<'de>,
        R: Deserialize<'de> + Record<Kind = K>,
    {
        let list = Vec::<R>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|record| (record.id().clone(), Arc::new(record)))
            .collect())
    }
}

// ── ServerState ──────────────────────────────────────────────────

impl ServerState {
    pub fn logged_out() -> Arc<Self> {
        Arc::new(Self { user: None })
    }

    pub fn new(user: UserState) -> Arc<Self> {
        Arc::new(Self {
            user: Some(Arc::new(user)),
        })
    }

    pub fn from_json(json: &str) -> Result<Arc<Self>> {
        Ok(Arc::new(serde_json::from_str(json)?))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn user(&self) -> Result<&Arc<UserState>> {
        self.user.as_ref().ok_or(Error::NotLoggedIn)
    }

    /// New snapshot with `catalog` inserted or replaced. Other catalogs are shared.
    pub fn with_catalog(&self, catalog: CatalogState) -> Result<Arc<Self>> {
        Ok(Self::new(self.user()?.with_catalog(catalog)))
    }

    pub fn without_catalog(&self, id: &Reference<Catalog>) -> Result<Arc<Self>> {
        Ok(Self::new(self.user()?.without_catalog(id)))
    }

    /// New snapshot where the catalog `id` is replaced by `update(old)`.
    pub fn update_catalog(
        &self,
        id: &Reference<Catalog>,
        update: impl FnOnce(&CatalogState) -> CatalogState,
    ) -> Result<Arc<Self>> {
        let user = self.user()?;
        let catalog = user.catalog(id)?;
        Ok(Self::new(user.with_catalog(update(catalog))))
    }
}

// ── UserState ────────────────────────────────────────────────────

impl UserState {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            fullname: None,
            catalogs: BTreeMap::new(),
        }
    }

    pub fn catalog(&self, id: &Reference<Catalog>) -> Result<&Arc<CatalogState>> {
        self.catalogs
            .get(id)
            .ok_or_else(|| Error::UnknownCatalog(id.id().to_string()))
    }

    pub fn with_catalog(&self, catalog: CatalogState) -> Self {
        let mut catalogs = self.catalogs.clone();
        catalogs.insert(catalog.id.clone(), Arc::new(catalog));
        Self {
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            catalogs,
        }
    }

    pub fn without_catalog(&self, id: &Reference<Catalog>) -> Self {
        let mut catalogs = self.catalogs.clone();
        catalogs.remove(id);
        Self {
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            catalogs,
        }
    }

    pub fn find_album(&self, id: &Reference<Album>) -> Option<&Arc<AlbumState>> {
        self.catalogs.values().find_map(|c| c.albums.get(id))
    }

    pub fn find_tag(&self, id: &Reference<Tag>) -> Option<&Arc<TagState>> {
        self.catalogs.values().find_map(|c| c.tags.get(id))
    }

    pub fn find_person(&self, id: &Reference<Person>) -> Option<&Arc<PersonState>> {
        self.catalogs.values().find_map(|c| c.people.get(id))
    }

    pub fn find_search(&self, id: &Reference<SavedSearch>) -> Option<&Arc<SavedSearchState>> {
        self.catalogs.values().find_map(|c| c.searches.get(id))
    }
}

// ── CatalogState ─────────────────────────────────────────────────

fn with_record<K, R: Record<Kind = K>>(map: &RecordMap<K, R>, record: R) -> RecordMap<K, R> {
    let mut map = map.clone();
    map.insert(record.id().clone(), Arc::new(record));
    map
}

fn without_record<K, R>(map: &RecordMap<K, R>, id: &Reference<K>) -> RecordMap<K, R> {
    let mut map = map.clone();
    map.remove(id);
    map
}

impl CatalogState {
    pub fn new(id: impl Into<Reference<Catalog>>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            storage: None,
            albums: BTreeMap::new(),
            tags: BTreeMap::new(),
            people: BTreeMap::new(),
            searches: BTreeMap::new(),
        }
    }

    pub fn with_album(&self, album: AlbumState) -> Self {
        Self {
            albums: with_record(&self.albums, album),
            ..self.clone()
        }
    }

    pub fn without_album(&self, id: &Reference<Album>) -> Self {
        Self {
            albums: without_record(&self.albums, id),
            ..self.clone()
        }
    }

    pub fn with_tag(&self, tag: TagState) -> Self {
        Self {
            tags: with_record(&self.tags, tag),
            ..self.clone()
        }
    }

    pub fn without_tag(&self, id: &Reference<Tag>) -> Self {
        Self {
            tags: without_record(&self.tags, id),
            ..self.clone()
        }
    }

    pub fn with_person(&self, person: PersonState) -> Self {
        Self {
            people: with_record(&self.people, person),
            ..self.clone()
        }
    }

    pub fn with_search(&self, search: SavedSearchState) -> Self {
        Self {
            searches: with_record(&self.searches, search),
            ..self.clone()
        }
    }
}

impl AlbumState {
    pub fn new(
        id: impl Into<Reference<Album>>,
        catalog: impl Into<Reference<Catalog>>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            catalog: catalog.into(),
            name: name.into(),
            parent: None,
        }
    }

    pub fn with_parent(self, parent: impl Into<Reference<Album>>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..self
        }
    }
}

impl TagState {
    pub fn new(
        id: impl Into<Reference<Tag>>,
        catalog: impl Into<Reference<Catalog>>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            catalog: catalog.into(),
            name: name.into(),
            parent: None,
        }
    }

    pub fn with_parent(self, parent: impl Into<Reference<Tag>>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..self
        }
    }
}

impl PersonState {
    pub fn new(
        id: impl Into<Reference<Person>>,
        catalog: impl Into<Reference<Catalog>>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            catalog: catalog.into(),
            name: name.into(),
        }
    }
}

impl SavedSearchState {
    pub fn new(
        id: impl Into<Reference<SavedSearch>>,
        catalog: impl Into<Reference<Catalog>>,
        name: impl Into<String>,
        query: Query,
    ) -> Self {
        Self {
            id: id.into(),
            catalog: catalog.into(),
            name: name.into(),
            shared: false,
            query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserState {
        let c1 = CatalogState::new("c1", "Family")
            .with_album(AlbumState::new("a1", "c1", "Holidays"))
            .with_album(AlbumState::new("a2", "c1", "Beach").with_parent("a1"));
        let c2 = CatalogState::new("c2", "Work").with_tag(TagState::new("t1", "c2", "Draft"));
        UserState::new("me@example.com")
            .with_catalog(c1)
            .with_catalog(c2)
    }

    #[test]
    fn test_logged_out_user_fails() {
        let state = ServerState::logged_out();
        assert!(matches!(state.user(), Err(Error::NotLoggedIn)));
        assert!(matches!(
            state.without_catalog(&"c1".into()),
            Err(Error::NotLoggedIn)
        ));
    }

    #[test]
    fn test_find_records_across_catalogs() {
        let user = sample_user();
        assert_eq!(user.find_album(&"a2".into()).unwrap().name, "Beach");
        assert_eq!(user.find_tag(&"t1".into()).unwrap().catalog.id(), "c2");
        assert!(user.find_album(&"t1".into()).is_none());
        assert!(user.find_person(&"p1".into()).is_none());
    }

    #[test]
    fn test_derived_state_shares_untouched_catalogs() {
        let state = ServerState::new(sample_user());
        let derived = state
            .update_catalog(&"c1".into(), |c| c.without_album(&"a2".into()))
            .unwrap();

        let old_user = state.user().unwrap();
        let new_user = derived.user().unwrap();
        let c2: Reference<Catalog> = "c2".into();
        assert!(Arc::ptr_eq(
            old_user.catalog(&c2).unwrap(),
            new_user.catalog(&c2).unwrap()
        ));
        // Album a1 survives by reference in the rebuilt catalog.
        let a1: Reference<Album> = "a1".into();
        assert!(Arc::ptr_eq(
            old_user.find_album(&a1).unwrap(),
            new_user.find_album(&a1).unwrap()
        ));
        assert!(new_user.find_album(&"a2".into()).is_none());
        // The original snapshot is untouched.
        assert!(old_user.find_album(&"a2".into()).is_some());
    }

    #[test]
    fn test_unknown_catalog() {
        let state = ServerState::new(sample_user());
        let err = state
            .update_catalog(&"nope".into(), |c| c.clone())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCatalog(id) if id == "nope"));
    }

    #[test]
    fn test_json_records_keyed_by_id() {
        let json = r#"{
            "user": {
                "email": "me@example.com",
                "catalogs": [{
                    "id": "c1",
                    "name": "Family",
                    "albums": [
                        { "id": "a2", "catalog": "c1", "name": "Beach", "parent": "a1" },
                        { "id": "a1", "catalog": "c1", "name": "Holidays", "parent": null }
                    ]
                }]
            }
        }"#;
        let state = ServerState::from_json(json).unwrap();
        let user = state.user().unwrap();
        let catalog = user.catalog(&"c1".into()).unwrap();
        let ids: Vec<&str> = catalog.albums.keys().map(Reference::id).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
        assert!(catalog.tags.is_empty());

        let again = ServerState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(*again, *state);
    }

    #[test]
    fn test_json_logged_out() {
        let state = ServerState::from_json(r#"{ "user": null }"#).unwrap();
        assert!(state.user.is_none());
        let empty = ServerState::from_json("{}").unwrap();
        assert!(empty.user.is_none());
    }
}

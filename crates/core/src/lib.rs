pub mod error;
pub mod memo;
pub mod query;
pub mod reference;
pub mod state;
pub mod views;

pub use error::{Error, ErrorCode, Result};
pub use memo::{memoize, try_memoize, Memo, Memoized};
pub use query::{
    is_compound_query, is_relation_query, CompoundQuery, FieldQuery, Join, Modifier, Operator,
    Query, QueryValue, Relation, RelationType,
};
pub use reference::{ref_id, ref_is, Reference};
pub use state::{
    AlbumState, CatalogState, PersonState, SavedSearchState, ServerState, TagState, UserState,
};
pub use views::{Album, Catalog, Entity, Hierarchy, Person, SavedSearch, Tag, ViewList, Views};

pub mod catalogs;
pub mod query;
pub mod search;
pub mod tree;

use std::sync::Arc;

use anyhow::Result;
use photostate_core::query::schema;
use photostate_core::{Entity, SavedSearch, ServerState, Views};
use tracing::warn;

pub fn run(views: &Views, state: &Arc<ServerState>, id: &str) -> Result<()> {
    let search = SavedSearch::from_state(views, state, id)?;
    let catalog = search.catalog(views)?;

    println!();
    println!("  {} [{}]", search.name(), search.id());
    println!("  Catalog: {}", catalog.name());
    println!("  Shared:  {}", if search.shared() { "yes" } else { "no" });
    if let Err(err) = schema::validate(search.query(), None) {
        warn!(id, "saved search does not validate: {err}");
    }
    println!();
    println!("{}", serde_json::to_string_pretty(search.query())?);
    Ok(())
}

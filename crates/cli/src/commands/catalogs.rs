use std::sync::Arc;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use photostate_core::{Catalog, ServerState, Views};

/// Counts shown for one catalog row.
#[derive(Debug, PartialEq)]
pub(crate) struct CatalogCounts {
    pub(crate) albums: usize,
    pub(crate) tags: usize,
    pub(crate) people: usize,
    pub(crate) searches: usize,
}

impl CatalogCounts {
    pub(crate) fn of(views: &Views, catalog: &Catalog) -> Result<Self> {
        Ok(Self {
            albums: catalog.albums(views)?.len(),
            tags: catalog.tags(views)?.len(),
            people: catalog.people(views)?.len(),
            searches: catalog.searches(views)?.len(),
        })
    }
}

pub fn run(views: &Views, state: &Arc<ServerState>) -> Result<()> {
    let user = state.user()?;
    let catalogs = views.catalogs(state)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Storage"),
        Cell::new("Albums"),
        Cell::new("Tags"),
        Cell::new("People"),
        Cell::new("Searches"),
    ]);

    for catalog in catalogs.iter() {
        let counts = CatalogCounts::of(views, catalog)?;
        table.add_row(vec![
            Cell::new(catalog.id()),
            Cell::new(catalog.name()),
            Cell::new(catalog.storage().unwrap_or("-")),
            Cell::new(counts.albums),
            Cell::new(counts.tags),
            Cell::new(counts.people),
            Cell::new(counts.searches),
        ]);
    }

    println!();
    println!("  Catalogs of {}", user.email);
    println!("{table}");
    Ok(())
}

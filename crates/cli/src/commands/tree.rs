use std::sync::Arc;

use anyhow::Result;
use photostate_core::{Catalog, Entity, Hierarchy, ServerState, Views};

pub fn run(views: &Views, state: &Arc<ServerState>, catalog: &str, tags: bool) -> Result<()> {
    let catalog = Catalog::from_state(views, state, catalog)?;
    let lines = if tags {
        render(views, &catalog.root_tags(views)?)?
    } else {
        render(views, &catalog.root_albums(views)?)?
    };

    println!();
    println!("  {} ({})", catalog.name(), if tags { "tags" } else { "albums" });
    if lines.is_empty() {
        println!("  (empty)");
    }
    for line in lines {
        println!("  {line}");
    }
    Ok(())
}

/// Depth-first lines for a forest, children indented under their parent.
pub(crate) fn render<T: Hierarchy>(views: &Views, roots: &[Arc<T>]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut stack: Vec<(usize, Arc<T>)> =
        roots.iter().rev().map(|root| (0, root.clone())).collect();
    while let Some((depth, node)) = stack.pop() {
        lines.push(format!("{}{} [{}]", "  ".repeat(depth), node.name(), node.to_ref()));
        for child in node.children(views)?.iter().rev() {
            if depth < MAX_DEPTH {
                stack.push((depth + 1, child.clone()));
            }
        }
    }
    Ok(lines)
}

/// Guards against parent cycles in malformed snapshots.
const MAX_DEPTH: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;
    use photostate_core::{AlbumState, CatalogState, TagState, UserState};

    #[test]
    fn test_render_album_forest() {
        let c1 = CatalogState::new("c1", "Family")
            .with_album(AlbumState::new("a1", "c1", "Holidays"))
            .with_album(AlbumState::new("a2", "c1", "Beach").with_parent("a1"))
            .with_album(AlbumState::new("a3", "c1", "Birthdays"));
        let state = ServerState::new(UserState::new("me@example.com").with_catalog(c1));
        let views = Views::new();
        let catalog = Catalog::from_state(&views, &state, "c1").unwrap();

        let lines = render(&views, &catalog.root_albums(&views).unwrap()).unwrap();
        assert_eq!(
            lines,
            vec!["Holidays [a1]", "  Beach [a2]", "Birthdays [a3]"]
        );
    }

    #[test]
    fn test_render_tag_forest() {
        let c1 = CatalogState::new("c1", "Family")
            .with_tag(TagState::new("t1", "c1", "Places"))
            .with_tag(TagState::new("t2", "c1", "Paris").with_parent("t1"))
            .with_tag(TagState::new("t3", "c1", "Louvre").with_parent("t2"));
        let state = ServerState::new(UserState::new("me@example.com").with_catalog(c1));
        let views = Views::new();
        let catalog = Catalog::from_state(&views, &state, "c1").unwrap();

        let lines = render(&views, &catalog.root_tags(&views).unwrap()).unwrap();
        assert_eq!(lines, vec!["Places [t1]", "  Paris [t2]", "    Louvre [t3]"]);
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use super::{Catalog, ChildMemo, Entity, ViewList, Views};
use crate::error::Result;
use crate::reference::Reference;
use crate::state::{CatalogState, ServerState};

/// Entities that form a parent/child forest within one catalog (albums, tags).
///
/// Trees are expected to be acyclic. Ancestry walks still track the nodes they
/// visit and stop, with a warning, if a parent chain loops.
pub trait Hierarchy: Entity {
    fn name(&self) -> &str;

    fn catalog_ref(&self) -> &Reference<Catalog>;

    fn parent_ref(&self) -> Option<&Reference<Self>>;

    /// Ids of the members of `catalog` whose parent is `parent`, in id order.
    fn child_ids(catalog: &CatalogState, parent: Option<&Reference<Self>>) -> Vec<Reference<Self>>;

    fn children_memo(views: &Views) -> &ChildMemo<Self>;

    fn catalog(&self, views: &Views) -> Result<Arc<Catalog>> {
        Catalog::from_state(views, self.state(), self.catalog_ref())
    }

    /// The parent view, or `None` for a root.
    fn parent(&self, views: &Views) -> Result<Option<Arc<Self>>> {
        self.parent_ref()
            .map(|parent| Self::from_state(views, self.state(), parent))
            .transpose()
    }

    fn children(&self, views: &Views) -> Result<ViewList<Self>> {
        self.children_in(views, self.state())
    }

    /// Children of this entity as recorded in `state`, which may be a newer
    /// snapshot than the one this view was built from.
    ///
    /// Fails with `NotLoggedIn` or `UnknownCatalog` when the owning catalog
    /// cannot be found in `state`.
    fn children_in(&self, views: &Views, state: &Arc<ServerState>) -> Result<ViewList<Self>> {
        let id = self.to_ref();
        let args = (state.clone(), self.catalog_ref().clone(), id.clone());
        Self::children_memo(views).get_or_try_init(&args, || {
            let catalog = state.user()?.catalog(self.catalog_ref())?;
            let children = Self::child_ids(catalog, Some(&id))
                .into_iter()
                .map(|child| Self::from_state(views, state, child))
                .collect::<Result<Vec<_>>>()?;
            Ok(children.into())
        })
    }

    /// Parent chain from the nearest parent up to the root.
    fn ancestors(&self, views: &Views) -> Result<Vec<Arc<Self>>> {
        let mut visited = HashSet::from([self.to_ref()]);
        let mut ancestors = Vec::new();
        let mut current = self.parent(views)?;
        while let Some(node) = current {
            if !visited.insert(node.to_ref()) {
                warn!(id = %node.to_ref(), "parent cycle detected");
                break;
            }
            current = node.parent(views)?;
            ancestors.push(node);
        }
        Ok(ancestors)
    }

    /// Whether `self` appears on `other`'s parent chain.
    ///
    /// Compares view identity, so `other` must come from the same snapshot and
    /// cache as `self`. An entity is not its own ancestor.
    fn is_ancestor_of(&self, views: &Views, other: &Self) -> Result<bool> {
        let mut visited = HashSet::from([other.to_ref()]);
        let mut current = other.parent(views)?;
        while let Some(node) = current {
            if std::ptr::eq(Arc::as_ptr(&node), self) {
                return Ok(true);
            }
            if !visited.insert(node.to_ref()) {
                warn!(id = %node.to_ref(), "parent cycle detected");
                return Ok(false);
            }
            current = node.parent(views)?;
        }
        Ok(false)
    }

    /// Names from the root down to this entity.
    fn path(&self, views: &Views) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .ancestors(views)?
            .iter()
            .rev()
            .map(|node| node.name().to_string())
            .collect();
        names.push(self.name().to_string());
        Ok(names)
    }
}

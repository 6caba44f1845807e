//! The Hierarchy Cache (C11): a read-through memoization layer in front of
//! `NodeStore`'s tree-shaped reads. Keyed by `(operation, view, argument)`.
//! Single-flight per key — concurrent callers asking for the same key
//! while it's being computed share one store round-trip instead of
//! stampeding it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use curation_core::{CurationResult, HierarchyView, Node, NodeId};
use curation_store::{CodeMutation, NodeStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Tree(HierarchyView),
    Subtree(HierarchyView, String),
    Ancestry(HierarchyView, NodeId),
    ByCode(HierarchyView, String),
}

impl Key {
    fn view(&self) -> HierarchyView {
        match self {
            Key::Tree(v) | Key::Subtree(v, _) | Key::Ancestry(v, _) | Key::ByCode(v, _) => *v,
        }
    }

    /// The code/path this entry's result depends on, when one exists.
    /// `Tree` always depends on the whole view (empty prefix matches
    /// everything); `Ancestry` is keyed by node id rather than a code, so
    /// it can't be targeted and falls back to coarse invalidation.
    fn prefix_argument(&self) -> Option<&str> {
        match self {
            Key::Tree(_) => Some(""),
            Key::Subtree(_, p) => Some(p),
            Key::ByCode(_, c) => Some(c),
            Key::Ancestry(_, _) => None,
        }
    }
}

#[derive(Clone)]
enum Value {
    Nodes(Arc<Vec<Node>>),
    Node(Arc<Option<Node>>),
}

pub struct HierarchyCache {
    store: Arc<NodeStore>,
    entries: DashMap<Key, Arc<OnceCell<Value>>>,
}

impl HierarchyCache {
    pub fn new(store: Arc<NodeStore>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
        }
    }

    pub async fn get_tree(&self, view: HierarchyView) -> CurationResult<Arc<Vec<Node>>> {
        let store = self.store.clone();
        let value = self
            .load(Key::Tree(view), move || async move {
                let nodes = store.get_all_live().await?;
                Ok(Value::Nodes(Arc::new(nodes)))
            })
            .await?;
        Ok(as_nodes(value))
    }

    pub async fn get_subtree(
        &self,
        view: HierarchyView,
        path: &str,
    ) -> CurationResult<Arc<Vec<Node>>> {
        let store = self.store.clone();
        let path_owned = path.to_string();
        let value = self
            .load(Key::Subtree(view, path.to_string()), move || async move {
                let nodes = store.get_subtree(view, &path_owned).await?;
                Ok(Value::Nodes(Arc::new(nodes)))
            })
            .await?;
        Ok(as_nodes(value))
    }

    pub async fn get_ancestry(
        &self,
        view: HierarchyView,
        node_id: NodeId,
    ) -> CurationResult<Arc<Vec<Node>>> {
        let store = self.store.clone();
        let value = self
            .load(Key::Ancestry(view, node_id), move || async move {
                let nodes = store.get_ancestry(view, node_id).await?;
                Ok(Value::Nodes(Arc::new(nodes)))
            })
            .await?;
        Ok(as_nodes(value))
    }

    pub async fn get_node_by_hierarchy_code(
        &self,
        view: HierarchyView,
        code: &str,
    ) -> CurationResult<Arc<Option<Node>>> {
        let store = self.store.clone();
        let code_owned = code.to_string();
        let value = self
            .load(Key::ByCode(view, code.to_string()), move || async move {
                let node = store.get_node_by_hierarchy_code(view, &code_owned).await?;
                Ok(Value::Node(Arc::new(node)))
            })
            .await?;
        match value {
            Value::Node(n) => Ok(n),
            Value::Nodes(_) => unreachable!("ByCode key never stores Value::Nodes"),
        }
    }

    /// Coarse invalidation: drop every memoized entry for both views.
    /// Called after any create/update/delete.
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Targeted invalidation: drop only entries whose key is a prefix of
    /// one of the given mutations' old or new code. Ancestry entries are
    /// always dropped since they're keyed by node id, not by code.
    pub fn invalidate_targeted(&self, mutations: &[CodeMutation]) {
        if mutations.is_empty() {
            return;
        }
        self.entries.retain(|key, _| {
            if matches!(key, Key::Ancestry(_, _)) {
                return false;
            }
            let Some(prefix) = key.prefix_argument() else {
                return false;
            };
            !mutations.iter().any(|m| {
                m.view == key.view() && (m.old_code.starts_with(prefix) || m.new_code.starts_with(prefix))
            })
        });
    }

    async fn load<F, Fut>(&self, key: Key, compute: F) -> CurationResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = CurationResult<Value>>,
    {
        let cell = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let value = cell.get_or_try_init(compute).await?;
        Ok(value.clone())
    }
}

fn as_nodes(value: Value) -> Arc<Vec<Node>> {
    match value {
        Value::Nodes(n) => n,
        Value::Node(_) => unreachable!("node-shaped key never stores Value::Node"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_store::NodeStore;

    async fn memory_store() -> Arc<NodeStore> {
        Arc::new(NodeStore::connect("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn get_tree_is_memoized() {
        let store = memory_store().await;
        let cache = HierarchyCache::new(store);
        let first = cache.get_tree(HierarchyView::Function).await.unwrap();
        let second = cache.get_tree(HierarchyView::Function).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn invalidate_all_clears_memoized_tree() {
        let store = memory_store().await;
        let cache = HierarchyCache::new(store);
        let first = cache.get_tree(HierarchyView::Function).await.unwrap();
        cache.invalidate_all();
        let second = cache.get_tree(HierarchyView::Function).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn targeted_invalidation_drops_matching_prefix_only() {
        let store = memory_store().await;
        let cache = HierarchyCache::new(store);
        let _ = cache
            .get_subtree(HierarchyView::Function, "T.DEV.A")
            .await
            .unwrap();
        let _ = cache
            .get_subtree(HierarchyView::Function, "T.DEV.B")
            .await
            .unwrap();
        assert_eq!(cache.entries.len(), 2);

        cache.invalidate_targeted(&[CodeMutation {
            node_id: uuid::Uuid::new_v4(),
            old_code: "T.DEV.A.1".to_string(),
            new_code: "T.DEV.A.2".to_string(),
            view: HierarchyView::Function,
        }]);

        assert_eq!(cache.entries.len(), 1);
        assert!(cache
            .entries
            .contains_key(&Key::Subtree(HierarchyView::Function, "T.DEV.B".to_string())));
    }
}

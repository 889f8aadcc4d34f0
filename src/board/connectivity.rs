use std::collections::{BTreeSet, HashMap};

use petgraph::unionfind::UnionFind;

use crate::board::{item::ItemId, RoutingBoard};

/// Connected components of the connectable items of one net.
#[derive(Debug, Clone, Default)]
pub struct NetConnectivity {
    components: Vec<BTreeSet<ItemId>>,
    component_of: HashMap<ItemId, usize>,
}

impl NetConnectivity {
    pub fn compute(board: &RoutingBoard, net: usize) -> Self {
        let items: Vec<ItemId> = board.net_items(net).collect();
        let position: HashMap<ItemId, usize> = items
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();
        let mut unionfind = UnionFind::new(items.len());

        for (index, id) in items.iter().enumerate() {
            for neighbour in board.net_neighbours(*id, net) {
                if let Some(&neighbour_index) = position.get(&neighbour) {
                    unionfind.union(index, neighbour_index);
                }
            }
        }

        let mut components: Vec<BTreeSet<ItemId>> = vec![];
        let mut root_component: HashMap<usize, usize> = HashMap::new();
        let mut component_of = HashMap::new();

        for (index, id) in items.iter().enumerate() {
            let root = unionfind.find(index);
            let component = *root_component.entry(root).or_insert_with(|| {
                components.push(BTreeSet::new());
                components.len() - 1
            });

            components[component].insert(*id);
            component_of.insert(*id, component);
        }

        Self {
            components,
            component_of,
        }
    }

    pub fn component_containing(&self, item: ItemId) -> BTreeSet<ItemId> {
        self.component_of
            .get(&item)
            .map(|&component| self.components[component].clone())
            .unwrap_or_default()
    }

    pub fn components(&self) -> &[BTreeSet<ItemId>] {
        &self.components
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

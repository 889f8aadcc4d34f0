use std::{
    cell::RefCell,
    collections::{hash_map::DefaultHasher, BTreeSet, HashMap},
    hash::{Hash, Hasher},
};

use bimap::BiHashMap;
use contracts::debug_ensures;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    board::{
        connectivity::NetConnectivity,
        item::{
            Connectable, FixedState, GetClearanceClass, GetId, GetLayers, GetShapes, HasNet, Item,
            ItemId, ItemKind, Trace, Via,
        },
        search_tree::ShapeSearchTree,
        undo::{Generation, ReadCursor, RestoreChange, UndoError, UndoableObjects},
    },
    geometry::{IntBox, IntPoint, ItemShape, Polyline},
    rules::{BoardRules, ClearanceMatrix, Net, NetClass, Nets},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error(transparent)]
    Undo(#[from] UndoError),
    #[error("{0} not found")]
    ItemNotFound(ItemId),
    #[error("layer {layer} out of range, board has {layer_count} layers")]
    LayerOutOfRange { layer: usize, layer_count: usize },
    #[error("trace has fewer than two distinct corners")]
    DegenerateTrace,
    #[error("board description has no net class")]
    NoNetClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub is_signal: bool,
}

/// Two items of different nets closer than their clearance allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClearanceViolation {
    pub first_item: ItemId,
    pub second_item: ItemId,
    pub layer: usize,
}

/// Serializable dump of a whole board. Item ids are reassigned when it is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDescription {
    pub bounding_box: IntBox,
    pub layers: Vec<Layer>,
    pub clearance_matrix: ClearanceMatrix,
    pub nets: Vec<Net>,
    pub net_classes: Vec<NetClass>,
    pub items: Vec<Item>,
}

/// The mutable state of one board: its items, their spatial index and the rules they obey.
///
/// Every insertion and removal goes through the undoable item store and updates the search
/// tree in the same call. Net connectivity is computed lazily and cached per net until an
/// item of that net changes.
#[derive(Debug, Clone)]
pub struct RoutingBoard {
    bounding_box: IntBox,
    layers: Vec<Layer>,
    layer_layername: BiHashMap<usize, String>,
    rules: BoardRules,
    items: UndoableObjects<Item>,
    search_tree: ShapeSearchTree,
    net_items: HashMap<usize, BTreeSet<ItemId>>,
    connectivity: RefCell<HashMap<usize, NetConnectivity>>,
    next_id: u32,
}

impl RoutingBoard {
    pub fn new(bounding_box: IntBox, layers: Vec<Layer>, rules: BoardRules) -> Self {
        let layer_layername = layers
            .iter()
            .enumerate()
            .map(|(layer, info)| (layer, info.name.clone()))
            .collect();

        Self {
            bounding_box,
            layers,
            layer_layername,
            rules,
            items: UndoableObjects::new(),
            search_tree: ShapeSearchTree::new(),
            net_items: HashMap::new(),
            connectivity: RefCell::new(HashMap::new()),
            next_id: 0,
        }
    }

    pub fn bounding_box(&self) -> IntBox {
        self.bounding_box
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn signal_layer_count(&self) -> usize {
        self.layers.iter().filter(|layer| layer.is_signal).count()
    }

    pub fn layer_name(&self, layer: usize) -> Option<&str> {
        self.layer_layername
            .get_by_left(&layer)
            .map(|name| name.as_str())
    }

    pub fn layer_no(&self, name: &str) -> Option<usize> {
        self.layer_layername.get_by_right(name).copied()
    }

    pub fn rules(&self) -> &BoardRules {
        &self.rules
    }

    pub fn search_tree(&self) -> &ShapeSearchTree {
        &self.search_tree
    }

    /// Stores `item` under a fresh id and indexes it.
    #[debug_ensures(ret.is_ok() -> self.items.len() == old(self.items.len() + 1))]
    #[debug_ensures(ret.is_err() -> self.items.len() == old(self.items.len()))]
    pub fn insert(&mut self, mut item: Item) -> Result<ItemId, BoardError> {
        if item.last_layer() >= self.layer_count() || item.first_layer() > item.last_layer() {
            return Err(BoardError::LayerOutOfRange {
                layer: item.last_layer(),
                layer_count: self.layer_count(),
            });
        }

        if let Item::Trace(trace) = &item {
            if trace.polyline.is_degenerate() {
                return Err(BoardError::DegenerateTrace);
            }
        }

        self.next_id += 1;
        let id = ItemId(self.next_id);
        item.set_id(id);

        self.index(&item);
        self.items.insert(item);
        Ok(id)
    }

    /// Inserts an unfixed trace of `net` with the net class's clearance class.
    pub fn insert_trace(
        &mut self,
        polyline: Polyline,
        layer: usize,
        half_width: i64,
        net: usize,
        fixed: FixedState,
    ) -> Result<ItemId, BoardError> {
        let clearance_class = self.rules.net_class(net).trace_clearance_class;

        self.insert(Item::Trace(Trace {
            id: ItemId::default(),
            polyline,
            layer,
            half_width,
            nets: vec![net],
            clearance_class,
            fixed,
        }))
    }

    /// Inserts a via of `net` sized by the net class.
    pub fn insert_via(
        &mut self,
        center: IntPoint,
        first_layer: usize,
        last_layer: usize,
        net: usize,
        fixed: FixedState,
    ) -> Result<ItemId, BoardError> {
        let net_class = self.rules.net_class(net);
        let radius = net_class.via_radius;
        let clearance_class = net_class.via_clearance_class;

        self.insert(Item::Via(Via {
            id: ItemId::default(),
            center,
            radius,
            first_layer,
            last_layer,
            nets: vec![net],
            clearance_class,
            fixed,
        }))
    }

    /// Removes the live item `id`. Returns `false` if there is none.
    #[debug_ensures(ret -> self.items.len() + 1 == old(self.items.len()))]
    #[debug_ensures(!ret -> self.items.len() == old(self.items.len()))]
    pub fn remove(&mut self, id: ItemId) -> bool {
        let Some(item) = self.items.remove(id).cloned() else {
            return false;
        };

        self.unindex(&item);
        true
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn start_read(&self) -> ReadCursor {
        self.items.start_read()
    }

    pub fn read_next(&self, cursor: &mut ReadCursor) -> Option<&Item> {
        self.items.read_next(cursor)
    }

    pub fn generation(&self) -> Generation {
        self.items.generation()
    }

    pub fn snapshot(&mut self) -> Generation {
        self.items.snapshot()
    }

    pub fn release(&mut self, generation: Generation) {
        self.items.release(generation);
    }

    /// Rolls the board back to `generation`, keeping the search tree and caches in step.
    pub fn restore(&mut self, generation: Generation) -> Result<(), BoardError> {
        for change in self.items.restore(generation)? {
            match change {
                RestoreChange::Discarded(item) => self.unindex(&item),
                RestoreChange::Reinstated(item) => self.index(&item),
            }
        }

        Ok(())
    }

    /// Drops removed items no open snapshot can reach. Invalidates read cursors.
    #[debug_ensures(self.items.len() == old(self.items.len()))]
    pub fn compact(&mut self) {
        self.items.compact();
    }

    /// Number of stored items, removed ones still kept for open snapshots included.
    pub fn stored_item_count(&self) -> usize {
        self.items.node_count()
    }

    pub fn overlapping(&self, shape: &ItemShape, layer: usize) -> BTreeSet<ItemId> {
        self.search_tree.overlapping(shape, layer)
    }

    pub fn overlapping_with_clearance(
        &self,
        shape: &ItemShape,
        layer: usize,
        net_filter: &[usize],
        clearance_class: usize,
    ) -> BTreeSet<ItemId> {
        self.search_tree
            .overlapping_with_clearance(shape, layer, net_filter, clearance_class, &self.rules)
    }

    /// Connectable items of `net`.
    pub fn net_items(&self, net: usize) -> impl Iterator<Item = ItemId> + '_ {
        self.net_items.get(&net).into_iter().flatten().copied()
    }

    pub fn connectable_item_count(&self, net: usize) -> usize {
        self.net_items.get(&net).map_or(0, |items| items.len())
    }

    /// Nets that have at least one connectable item, ascending.
    pub fn nets_with_items(&self) -> Vec<usize> {
        let mut nets: Vec<usize> = self
            .net_items
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(net, _)| *net)
            .collect();
        nets.sort_unstable();
        nets
    }

    /// Connectable items of `net` touching `id` on a shared layer.
    pub fn net_neighbours(&self, id: ItemId, net: usize) -> BTreeSet<ItemId> {
        let Some(item) = self.item(id) else {
            return BTreeSet::new();
        };

        let mut neighbours = BTreeSet::new();

        for layer in item.first_layer()..=item.last_layer() {
            for shape in item.shapes_on_layer(layer) {
                neighbours.extend(
                    self.search_tree
                        .overlapping_entries(&shape, layer)
                        .filter(|entry| entry.item != id)
                        .filter(|entry| entry.is_connectable() && entry.nets.contains(&net))
                        .map(|entry| entry.item),
                );
            }
        }

        neighbours
    }

    /// Items of `net` electrically connected to `id`, `id` included.
    pub fn connected_set(&self, id: ItemId, net: usize) -> BTreeSet<ItemId> {
        self.connectivity
            .borrow_mut()
            .entry(net)
            .or_insert_with(|| NetConnectivity::compute(self, net))
            .component_containing(id)
    }

    /// Items of `net` not connected to `id`.
    pub fn unconnected_set(&self, id: ItemId, net: usize) -> BTreeSet<ItemId> {
        let connected = self.connected_set(id, net);

        self.net_items(net)
            .filter(|item| !connected.contains(item))
            .collect()
    }

    pub fn net_components(&self, net: usize) -> Vec<BTreeSet<ItemId>> {
        self.connectivity
            .borrow_mut()
            .entry(net)
            .or_insert_with(|| NetConnectivity::compute(self, net))
            .components()
            .to_vec()
    }

    pub fn trace_ids(&self) -> BTreeSet<ItemId> {
        self.items
            .iter()
            .filter(|item| item.kind() == ItemKind::Trace)
            .map(|item| item.id())
            .collect()
    }

    /// Canonical geometric content of the board: every item with its id cleared, sorted.
    /// Two boards with the same fingerprint route identically.
    pub fn fingerprint(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                item.set_id(ItemId::default());
                item
            })
            .collect();
        items.sort_unstable();
        items
    }

    pub fn state_hash(&self) -> u64 {
        Self::salted_hash(&self.fingerprint(), 0)
    }

    /// 128-bit digest of the fingerprint, wide enough to tell board states apart without
    /// keeping their fingerprints.
    pub fn state_digest(&self) -> u128 {
        let fingerprint = self.fingerprint();
        let high = Self::salted_hash(&fingerprint, 0);
        let low = Self::salted_hash(&fingerprint, 1);

        (high as u128) << 64 | low as u128
    }

    fn salted_hash(fingerprint: &[Item], salt: u8) -> u64 {
        let mut hasher = DefaultHasher::new();
        salt.hash(&mut hasher);
        fingerprint.hash(&mut hasher);
        hasher.finish()
    }

    pub fn clearance_violations(&self) -> Vec<ClearanceViolation> {
        let mut violations = BTreeSet::new();

        for item in self.items.iter() {
            for layer in item.first_layer()..=item.last_layer() {
                for shape in item.shapes_on_layer(layer) {
                    for entry in self.search_tree.clearance_violating_entries(
                        &shape,
                        layer,
                        item.nets(),
                        item.clearance_class(),
                        &self.rules,
                    ) {
                        if entry.item == item.id()
                            || (!item.is_connectable() && !entry.is_connectable())
                        {
                            continue;
                        }

                        violations.insert(ClearanceViolation {
                            first_item: item.id().min(entry.item),
                            second_item: item.id().max(entry.item),
                            layer,
                        });
                    }
                }
            }
        }

        violations.into_iter().collect()
    }

    pub fn to_description(&self) -> BoardDescription {
        BoardDescription {
            bounding_box: self.bounding_box,
            layers: self.layers.clone(),
            clearance_matrix: self.rules.clearance_matrix.clone(),
            nets: self.rules.nets.iter().cloned().collect(),
            net_classes: self.rules.net_classes().to_vec(),
            items: self.items.iter().cloned().collect(),
        }
    }

    pub fn from_description(description: BoardDescription) -> Result<Self, BoardError> {
        if description.net_classes.is_empty() {
            return Err(BoardError::NoNetClass);
        }

        let rules = BoardRules::new(
            description.clearance_matrix,
            Nets::from_nets(description.nets),
            description.net_classes,
        );
        let mut board = Self::new(description.bounding_box, description.layers, rules);

        for item in description.items {
            board.insert(item)?;
        }

        Ok(board)
    }

    fn index(&mut self, item: &Item) {
        self.search_tree.insert(item);

        if item.kind() == ItemKind::ConductionArea {
            for net in item.nets() {
                self.rules.nets.set_contains_plane(*net, true);
            }
        }

        if item.is_connectable() {
            for net in item.nets() {
                self.net_items.entry(*net).or_default().insert(item.id());
            }
        }

        self.invalidate_nets(item.nets());
    }

    fn unindex(&mut self, item: &Item) {
        self.search_tree.remove(item);

        for net in item.nets() {
            if let Some(items) = self.net_items.get_mut(net) {
                items.remove(&item.id());
            }
        }

        if item.kind() == ItemKind::ConductionArea {
            for net in item.nets() {
                if !self.has_conduction_area(*net) {
                    self.rules.nets.set_contains_plane(*net, false);
                }
            }
        }

        self.invalidate_nets(item.nets());
    }

    fn has_conduction_area(&self, net: usize) -> bool {
        self.net_items(net).any(|id| {
            self.items
                .get(id)
                .map_or(false, |item| item.kind() == ItemKind::ConductionArea)
        })
    }

    fn invalidate_nets(&mut self, nets: &[usize]) {
        let connectivity = self.connectivity.get_mut();

        for net in nets {
            connectivity.remove(net);
        }
    }
}

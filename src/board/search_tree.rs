use std::collections::BTreeSet;

use rstar::{primitives::GeomWithData, RTree, RTreeObject, AABB};

use crate::{
    board::item::{
        FixedState, GetClearanceClass, GetFixedState, GetId, GetLayers, GetShapes, HasNet, Item,
        ItemId, ItemKind,
    },
    geometry::{IntBox, ItemShape},
    rules::AccessRules,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub aabb: AABB<[f64; 3]>,
}

impl Bbox {
    pub fn new(aabb: AABB<[f64; 3]>) -> Bbox {
        Self { aabb }
    }
}

impl RTreeObject for Bbox {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// One shape of one item on one layer, with the item data queries filter on.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub item: ItemId,
    pub kind: ItemKind,
    pub layer: usize,
    pub shape: ItemShape,
    pub nets: Vec<usize>,
    pub clearance_class: usize,
    pub fixed: FixedState,
}

impl TreeEntry {
    pub fn is_connectable(&self) -> bool {
        self.kind != ItemKind::Keepout
    }

    /// Whether the autorouter may rip this entry's item up.
    pub fn is_ripupable(&self) -> bool {
        matches!(self.kind, ItemKind::Trace | ItemKind::Via) && !self.fixed.is_fixed()
    }
}

pub type BboxedEntry = GeomWithData<Bbox, TreeEntry>;

/// Items indexed by their shapes, with the layer as the third dimension.
#[derive(Debug, Clone, Default)]
pub struct ShapeSearchTree {
    rtree: RTree<BboxedEntry>,
}

impl ShapeSearchTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: &Item) {
        for entry in Self::entries_of(item) {
            self.rtree.insert(entry);
        }
    }

    /// Removes every entry of `item`. Returns `false` if the item was not indexed.
    pub fn remove(&mut self, item: &Item) -> bool {
        let mut removed = false;

        for entry in Self::entries_of(item) {
            removed |= self.rtree.remove(&entry).is_some();
        }

        removed
    }

    pub fn size(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Entries on `layer` whose bounding box intersects `bbox`.
    pub fn entries_in_box(&self, bbox: &IntBox, layer: usize) -> impl Iterator<Item = &TreeEntry> {
        self.rtree
            .locate_in_envelope_intersecting(&envelope_3d(bbox, layer))
            .map(|bboxed| &bboxed.data)
    }

    /// Entries on `layer` touching or overlapping `shape`.
    pub fn overlapping_entries<'a>(
        &'a self,
        shape: &'a ItemShape,
        layer: usize,
    ) -> impl Iterator<Item = &'a TreeEntry> + 'a {
        self.entries_in_box(&shape.bounding_box(), layer)
            .filter(move |entry| entry.shape.intersects(shape))
    }

    pub fn overlapping(&self, shape: &ItemShape, layer: usize) -> BTreeSet<ItemId> {
        self.overlapping_entries(shape, layer)
            .map(|entry| entry.item)
            .collect()
    }

    /// Entries on `layer` closer to `shape` than the clearance required between
    /// `clearance_class` and their own class. Entries of a net in `net_filter` are ignored.
    pub fn clearance_violating_entries<'a>(
        &'a self,
        shape: &'a ItemShape,
        layer: usize,
        net_filter: &'a [usize],
        clearance_class: usize,
        rules: &'a impl AccessRules,
    ) -> impl Iterator<Item = &'a TreeEntry> + 'a {
        let largest_clearance = rules.largest_clearance(clearance_class, layer);

        self.entries_in_box(&shape.bounding_box().offset(largest_clearance), layer)
            .filter(move |entry| !entry.nets.iter().any(|net| net_filter.contains(net)))
            .filter(move |entry| {
                let required = rules.clearance(clearance_class, entry.clearance_class, layer);
                entry.shape.distance(shape) < required as f64
                    || entry.shape.intersects(shape)
            })
    }

    pub fn overlapping_with_clearance(
        &self,
        shape: &ItemShape,
        layer: usize,
        net_filter: &[usize],
        clearance_class: usize,
        rules: &impl AccessRules,
    ) -> BTreeSet<ItemId> {
        self.clearance_violating_entries(shape, layer, net_filter, clearance_class, rules)
            .map(|entry| entry.item)
            .collect()
    }

    fn entries_of(item: &Item) -> Vec<BboxedEntry> {
        (item.first_layer()..=item.last_layer())
            .flat_map(|layer| {
                item.shapes_on_layer(layer).into_iter().map(move |shape| (layer, shape))
            })
            .map(|(layer, shape)| {
                BboxedEntry::new(
                    Bbox::new(envelope_3d(&shape.bounding_box(), layer)),
                    TreeEntry {
                        item: item.id(),
                        kind: item.kind(),
                        layer,
                        shape,
                        nets: item.nets().to_vec(),
                        clearance_class: item.clearance_class(),
                        fixed: item.fixed_state(),
                    },
                )
            })
            .collect()
    }
}

pub fn envelope_3d(bbox: &IntBox, layer: usize) -> AABB<[f64; 3]> {
    AABB::from_corners(
        [bbox.ll.x as f64, bbox.ll.y as f64, layer as f64],
        [bbox.ur.x as f64, bbox.ur.y as f64, layer as f64],
    )
}

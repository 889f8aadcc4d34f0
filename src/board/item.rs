use std::fmt;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::{
    board::undo::Storable,
    geometry::{IntBox, IntOctagon, IntPoint, ItemShape, Polyline, TileShape, TileShapeTrait},
};

/// Immutable identification number of a board item.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item #{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FixedState {
    NotFixed,
    /// Fixed by the autorouter, e.g. fanout vias.
    SystemFixed,
    UserFixed,
}

impl FixedState {
    pub fn is_fixed(&self) -> bool {
        *self != FixedState::NotFixed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    Trace,
    Via,
    Pin,
    ConductionArea,
    Keepout,
}

#[enum_dispatch]
pub trait GetId {
    fn id(&self) -> ItemId;
    fn set_id(&mut self, id: ItemId);
}

#[enum_dispatch]
pub trait GetLayers {
    fn first_layer(&self) -> usize;
    fn last_layer(&self) -> usize;

    fn is_on_layer(&self, layer: usize) -> bool {
        layer >= self.first_layer() && layer <= self.last_layer()
    }
}

#[enum_dispatch]
pub trait HasNet {
    fn nets(&self) -> &[usize];

    fn contains_net(&self, net: usize) -> bool {
        self.nets().contains(&net)
    }

    fn shares_net(&self, nets: &[usize]) -> bool {
        self.nets().iter().any(|net| nets.contains(net))
    }
}

/// Items that carry current and can therefore be part of a connection.
#[enum_dispatch]
pub trait Connectable {
    fn is_connectable(&self) -> bool;
}

/// Items the autorouter created or may rip up and route again.
#[enum_dispatch]
pub trait Routable {
    fn is_routable(&self) -> bool;
}

#[enum_dispatch]
pub trait GetClearanceClass {
    fn clearance_class(&self) -> usize;
}

#[enum_dispatch]
pub trait GetFixedState {
    fn fixed_state(&self) -> FixedState;
}

#[enum_dispatch]
pub trait GetShapes {
    fn shapes_on_layer(&self, layer: usize) -> Vec<ItemShape>;
    fn bounding_box(&self) -> IntBox;
}

macro_rules! impl_item {
    ($item_struct:ident) => {
        impl GetId for $item_struct {
            fn id(&self) -> ItemId {
                self.id
            }

            fn set_id(&mut self, id: ItemId) {
                self.id = id;
            }
        }

        impl GetClearanceClass for $item_struct {
            fn clearance_class(&self) -> usize {
                self.clearance_class
            }
        }

        impl GetFixedState for $item_struct {
            fn fixed_state(&self) -> FixedState {
                self.fixed
            }
        }
    };
}

macro_rules! impl_net_item {
    ($item_struct:ident) => {
        impl_item!($item_struct);

        impl HasNet for $item_struct {
            fn nets(&self) -> &[usize] {
                &self.nets
            }
        }

        impl Connectable for $item_struct {
            fn is_connectable(&self) -> bool {
                true
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Trace {
    pub id: ItemId,
    pub polyline: Polyline,
    pub layer: usize,
    pub half_width: i64,
    pub nets: Vec<usize>,
    pub clearance_class: usize,
    pub fixed: FixedState,
}

impl_net_item!(Trace);

impl Trace {
    pub fn first_corner(&self) -> IntPoint {
        self.polyline.first_corner()
    }

    pub fn last_corner(&self) -> IntPoint {
        self.polyline.last_corner()
    }

    pub fn length(&self) -> f64 {
        self.polyline.length()
    }

    /// Same layer, width, nets, clearance class and fixed state.
    pub fn is_combinable_with(&self, other: &Trace) -> bool {
        self.layer == other.layer
            && self.half_width == other.half_width
            && self.nets == other.nets
            && self.clearance_class == other.clearance_class
            && self.fixed == other.fixed
    }
}

impl GetLayers for Trace {
    fn first_layer(&self) -> usize {
        self.layer
    }

    fn last_layer(&self) -> usize {
        self.layer
    }
}

impl Routable for Trace {
    fn is_routable(&self) -> bool {
        !self.fixed.is_fixed()
    }
}

impl GetShapes for Trace {
    fn shapes_on_layer(&self, layer: usize) -> Vec<ItemShape> {
        if layer != self.layer {
            return vec![];
        }

        self.polyline
            .segments()
            .map(|(from, to)| ItemShape::Segment {
                from,
                to,
                half_width: self.half_width,
            })
            .collect()
    }

    fn bounding_box(&self) -> IntBox {
        self.polyline.bounding_box().offset(self.half_width)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Via {
    pub id: ItemId,
    pub center: IntPoint,
    pub radius: i64,
    pub first_layer: usize,
    pub last_layer: usize,
    pub nets: Vec<usize>,
    pub clearance_class: usize,
    pub fixed: FixedState,
}

impl_net_item!(Via);

impl Via {
    pub fn shape(&self) -> IntOctagon {
        IntOctagon::around(self.center, self.radius)
    }
}

impl GetLayers for Via {
    fn first_layer(&self) -> usize {
        self.first_layer
    }

    fn last_layer(&self) -> usize {
        self.last_layer
    }
}

impl Routable for Via {
    fn is_routable(&self) -> bool {
        !self.fixed.is_fixed()
    }
}

impl GetShapes for Via {
    fn shapes_on_layer(&self, layer: usize) -> Vec<ItemShape> {
        if !self.is_on_layer(layer) {
            return vec![];
        }

        vec![ItemShape::Tile(TileShape::Octagon(self.shape()))]
    }

    fn bounding_box(&self) -> IntBox {
        self.shape().bounding_box()
    }
}

/// A component pin: a pad shape on a range of layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pin {
    pub id: ItemId,
    pub center: IntPoint,
    pub shape: TileShape,
    pub first_layer: usize,
    pub last_layer: usize,
    pub nets: Vec<usize>,
    pub clearance_class: usize,
    pub fixed: FixedState,
}

impl_net_item!(Pin);

impl GetLayers for Pin {
    fn first_layer(&self) -> usize {
        self.first_layer
    }

    fn last_layer(&self) -> usize {
        self.last_layer
    }
}

impl Routable for Pin {
    fn is_routable(&self) -> bool {
        false
    }
}

impl GetShapes for Pin {
    fn shapes_on_layer(&self, layer: usize) -> Vec<ItemShape> {
        if !self.is_on_layer(layer) {
            return vec![];
        }

        vec![ItemShape::Tile(self.shape.clone())]
    }

    fn bounding_box(&self) -> IntBox {
        self.shape.bounding_box()
    }
}

/// A copper plane or pour on one layer. May belong to several nets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConductionArea {
    pub id: ItemId,
    pub shape: TileShape,
    pub layer: usize,
    pub nets: Vec<usize>,
    pub clearance_class: usize,
    pub fixed: FixedState,
}

impl_net_item!(ConductionArea);

impl GetLayers for ConductionArea {
    fn first_layer(&self) -> usize {
        self.layer
    }

    fn last_layer(&self) -> usize {
        self.layer
    }
}

impl Routable for ConductionArea {
    fn is_routable(&self) -> bool {
        false
    }
}

impl GetShapes for ConductionArea {
    fn shapes_on_layer(&self, layer: usize) -> Vec<ItemShape> {
        if layer != self.layer {
            return vec![];
        }

        vec![ItemShape::Tile(self.shape.clone())]
    }

    fn bounding_box(&self) -> IntBox {
        self.shape.bounding_box()
    }
}

/// A region no conductor of any net may enter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Keepout {
    pub id: ItemId,
    pub shape: TileShape,
    pub first_layer: usize,
    pub last_layer: usize,
    pub clearance_class: usize,
    pub fixed: FixedState,
}

impl_item!(Keepout);

impl HasNet for Keepout {
    fn nets(&self) -> &[usize] {
        &[]
    }
}

impl Connectable for Keepout {
    fn is_connectable(&self) -> bool {
        false
    }
}

impl Routable for Keepout {
    fn is_routable(&self) -> bool {
        false
    }
}

impl GetLayers for Keepout {
    fn first_layer(&self) -> usize {
        self.first_layer
    }

    fn last_layer(&self) -> usize {
        self.last_layer
    }
}

impl GetShapes for Keepout {
    fn shapes_on_layer(&self, layer: usize) -> Vec<ItemShape> {
        if !self.is_on_layer(layer) {
            return vec![];
        }

        vec![ItemShape::Tile(self.shape.clone())]
    }

    fn bounding_box(&self) -> IntBox {
        self.shape.bounding_box()
    }
}

#[enum_dispatch(
    GetId,
    GetLayers,
    HasNet,
    Connectable,
    Routable,
    GetClearanceClass,
    GetFixedState,
    GetShapes
)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Item {
    Trace(Trace),
    Via(Via),
    Pin(Pin),
    ConductionArea(ConductionArea),
    Keepout(Keepout),
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Trace(..) => ItemKind::Trace,
            Item::Via(..) => ItemKind::Via,
            Item::Pin(..) => ItemKind::Pin,
            Item::ConductionArea(..) => ItemKind::ConductionArea,
            Item::Keepout(..) => ItemKind::Keepout,
        }
    }

    pub fn as_trace(&self) -> Option<&Trace> {
        match self {
            Item::Trace(trace) => Some(trace),
            _ => None,
        }
    }

    /// Center of a drill item (pin or via).
    pub fn drill_center(&self) -> Option<IntPoint> {
        match self {
            Item::Via(via) => Some(via.center),
            Item::Pin(pin) => Some(pin.center),
            _ => None,
        }
    }

    /// Points where a new trace may attach to this item on `layer`.
    pub fn connection_points(&self, layer: usize) -> Vec<IntPoint> {
        if !self.is_on_layer(layer) {
            return vec![];
        }

        match self {
            Item::Trace(trace) => vec![trace.first_corner(), trace.last_corner()],
            Item::Via(via) => vec![via.center],
            Item::Pin(pin) => vec![pin.center],
            Item::ConductionArea(..) | Item::Keepout(..) => vec![],
        }
    }
}

impl Storable for Item {
    type Key = ItemId;

    fn key(&self) -> ItemId {
        self.id()
    }
}

use bimap::BiHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub name: String,
    /// Net numbers start at 1; 0 means "no net".
    pub net_no: usize,
    pub net_class: usize,
    /// Nets in the same swap group may be exchanged between pins of a gate.
    pub swap_group: Option<usize>,
    /// Set once a conduction area (plane) of this net is on the board.
    pub contains_plane: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Nets {
    nets: Vec<Net>,
    netname_net: BiHashMap<usize, String>,
}

impl Nets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nets(nets: impl IntoIterator<Item = Net>) -> Self {
        let mut this = Self::new();

        for net in nets {
            let net_no = this.add(&net.name, net.net_class);

            if let Some(added) = this.net_mut(net_no) {
                added.swap_group = net.swap_group;
                added.contains_plane = net.contains_plane;
            }
        }

        this
    }

    /// Adds a net and returns its number. A net with an existing name is not added twice.
    pub fn add(&mut self, name: &str, net_class: usize) -> usize {
        if let Some(net_no) = self.net_no(name) {
            return net_no;
        }

        let net_no = self.nets.len() + 1;

        self.nets.push(Net {
            name: name.to_string(),
            net_no,
            net_class,
            swap_group: None,
            contains_plane: false,
        });
        self.netname_net.insert(net_no, name.to_string());
        net_no
    }

    pub fn net(&self, net_no: usize) -> Option<&Net> {
        net_no.checked_sub(1).and_then(|index| self.nets.get(index))
    }

    pub fn net_mut(&mut self, net_no: usize) -> Option<&mut Net> {
        net_no.checked_sub(1).and_then(|index| self.nets.get_mut(index))
    }

    pub fn net_no(&self, name: &str) -> Option<usize> {
        self.netname_net.get_by_right(name).copied()
    }

    pub fn net_name(&self, net_no: usize) -> Option<&str> {
        self.netname_net.get_by_left(&net_no).map(|name| name.as_str())
    }

    pub fn contains_plane(&self, net_no: usize) -> bool {
        self.net(net_no).map_or(false, |net| net.contains_plane)
    }

    pub fn set_contains_plane(&mut self, net_no: usize, value: bool) {
        if let Some(net) = self.net_mut(net_no) {
            net.contains_plane = value;
        }
    }

    pub fn count(&self) -> usize {
        self.nets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Net> {
        self.nets.iter()
    }
}

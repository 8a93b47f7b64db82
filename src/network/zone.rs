#[derive(Debug, Clone)]
pub struct Zone {
    pub id: String,
    pub index: u16,
    pub member_nodes: Vec<usize>,
    /// Centroid used only when the zone has no member nodes, to find the
    /// nearest real nodes for connector synthesis. Opaque to the core beyond
    /// that one use.
    pub centroid: Option<(f64, f64)>,
    pub connector_links: Vec<usize>,
    pub origin_anchor: Option<usize>,
    pub dest_anchor: Option<usize>,
}

impl Zone {
    pub fn new(id: impl Into<String>, index: u16) -> Self {
        Zone {
            id: id.into(),
            index,
            member_nodes: Vec::new(),
            centroid: None,
            connector_links: Vec::new(),
            origin_anchor: None,
            dest_anchor: None,
        }
    }

    pub fn with_member_nodes(mut self, member_nodes: Vec<usize>) -> Self {
        self.member_nodes = member_nodes;
        self
    }

    pub fn with_centroid(mut self, x: f64, y: f64) -> Self {
        self.centroid = Some((x, y));
        self
    }
}

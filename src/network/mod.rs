pub mod link;
pub mod node;
pub mod zone;

pub use link::{AgentTypeMask, Link};
pub use node::Node;
pub use zone::Zone;

use std::collections::HashMap;

use tracing::{error, info};

use crate::error::{DtaError, DtaResult};

/// The physical network: nodes, directed links and zones, built once at load
/// time and immutable thereafter except for the per-period link state the UE
/// solver mutates.
#[derive(Debug)]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    zones: Vec<Zone>,
    node_id_index: HashMap<String, usize>,
    link_id_index: HashMap<String, usize>,
    zone_id_index: HashMap<String, u16>,
}

impl Network {
    /// Assembles a network from already-parsed nodes and links, wiring
    /// adjacency and validating topology. Zones are added separately via
    /// [`Network::set_zones`] followed by [`Network::synthesize_connectors`].
    pub fn build(nodes: Vec<Node>, links: Vec<Link>) -> DtaResult<Network> {
        let mut node_id_index = HashMap::new();
        for (position, node) in nodes.iter().enumerate() {
            if node.index != position {
                return Err(DtaError::InvalidTopology(
                    "node index is not dense/0-based".to_string(),
                ));
            }
            if node_id_index.insert(node.id.clone(), node.index).is_some() {
                return Err(DtaError::InvalidTopology(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
        }

        let mut link_id_index = HashMap::new();
        for (position, link) in links.iter().enumerate() {
            if link.index != position {
                return Err(DtaError::InvalidTopology(
                    "link index is not dense/0-based".to_string(),
                ));
            }
            if link_id_index.insert(link.id.clone(), link.index).is_some() {
                return Err(DtaError::InvalidTopology(format!(
                    "duplicate link id '{}'",
                    link.id
                )));
            }
            if link.tail_node >= nodes.len() || link.head_node >= nodes.len() {
                let err = DtaError::InvalidTopology(format!(
                    "link '{}' references a node out of range",
                    link.id
                ));
                error!(%err, link_id = %link.id, "dangling link");
                return Err(err);
            }
        }

        let mut network = Network {
            nodes,
            links,
            zones: Vec::new(),
            node_id_index,
            link_id_index,
            zone_id_index: HashMap::new(),
        };

        for link_index in 0..network.links.len() {
            let (tail, head) = {
                let link = &network.links[link_index];
                (link.tail_node, link.head_node)
            };
            network.nodes[tail].add_out_link(link_index);
            network.nodes[head].add_in_link(link_index);
        }

        info!(nodes = network.nodes.len(), links = network.links.len(), "network built");
        Ok(network)
    }

    pub fn set_zones(&mut self, zones: Vec<Zone>) -> DtaResult<()> {
        let mut zone_id_index = HashMap::new();
        for zone in &zones {
            if zone_id_index.insert(zone.id.clone(), zone.index).is_some() {
                return Err(DtaError::InvalidTopology(format!(
                    "duplicate zone id '{}'",
                    zone.id
                )));
            }
        }
        self.zone_id_index = zone_id_index;
        self.zones = zones;
        Ok(())
    }

    /// Attaches zero-length, infinite-capacity connector links from a
    /// synthesized origin anchor and to a synthesized destination anchor for
    /// every zone. Zones with real member nodes connect to all of them;
    /// zones without any connect to their `k` geographically nearest real
    /// nodes. Fails if a zone has no node to anchor to at all.
    pub fn synthesize_connectors(&mut self, k: usize, num_agent_types: usize) -> DtaResult<()> {
        let mask = AgentTypeMask::all(num_agent_types);

        for zone_index in 0..self.zones.len() {
            let targets: Vec<usize> = if !self.zones[zone_index].member_nodes.is_empty() {
                self.zones[zone_index].member_nodes.clone()
            } else {
                let centroid = self.zones[zone_index].centroid.ok_or_else(|| {
                    DtaError::InvalidTopology(format!(
                        "zone '{}' has no member nodes and no centroid to anchor connectors to",
                        self.zones[zone_index].id
                    ))
                })?;
                self.nearest_real_nodes(centroid, k)
            };

            if targets.is_empty() {
                let err = DtaError::InvalidTopology(format!(
                    "zone '{}' has no reachable anchor",
                    self.zones[zone_index].id
                ));
                error!(%err, zone_id = %self.zones[zone_index].id, "zone has no reachable anchor");
                return Err(err);
            }

            let zone_idx16 = self.zones[zone_index].index;
            let zone_id = self.zones[zone_index].id.clone();

            let origin_anchor = self.push_virtual_node(format!("{zone_id}_origin"), zone_idx16);
            let dest_anchor = self.push_virtual_node(format!("{zone_id}_dest"), zone_idx16);

            let mut connector_links = Vec::with_capacity(targets.len() * 2);
            for target in targets {
                let out_id = format!("{zone_id}_connector_out_{target}");
                let out_index = self.push_connector(out_id, origin_anchor, target, mask);
                connector_links.push(out_index);

                let in_id = format!("{zone_id}_connector_in_{target}");
                let in_index = self.push_connector(in_id, target, dest_anchor, mask);
                connector_links.push(in_index);
            }

            let zone = &mut self.zones[zone_index];
            zone.origin_anchor = Some(origin_anchor);
            zone.dest_anchor = Some(dest_anchor);
            zone.connector_links = connector_links;
        }

        info!(zones = self.zones.len(), nodes = self.nodes.len(), links = self.links.len(), "connector synthesis complete");
        Ok(())
    }

    fn nearest_real_nodes(&self, centroid: (f64, f64), k: usize) -> Vec<usize> {
        let mut by_distance: Vec<(f64, usize)> = self
            .nodes
            .iter()
            .filter(|n| !n.is_virtual)
            .map(|n| {
                let dx = n.x - centroid.0;
                let dy = n.y - centroid.1;
                ((dx * dx + dy * dy).sqrt(), n.index)
            })
            .collect();
        by_distance.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        by_distance.into_iter().take(k.max(1)).map(|(_, i)| i).collect()
    }

    fn push_virtual_node(&mut self, id: String, zone_index: u16) -> usize {
        let index = self.nodes.len();
        self.node_id_index.insert(id.clone(), index);
        self.nodes.push(Node::new_virtual(id, index, zone_index));
        index
    }

    fn push_connector(
        &mut self,
        id: String,
        tail: usize,
        head: usize,
        mask: AgentTypeMask,
    ) -> usize {
        let index = self.links.len();
        self.link_id_index.insert(id.clone(), index);
        let link = Link::new_connector(index, id, tail, head, mask);
        self.links.push(link);
        self.nodes[tail].add_out_link(index);
        self.nodes[head].add_in_link(index);
        index
    }

    pub fn init_periods(&mut self, num_periods: usize) {
        for link in &mut self.links {
            link.init_periods(num_periods);
        }
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.node_id_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn link_by_id(&self, id: &str) -> Option<&Link> {
        self.link_id_index.get(id).map(|&i| &self.links[i])
    }

    pub fn zone_by_id(&self, id: &str) -> Option<&Zone> {
        self.zone_id_index.get(id).map(|&i| &self.zones[i as usize])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut [Link] {
        &mut self.links
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn link(&self, index: usize) -> &Link {
        &self.links[index]
    }

    pub fn link_mut(&mut self, index: usize) -> &mut Link {
        &mut self.links[index]
    }

    pub fn zone(&self, zone_index: u16) -> &Zone {
        &self.zones[zone_index as usize]
    }

    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }
}

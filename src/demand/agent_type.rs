use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct AgentType {
    pub name: String,
    pub index: usize,
    pub vot: f64,
    pub pce: f64,
    pub is_flow_type: bool,
}

impl AgentType {
    pub fn new(name: impl Into<String>, index: usize, vot: f64, pce: f64, is_flow_type: bool) -> Self {
        AgentType {
            name: name.into(),
            index,
            vot,
            pce,
            is_flow_type,
        }
    }
}

/// Keyed by name; index is assigned on load and is the only thing the rest
/// of the core carries around.
#[derive(Debug, Clone, Default)]
pub struct AgentTypeTable {
    types: Vec<AgentType>,
    index_by_name: HashMap<String, usize>,
}

impl AgentTypeTable {
    pub fn new(types: Vec<AgentType>) -> Self {
        let index_by_name = types.iter().map(|t| (t.name.clone(), t.index)).collect();
        AgentTypeTable { types, index_by_name }
    }

    pub fn get_by_name(&self, name: &str) -> Option<&AgentType> {
        self.index_by_name.get(name).map(|&i| &self.types[i])
    }

    pub fn get(&self, index: usize) -> &AgentType {
        &self.types[index]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentType> {
        self.types.iter()
    }
}

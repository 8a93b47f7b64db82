use ahash::HashMap;
use itertools::Itertools;

use super::column::Column;
use crate::demand::OdKey;

/// All columns for one OD key, plus the total OD volume and a "new column
/// this iteration" marker the solver uses to choose between MSA
/// initialization and a gradient-projection step.
#[derive(Debug, Clone)]
pub struct ColumnVec {
    pub columns: Vec<Column>,
    pub od_volume: f64,
    pub new_column_added: bool,
    pub last_new_index: Option<usize>,
}

impl ColumnVec {
    pub fn new(od_volume: f64) -> Self {
        ColumnVec {
            columns: Vec::new(),
            od_volume,
            new_column_added: false,
            last_new_index: None,
        }
    }

    /// Appends `nodes`/`links` as a new zero-volume column unless an
    /// identical path already exists, in which case the pool is left
    /// unchanged. Returns true if a new column was added.
    pub fn add_path(&mut self, nodes: Vec<usize>, links: Vec<usize>) -> bool {
        if self.columns.iter().any(|c| c.same_path(&nodes)) {
            return false;
        }
        self.columns.push(Column::new(nodes, links));
        self.new_column_added = true;
        self.last_new_index = Some(self.columns.len() - 1);
        true
    }

    pub fn reset_iteration_flags(&mut self) {
        self.new_column_added = false;
        self.last_new_index = None;
    }

    pub fn total_volume(&self) -> f64 {
        self.columns.iter().map(|c| c.volume).sum()
    }

    /// Defensive dedup: merges any columns that happen to share a node
    /// sequence by summing their volumes, keeping the first occurrence's
    /// position stable. Used after reloading a column pool from storage.
    pub fn merge_duplicate_paths(&mut self) {
        let mut merged: Vec<Column> = Vec::with_capacity(self.columns.len());
        for column in self.columns.drain(..) {
            if let Some(existing) = merged.iter_mut().find(|c| c.same_path(&column.nodes)) {
                existing.volume += column.volume;
            } else {
                merged.push(column);
            }
        }
        self.columns = merged;
    }
}

/// Column pool sharded by origin zone index, so a parallel TDSP worker pool
/// can write into disjoint shards without locking.
#[derive(Debug, Clone)]
pub struct ColumnPool {
    shards: Vec<HashMap<OdKey, ColumnVec>>,
}

impl ColumnPool {
    pub fn new(num_zones: usize) -> Self {
        ColumnPool {
            shards: (0..num_zones).map(|_| HashMap::default()).collect(),
        }
    }

    pub fn shard_mut(&mut self, origin_zone: u16) -> &mut HashMap<OdKey, ColumnVec> {
        &mut self.shards[origin_zone as usize]
    }

    pub fn shards_mut(&mut self) -> &mut [HashMap<OdKey, ColumnVec>] {
        &mut self.shards
    }

    pub fn entry(&mut self, key: OdKey, od_volume: f64) -> &mut ColumnVec {
        self.shards[key.0 as usize]
            .entry(key)
            .or_insert_with(|| ColumnVec::new(od_volume))
    }

    pub fn get(&self, key: OdKey) -> Option<&ColumnVec> {
        self.shards[key.0 as usize].get(&key)
    }

    pub fn get_mut(&mut self, key: OdKey) -> Option<&mut ColumnVec> {
        self.shards[key.0 as usize].get_mut(&key)
    }

    /// All OD keys across every shard, in ascending lexicographic order, so
    /// the gradient-projection sweep is reproducible across runs.
    pub fn keys_sorted(&self) -> Vec<OdKey> {
        self.shards.iter().flat_map(|s| s.keys().copied()).sorted().collect()
    }

    pub fn reset_iteration_flags(&mut self) {
        for shard in &mut self.shards {
            for cv in shard.values_mut() {
                cv.reset_iteration_flags();
            }
        }
    }

    pub fn any_new_column_added(&self) -> bool {
        self.shards.iter().any(|s| s.values().any(|cv| cv.new_column_added))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OdKey, &ColumnVec)> {
        self.shards.iter().flat_map(|s| s.iter())
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }
}

//! Run configuration. Decoding these structs from a settings file is an
//! external collaborator's job; the core only defines the shapes and
//! validates them.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{DtaError, DtaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowModel {
    PointQueue,
    SpatialQueue,
    KinematicWave,
}

impl Default for FlowModel {
    fn default() -> Self {
        FlowModel::PointQueue
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentConfig {
    pub column_generation_num: usize,
    pub column_update_num: usize,
    /// Size of the TDSP worker pool; 1 means fully serial.
    pub thread_nums: usize,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        AssignmentConfig {
            column_generation_num: 20,
            column_update_num: 20,
            thread_nums: 1,
        }
    }
}

impl AssignmentConfig {
    pub fn validate(&self) -> DtaResult<()> {
        if self.column_generation_num == 0 {
            let err = DtaError::InvalidConfiguration("assignment.column_generation_num must be at least 1".to_string());
            error!(%err, "invalid assignment configuration");
            return Err(err);
        }
        if self.thread_nums == 0 {
            let err = DtaError::InvalidConfiguration("assignment.thread_nums must be at least 1".to_string());
            error!(%err, "invalid assignment configuration");
            return Err(err);
        }
        Ok(())
    }

    pub fn total_iterations(&self) -> usize {
        self.column_generation_num + self.column_update_num
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub enable: bool,
    pub resolution_in_second: u32,
    pub duration_in_minute: f64,
    pub traffic_flow_model: FlowModel,
    /// Vehicles per mile per lane at jam density, used by spatial-queue and
    /// kinematic-wave storage limits. Format for time-of-day capacity
    /// profiles is left to the external loader; absent one, capacity is flat.
    pub jam_density_per_lane: f64,
    /// Backward-wave speed for kinematic-wave, miles per hour.
    pub backward_wave_speed_mph: f64,
    pub start_minute: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            enable: false,
            resolution_in_second: 6,
            duration_in_minute: 60.0,
            traffic_flow_model: FlowModel::PointQueue,
            jam_density_per_lane: 200.0,
            backward_wave_speed_mph: 12.0,
            start_minute: 0.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> DtaResult<()> {
        if self.resolution_in_second == 0 {
            let err = DtaError::InvalidConfiguration("simulation.resolution_in_second must be at least 1".to_string());
            error!(%err, "invalid simulation configuration");
            return Err(err);
        }
        if self.duration_in_minute <= 0.0 {
            let err = DtaError::InvalidConfiguration("simulation.duration_in_minute must be positive".to_string());
            error!(%err, "invalid simulation configuration");
            return Err(err);
        }
        if self.jam_density_per_lane <= 0.0 {
            let err = DtaError::InvalidConfiguration("simulation.jam_density_per_lane must be positive".to_string());
            error!(%err, "invalid simulation configuration");
            return Err(err);
        }
        Ok(())
    }

    pub fn num_intervals(&self) -> u32 {
        ((self.duration_in_minute * 60.0) / self.resolution_in_second as f64).ceil() as u32
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub assignment: AssignmentConfig,
    pub simulation: SimulationConfig,
}

impl Config {
    pub fn validate(&self) -> DtaResult<()> {
        self.assignment.validate()?;
        if self.simulation.enable {
            self.simulation.validate()?;
        }
        Ok(())
    }
}

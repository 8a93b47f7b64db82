use thiserror::Error;

use crate::demand::OdKey;

/// The fatal error taxonomy of the core. Every operation either succeeds or
/// aborts with one of these; there is no recoverable-error surface inside
/// the solver or the simulation loop.
#[derive(Debug, Error)]
pub enum DtaError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid network topology: {0}")]
    InvalidTopology(String),

    #[error("unknown reference: {0}")]
    UnknownReference(String),

    #[error("no finite-cost path for OD {od:?} with positive demand")]
    UnreachableOd { od: OdKey },

    #[error("numeric fault: {0}")]
    NumericFault(String),

    #[error("empty column pool for OD {od:?} with positive demand")]
    EmptyPool { od: OdKey },

    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

pub type DtaResult<T> = std::result::Result<T, DtaError>;

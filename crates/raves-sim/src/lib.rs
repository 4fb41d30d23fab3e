//! raves-sim library.
//!
//! Deterministic simulation harness for the reconciliation engine: a seeded
//! corpus served with fault injection, responses delivered late and out of
//! order, and an oracle that checks the engine's committed state against
//! ground truth after every delivery.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` with context naming the failing round.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).

pub mod driver;
pub mod oracle;
pub mod rng;
pub mod source;

pub use driver::{SimConfig, SimDriver, SimReport};
pub use rng::DeterministicRng;
pub use source::{FaultConfig, SimulatedSource, sim_now};

/// Hour counter driving the engine.
pub mod clock;
pub mod engine;
pub mod kpi;
pub mod types;

pub use engine::{Engine, run, run_many};
pub use kpi::RunReport;
pub use types::{RunOutput, SimConfig, SimulationTrace, TraceEntry};

//! File input and output: JSON persistence, CSV export, atomic publication.

pub mod export;
pub mod json;
pub mod publish;

pub use export::{export_leaderboard, export_trace, write_leaderboard_csv, write_trace_csv};
pub use json::{load_dataset, save_dataset, save_report, save_summary};
pub use publish::publish_atomic;

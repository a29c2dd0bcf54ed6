pub mod enrollment;
pub mod match_gate;
pub mod recognition_orchestrator;
pub mod stats_sink;

// Pipeline processing: harmonization, validation, indicators and aggregation

pub mod aggregate;
pub mod harmonize;
pub mod indicators;
pub mod quality_gate;

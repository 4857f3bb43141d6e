// Data processing pipeline: ingestion, processing, and run reporting

pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod quality_report;
pub mod utils;

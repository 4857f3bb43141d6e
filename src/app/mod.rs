pub mod derive_use_case;
pub mod ingest_use_case;
pub mod ports;
pub mod report_use_case;

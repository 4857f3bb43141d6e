/// Source type tags as they appear in configuration and on the command line.
pub const EMPLOYMENT_STOCK: &str = "employment-stock";
pub const EMPLOYMENT_FLOW: &str = "employment-flow";
pub const GDP: &str = "gdp";
pub const TRADE_EXPORT: &str = "trade-export";
pub const SECTOR_ACTIVITY: &str = "sector-activity";

/// Activity code used for region-level aggregate rows (e.g. municipal GDP without a sector
/// breakdown). Never counted as a sector or product category.
pub const AGGREGATE_CODE: &str = "TOTAL";

/// File extensions picked up when a source entry points at a directory.
pub const DEFAULT_EXTENSIONS: &[&str] = &["csv", "txt", "tsv"];

// Output artifact names
pub const CLEAN_RECORDS_FILE: &str = "clean_records.csv";
pub const REJECTED_RECORDS_FILE: &str = "rejected_records.csv";
pub const INDICATORS_FILE: &str = "indicators.csv";
pub const TABLES_DIR: &str = "tables";
pub const QUALITY_REPORT_FILE: &str = "quality_report.json";
pub const SUMMARY_FILE: &str = "summary.json";
pub const DECOMPOSITIONS_FILE: &str = "decompositions.json";
pub const GROWTH_SUMMARY_FILE: &str = "growth_summary.json";
pub const METRICS_FILE: &str = "metrics.prom";

/// Convert the short source names used by the original data catalogue (rais, caged, ...)
/// into source type tags.
pub fn source_alias_to_type(alias: &str) -> Option<&'static str> {
    match alias.trim().to_ascii_lowercase().as_str() {
        "rais" | EMPLOYMENT_STOCK => Some(EMPLOYMENT_STOCK),
        "caged" | "novo_caged" | EMPLOYMENT_FLOW => Some(EMPLOYMENT_FLOW),
        "pib" | "pib_municipal" | GDP => Some(GDP),
        "comexstat" | "comex" | TRADE_EXPORT => Some(TRADE_EXPORT),
        "dataviva" | SECTOR_ACTIVITY => Some(SECTOR_ACTIVITY),
        _ => None,
    }
}

/// All supported source type tags
pub fn get_supported_source_types() -> Vec<&'static str> {
    vec![EMPLOYMENT_STOCK, EMPLOYMENT_FLOW, GDP, TRADE_EXPORT, SECTOR_ACTIVITY]
}

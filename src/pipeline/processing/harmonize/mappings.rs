use std::collections::HashMap;
use std::fmt;

use crate::domain::SourceType;

/// Canonical fields a source column can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Region,
    Sector,
    Product,
    Value,
    Period,
    Year,
    Month,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Region => "region",
            CanonicalField::Sector => "sector",
            CanonicalField::Product => "product",
            CanonicalField::Value => "value",
            CanonicalField::Period => "period",
            CanonicalField::Year => "year",
            CanonicalField::Month => "month",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a mapping table: the header variants that feed a canonical field.
/// Variants are written in normalized form (snake_case, no accents).
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub field: CanonicalField,
    pub variants: &'static [&'static str],
    pub required: bool,
}

/// Declarative column mapping for one source type.
#[derive(Debug, Clone)]
pub struct SchemaMapping {
    pub source_type: SourceType,
    pub columns: Vec<ColumnSpec>,
}

const REGION_VARIANTS: &[&str] = &[
    "municipio",
    "nome_municipio",
    "municipality",
    "cidade",
    "city",
    "co_mun",
    "cod_municipio",
    "codigo_municipio",
    "id_municipio",
    "regiao",
    "region",
    "region_code",
];

const SECTOR_VARIANTS: &[&str] = &[
    "setor",
    "sector",
    "cnae",
    "cnae_secao",
    "secao_cnae",
    "cnae_2_0_secao",
    "secao_cnae_2_0",
    "cnae_2_0_classe",
    "cnae_2_0_subclasse",
    "secao",
    "atividade",
    "industry",
    "industry_id",
    "sector_code",
];

const PRODUCT_VARIANTS: &[&str] = &[
    "produto",
    "product",
    "sh4",
    "co_sh4",
    "sh2",
    "ncm",
    "co_ncm",
    "hs",
    "product_code",
];

const PERIOD_VARIANTS: &[&str] = &[
    "periodo",
    "period",
    "competencia",
    "mes_ano",
    "ano_mes",
    "data",
    "date",
];

const YEAR_VARIANTS: &[&str] = &["ano", "year", "co_ano", "ano_referencia"];
const MONTH_VARIANTS: &[&str] = &["mes", "month", "co_mes"];

const EMPLOYMENT_STOCK_VALUES: &[&str] = &[
    "empregos",
    "emprego",
    "vinculos",
    "vinculos_ativos",
    "qtd_vinculos_ativos",
    "estoque",
    "trabalhadores",
    "employment",
    "jobs",
    "num_jobs",
];

const EMPLOYMENT_FLOW_VALUES: &[&str] = &[
    "saldo",
    "saldo_movimentacao",
    "saldo_empregos",
    "saldo_caged",
    "net_jobs",
    "net_employment",
];

const GDP_VALUES: &[&str] = &[
    "pib",
    "pib_municipal",
    "produto_interno_bruto",
    "valor_adicionado",
    "vab",
    "gdp",
    "valor",
    "value",
];

const EXPORT_VALUES: &[&str] = &[
    "valor_fob",
    "vl_fob",
    "fob",
    "valor_exportado",
    "exportacoes",
    "exports",
    "export_value",
    "valor",
    "value",
];

const SECTOR_ACTIVITY_VALUES: &[&str] = &["num_jobs", "jobs", "employment", "empregos", "emprego", "wage_employment"];

fn time_columns() -> [ColumnSpec; 3] {
    [
        ColumnSpec {
            field: CanonicalField::Period,
            variants: PERIOD_VARIANTS,
            required: false,
        },
        ColumnSpec {
            field: CanonicalField::Year,
            variants: YEAR_VARIANTS,
            required: false,
        },
        ColumnSpec {
            field: CanonicalField::Month,
            variants: MONTH_VARIANTS,
            required: false,
        },
    ]
}

impl SchemaMapping {
    fn with_activity(source_type: SourceType, activity: ColumnSpec, values: &'static [&'static str]) -> Self {
        let mut columns = vec![
            ColumnSpec {
                field: CanonicalField::Region,
                variants: REGION_VARIANTS,
                required: true,
            },
            activity,
            ColumnSpec {
                field: CanonicalField::Value,
                variants: values,
                required: true,
            },
        ];
        columns.extend(time_columns());
        Self { source_type, columns }
    }

    pub fn for_source_type(source_type: SourceType) -> Self {
        let sector = |required| ColumnSpec {
            field: CanonicalField::Sector,
            variants: SECTOR_VARIANTS,
            required,
        };

        match source_type {
            SourceType::EmploymentStock => Self::with_activity(source_type, sector(true), EMPLOYMENT_STOCK_VALUES),
            SourceType::EmploymentFlow => Self::with_activity(source_type, sector(true), EMPLOYMENT_FLOW_VALUES),
            // Municipal GDP is often published without a sector breakdown
            SourceType::Gdp => Self::with_activity(source_type, sector(false), GDP_VALUES),
            SourceType::TradeExport => Self::with_activity(
                source_type,
                ColumnSpec {
                    field: CanonicalField::Product,
                    variants: PRODUCT_VARIANTS,
                    required: true,
                },
                EXPORT_VALUES,
            ),
            SourceType::SectorActivity => Self::with_activity(source_type, sector(true), SECTOR_ACTIVITY_VALUES),
        }
    }

    /// The column holding the activity code (sector or product).
    pub fn activity_field(&self) -> CanonicalField {
        if self.source_type.is_trade() {
            CanonicalField::Product
        } else {
            CanonicalField::Sector
        }
    }

    pub fn spec(&self, field: CanonicalField) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.field == field)
    }
}

/// Mapping tables for every supported source type.
pub struct MappingRegistry {
    mappings: HashMap<SourceType, SchemaMapping>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        let mappings = SourceType::ALL
            .into_iter()
            .map(|source_type| (source_type, SchemaMapping::for_source_type(source_type)))
            .collect();
        Self { mappings }
    }

    pub fn get(&self, source_type: SourceType) -> Option<&SchemaMapping> {
        self.mappings.get(&source_type)
    }
}

impl Default for MappingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_source_type_has_a_mapping() {
        let registry = MappingRegistry::new();
        for source_type in SourceType::ALL {
            let mapping = registry.get(source_type).unwrap();
            assert!(mapping.spec(CanonicalField::Region).unwrap().required);
            assert!(mapping.spec(CanonicalField::Value).unwrap().required);
            assert!(!mapping.spec(CanonicalField::Period).unwrap().required);
        }
    }

    #[test]
    fn trade_maps_products_and_gdp_sector_is_optional() {
        let trade = SchemaMapping::for_source_type(SourceType::TradeExport);
        assert_eq!(trade.activity_field(), CanonicalField::Product);
        assert!(trade.spec(CanonicalField::Sector).is_none());

        let gdp = SchemaMapping::for_source_type(SourceType::Gdp);
        assert!(!gdp.spec(CanonicalField::Sector).unwrap().required);
    }
}

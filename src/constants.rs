/// Source identifiers and the provenance tags they stamp into `fuente`.
/// Identifiers double as the result-map keys returned by the pipeline.
pub const CATEGORIA_SOURCE: &str = "categoria_ocupacional";
pub const GRUPO_SOURCE: &str = "grupo_ocupacional";
pub const UNIFIED_DATASET: &str = "unified";

pub const CATEGORIA_FUENTE: &str = "categoria_ocupacional";
pub const GRUPO_FUENTE: &str = "grupo_ocupacional_ciuo88";

// Raw input files (read from the raw-data directory)
pub const CATEGORIA_RAW_FILE: &str = "ocupados_categoria_ocupacional.csv";
pub const GRUPO_RAW_FILE: &str = "ocupados_grupo_ocupacional_ciuo88.csv";

// Processed output files (written to the processed-data directory)
pub const CATEGORIA_PROCESSED_FILE: &str = "categoria_ocupacional_processed.csv";
pub const GRUPO_PROCESSED_FILE: &str = "grupo_ocupacional_processed.csv";
pub const UNIFIED_PROCESSED_FILE: &str = "ocupacion_laboral_unified.csv";

pub const RUN_MANIFEST_FILE: &str = "run_manifest.json";
pub const ROUNDING_REPORT_FILE: &str = "rounding_comparison.json";
pub const LOG_FILE_PREFIX: &str = "etl_pipeline.log";
pub const CONFIG_FILE: &str = "ocupacion_etl.toml";

// Raw source columns shared by both extracts
pub const RAW_TRIMESTRE: &str = "DTI_CL_TRIMESTRE_MOVIL";
pub const RAW_TRIMESTRE_DESC: &str = "Trimestre Móvil";
pub const RAW_REGION: &str = "DTI_CL_REGION";
pub const RAW_REGION_DESC: &str = "Región";
pub const RAW_GRUPO_DESC: &str = "Grupo ocupacional";
pub const RAW_SEXO: &str = "DTI_CL_SEXO";
pub const RAW_SEXO_DESC: &str = "Sexo";
pub const RAW_VALUE: &str = "Value";

// The one column that differs between the two extracts
pub const RAW_CISE: &str = "DTI_CL_CISE";
pub const RAW_GRUPO_OCU: &str = "DTI_CL_GRUPO_OCU";

// Canonical schema
pub const COL_TRIMESTRE: &str = "trimestre_movil";
pub const COL_TRIMESTRE_DESC: &str = "trimestre_movil_desc";
pub const COL_REGION_CODE: &str = "region_code";
pub const COL_REGION_NAME: &str = "region_name";
pub const COL_GRUPO_CODE: &str = "grupo_ocupacional_code";
pub const COL_GRUPO_DESC: &str = "grupo_ocupacional_desc";
pub const COL_SEXO_CODE: &str = "sexo_code";
pub const COL_SEXO_DESC: &str = "sexo_desc";
pub const COL_VALOR: &str = "valor";
pub const COL_FUENTE: &str = "fuente";

/// Output column order for every processed file.
pub const CANONICAL_COLUMNS: [&str; 10] = [
    COL_TRIMESTRE,
    COL_TRIMESTRE_DESC,
    COL_REGION_CODE,
    COL_REGION_NAME,
    COL_GRUPO_CODE,
    COL_GRUPO_DESC,
    COL_SEXO_CODE,
    COL_SEXO_DESC,
    COL_VALOR,
    COL_FUENTE,
];

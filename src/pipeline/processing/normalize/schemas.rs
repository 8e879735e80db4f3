use super::SourceSchema;
use crate::constants::{CATEGORIA_FUENTE, CATEGORIA_SOURCE, GRUPO_FUENTE, GRUPO_SOURCE, RAW_CISE, RAW_GRUPO_OCU};

/// Employed persons by occupational category (CISE code)
pub const CATEGORIA_SCHEMA: SourceSchema = SourceSchema {
    source_id: CATEGORIA_SOURCE,
    fuente: CATEGORIA_FUENTE,
    code_column: RAW_CISE,
};

/// Employed persons by CIUO-88 occupational group
pub const GRUPO_SCHEMA: SourceSchema = SourceSchema {
    source_id: GRUPO_SOURCE,
    fuente: GRUPO_FUENTE,
    code_column: RAW_GRUPO_OCU,
};

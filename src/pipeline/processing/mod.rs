// Pipeline processing: validation, cleaning, normalization and quality checks

pub mod clean;
pub mod normalize;
pub mod quality_gate;
pub mod validate;

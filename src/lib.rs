pub mod column_resolver;
pub mod connections;
pub mod converter;
pub mod custom_pair;
pub mod entity_resolver;
pub mod env_loader;
pub mod error;
pub mod export_writer;
pub mod graph_assembly;
pub mod models;
pub mod normalize;
pub mod table_merge;

pub use converter::{build_tables, convert_many, inspect_file};
pub use error::{ConvertError, ConvertResult};
pub use models::{
    ConversionRequest, ConversionSummary, FieldMapping, FileInspection, GraphMode, OutputFormat,
    PairColumns,
};

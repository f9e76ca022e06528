pub mod fetch;
pub mod fuel;
pub mod geojson;
pub mod merge;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod records;
pub mod stats;

//! # SimpleJSON Core Library
//!
//! Wire model and codecs for Grafana's "Simple JSON" datasource protocol,
//! shared by the HTTP adapter and by datasource implementations.
//!
//! ## Features
//!
//! - **Time codecs**: RFC3339 range times, millisecond point times and
//!   interval durations
//! - **Tables**: typed columns with equal-length validation and row encoding
//! - **Queries**: request envelopes, target kinds and sorted series encoding
//! - **Annotations**: expansion of point and region annotations into records
//! - **Tags**: ad-hoc filter keys and values
//! - **Datasources**: the capability traits an application implements

pub mod annotation;
pub mod datasource;
pub mod error;
pub mod query;
pub mod table;
pub mod tags;
pub mod time;

// Re-export commonly used types
pub use annotation::{expand_annotations, Annotation, AnnotationQuery, AnnotationRecord};
pub use datasource::{
    AnnotationsArguments, Annotator, Datasources, QueryArguments, Searcher, TableQuerier,
    TableQueryArguments, TagSearcher, TimeSeriesQuerier,
};
pub use error::{SimpleJsonError, SimpleJsonResult};
pub use query::{encode_series, DataPoint, QueryRequest, QueryResponseEntry, TargetKind};
pub use table::{encode_table, ColumnData, ColumnKind, TableColumn, TableResponse};
pub use tags::{TagKey, TagValue};
pub use time::{TimeRange, Timestamp};

/// Version information for simplejson-core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Datasource capabilities
//!
//! The protocol adapter owns no data. Everything it serves comes from up to
//! five independently pluggable capabilities:
//!
//! - [`TimeSeriesQuerier`] answers `timeserie` targets
//! - [`TableQuerier`] answers `table` targets
//! - [`Annotator`] answers annotation queries
//! - [`Searcher`] lists metric names for the query editor
//! - [`TagSearcher`] lists ad-hoc filter keys and values
//!
//! A [`Datasources`] record states which capabilities are wired. It is built
//! once and handed to the dispatcher; requests needing an absent capability
//! fail with [`SimpleJsonError::NotImplemented`].
//!
//! Cancellation is carried by the returned futures: when a client goes away
//! the request future is dropped together with any in-flight call.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::annotation::Annotation;
use crate::error::{SimpleJsonError, SimpleJsonResult};
use crate::query::{AdhocFilter, DataPoint};
use crate::table::TableColumn;
use crate::tags::{TagKey, TagValue};
use crate::time::TimeRange;

/// Arguments passed with every timeseries query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryArguments {
    pub range: TimeRange,
    pub interval: Duration,
    pub max_data_points: i64,
    pub filters: Vec<AdhocFilter>,
}

/// Arguments passed with every table query
#[derive(Debug, Clone, PartialEq)]
pub struct TableQueryArguments {
    pub range: TimeRange,
    pub filters: Vec<AdhocFilter>,
}

/// Arguments passed with every annotation query
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationsArguments {
    pub range: TimeRange,
}

/// Source of timeseries data.
///
/// Points may be returned in any order; they are sorted before encoding.
#[async_trait]
pub trait TimeSeriesQuerier: Send + Sync {
    async fn query(&self, target: &str, args: &QueryArguments) -> SimpleJsonResult<Vec<DataPoint>>;
}

/// Source of table data.
///
/// All returned columns must have the same number of values.
#[async_trait]
pub trait TableQuerier: Send + Sync {
    async fn query_table(
        &self,
        target: &str,
        args: &TableQueryArguments,
    ) -> SimpleJsonResult<Vec<TableColumn>>;
}

/// Source of annotations. `query` is the dashboard's annotation query text.
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotations(
        &self,
        query: &str,
        args: &AnnotationsArguments,
    ) -> SimpleJsonResult<Vec<Annotation>>;
}

/// Metric name lookup for the query editor
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, target: &str) -> SimpleJsonResult<Vec<String>>;
}

/// Tag lookup for ad-hoc filters
#[async_trait]
pub trait TagSearcher: Send + Sync {
    async fn tag_keys(&self) -> SimpleJsonResult<Vec<TagKey>>;

    async fn tag_values(&self, key: &str) -> SimpleJsonResult<Vec<TagValue>>;
}

/// The set of capabilities wired into an adapter
#[derive(Clone, Default)]
pub struct Datasources {
    query: Option<Arc<dyn TimeSeriesQuerier>>,
    table_query: Option<Arc<dyn TableQuerier>>,
    annotations: Option<Arc<dyn Annotator>>,
    search: Option<Arc<dyn Searcher>>,
    tag_search: Option<Arc<dyn TagSearcher>>,
}

impl Datasources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire a single source into every capability
    pub fn all<T>(source: Arc<T>) -> Self
    where
        T: TimeSeriesQuerier + TableQuerier + Annotator + Searcher + TagSearcher + 'static,
    {
        Self::new()
            .with_querier(source.clone())
            .with_table_querier(source.clone())
            .with_annotator(source.clone())
            .with_searcher(source.clone())
            .with_tag_searcher(source)
    }

    pub fn with_querier(mut self, querier: Arc<dyn TimeSeriesQuerier>) -> Self {
        self.query = Some(querier);
        self
    }

    pub fn with_table_querier(mut self, querier: Arc<dyn TableQuerier>) -> Self {
        self.table_query = Some(querier);
        self
    }

    pub fn with_annotator(mut self, annotator: Arc<dyn Annotator>) -> Self {
        self.annotations = Some(annotator);
        self
    }

    pub fn with_searcher(mut self, searcher: Arc<dyn Searcher>) -> Self {
        self.search = Some(searcher);
        self
    }

    pub fn with_tag_searcher(mut self, tag_searcher: Arc<dyn TagSearcher>) -> Self {
        self.tag_search = Some(tag_searcher);
        self
    }

    pub fn querier(&self) -> SimpleJsonResult<&dyn TimeSeriesQuerier> {
        self.query
            .as_deref()
            .ok_or_else(|| missing("timeseries query"))
    }

    pub fn table_querier(&self) -> SimpleJsonResult<&dyn TableQuerier> {
        self.table_query
            .as_deref()
            .ok_or_else(|| missing("table query"))
    }

    pub fn annotator(&self) -> SimpleJsonResult<&dyn Annotator> {
        self.annotations
            .as_deref()
            .ok_or_else(|| missing("annotations"))
    }

    pub fn searcher(&self) -> SimpleJsonResult<&dyn Searcher> {
        self.search
            .as_deref()
            .ok_or_else(|| missing("search"))
    }

    pub fn tag_searcher(&self) -> SimpleJsonResult<&dyn TagSearcher> {
        self.tag_search
            .as_deref()
            .ok_or_else(|| missing("tag search"))
    }

    /// Names of the wired capabilities, for startup logging
    pub fn capabilities(&self) -> Vec<&'static str> {
        [
            ("query", self.query.is_some()),
            ("table_query", self.table_query.is_some()),
            ("annotations", self.annotations.is_some()),
            ("search", self.search.is_some()),
            ("tag_search", self.tag_search.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

fn missing(capability: &'static str) -> SimpleJsonError {
    debug!("No {} datasource registered", capability);
    SimpleJsonError::NotImplemented(capability)
}

impl fmt::Debug for Datasources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datasources")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

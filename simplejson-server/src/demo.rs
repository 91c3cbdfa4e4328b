//! In-memory demonstration datasource
//!
//! Serves fixed data through every capability so the adapter can be pointed
//! at from Grafana without any backing store.

use async_trait::async_trait;
use simplejson_core::{
    annotation::Annotation,
    datasource::{
        AnnotationsArguments, Annotator, QueryArguments, Searcher, TableQuerier,
        TableQueryArguments, TagSearcher, TimeSeriesQuerier,
    },
    error::SimpleJsonResult,
    query::DataPoint,
    table::TableColumn,
    tags::{TagKey, TagValue},
    time::Timestamp,
};
use tracing::trace;

const METRIC_NAMES: [&str; 3] = ["example1", "example2", "example3"];
const TAG_KEY: &str = "mykey";

/// Datasource answering every request with canned data
#[derive(Debug, Default, Clone)]
pub struct DemoDatasource;

impl DemoDatasource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TimeSeriesQuerier for DemoDatasource {
    async fn query(&self, target: &str, args: &QueryArguments) -> SimpleJsonResult<Vec<DataPoint>> {
        trace!("Demo timeseries query for '{}'", target);
        // Newest first; the dispatcher sorts before encoding.
        Ok(vec![
            DataPoint::new(args.range.to, 1500.0),
            DataPoint::new(args.range.to.add_millis(-5_000)?, 1234.0),
        ])
    }
}

#[async_trait]
impl TableQuerier for DemoDatasource {
    async fn query_table(
        &self,
        target: &str,
        args: &TableQueryArguments,
    ) -> SimpleJsonResult<Vec<TableColumn>> {
        trace!("Demo table query for '{}'", target);
        Ok(vec![
            TableColumn::time("Time", vec![args.range.to]),
            TableColumn::string("SomeText", vec!["blah".to_string()]),
            TableColumn::number("Value", vec![1.0]),
        ])
    }
}

#[async_trait]
impl Annotator for DemoDatasource {
    async fn annotations(
        &self,
        query: &str,
        _args: &AnnotationsArguments,
    ) -> SimpleJsonResult<Vec<Annotation>> {
        trace!("Demo annotation query '{}'", query);
        Ok(vec![
            Annotation::point(Timestamp::from_secs(1234)?, "First Title", "First annotation"),
            Annotation::region(
                Timestamp::from_secs(1235)?,
                Timestamp::from_secs(1237)?,
                "Second Title",
                "Second annotation with range",
            )
            .with_tags(["outage"]),
        ])
    }
}

#[async_trait]
impl Searcher for DemoDatasource {
    async fn search(&self, target: &str) -> SimpleJsonResult<Vec<String>> {
        Ok(METRIC_NAMES
            .iter()
            .filter(|name| name.contains(target))
            .map(|name| name.to_string())
            .collect())
    }
}

#[async_trait]
impl TagSearcher for DemoDatasource {
    async fn tag_keys(&self) -> SimpleJsonResult<Vec<TagKey>> {
        Ok(vec![TagKey::string(TAG_KEY)])
    }

    async fn tag_values(&self, key: &str) -> SimpleJsonResult<Vec<TagValue>> {
        if key != TAG_KEY {
            return Ok(Vec::new());
        }
        Ok(vec![TagValue::string("value1"), TagValue::string("value2")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_filters_by_target() {
        let demo = DemoDatasource::new();
        assert_eq!(demo.search("").await.unwrap().len(), 3);
        assert_eq!(demo.search("2").await.unwrap(), vec!["example2"]);
    }

    #[tokio::test]
    async fn test_tag_values_only_for_known_key() {
        let demo = DemoDatasource::new();
        assert_eq!(demo.tag_values("mykey").await.unwrap().len(), 2);
        assert!(demo.tag_values("other").await.unwrap().is_empty());
    }
}

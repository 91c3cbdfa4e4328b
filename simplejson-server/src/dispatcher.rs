use simplejson_core::{
    annotation::{expand_annotations, AnnotationRecord, AnnotationsRequest},
    datasource::{AnnotationsArguments, Datasources},
    error::SimpleJsonResult,
    query::{
        encode_series, QueryRequest, QueryResponseEntry, SearchRequest, TagValuesRequest, Target,
        TargetKind,
    },
    table::encode_table,
    tags::{TagKey, TagValue},
};
use std::time::Instant;
use tracing::{debug, error, info};

/// Translates decoded protocol requests into datasource calls and encodes
/// their results. Holds no state beyond the wired datasources.
pub struct Dispatcher {
    sources: Datasources,
}

impl Dispatcher {
    pub fn new(sources: Datasources) -> Self {
        info!(
            "Dispatcher initialized with capabilities: {:?}",
            sources.capabilities()
        );
        Self { sources }
    }

    /// Answer a `/query` request with one entry per target, in target order.
    ///
    /// Every target type is checked before any datasource is called. The
    /// first failing target aborts the whole request.
    pub async fn handle_query(
        &self,
        request: QueryRequest,
    ) -> SimpleJsonResult<Vec<QueryResponseEntry>> {
        let start_time = Instant::now();

        let kinds = request
            .targets
            .iter()
            .map(Target::kind)
            .collect::<SimpleJsonResult<Vec<_>>>()?;

        let mut entries = Vec::with_capacity(request.targets.len());
        for (target, kind) in request.targets.iter().zip(kinds) {
            debug!("Dispatching {} target '{}'", kind, target.target);
            let entry = match kind {
                TargetKind::TimeSeries => self.query_series(&request, target).await?,
                TargetKind::Table => self.query_table(&request, target).await?,
            };
            entries.push(entry);
        }

        info!(
            "Query completed in {:?}, returned {} entries",
            start_time.elapsed(),
            entries.len()
        );
        Ok(entries)
    }

    async fn query_series(
        &self,
        request: &QueryRequest,
        target: &Target,
    ) -> SimpleJsonResult<QueryResponseEntry> {
        let points = self
            .sources
            .querier()?
            .query(&target.target, &request.query_arguments())
            .await
            .map_err(|err| {
                error!("Timeseries query for '{}' failed: {}", target.target, err);
                err.into_datasource()
            })?;

        Ok(QueryResponseEntry::TimeSeries(encode_series(
            target.target.clone(),
            points,
        )))
    }

    async fn query_table(
        &self,
        request: &QueryRequest,
        target: &Target,
    ) -> SimpleJsonResult<QueryResponseEntry> {
        let columns = self
            .sources
            .table_querier()?
            .query_table(&target.target, &request.table_arguments())
            .await
            .map_err(|err| {
                error!("Table query for '{}' failed: {}", target.target, err);
                err.into_datasource()
            })?;

        Ok(QueryResponseEntry::Table(encode_table(&columns)?))
    }

    /// Answer an `/annotations` request
    pub async fn handle_annotations(
        &self,
        request: AnnotationsRequest,
    ) -> SimpleJsonResult<Vec<AnnotationRecord>> {
        let args = AnnotationsArguments {
            range: request.range.time_range(),
        };

        let annotations = self
            .sources
            .annotator()?
            .annotations(&request.annotation.query, &args)
            .await
            .map_err(|err| {
                error!(
                    "Annotation query '{}' failed: {}",
                    request.annotation.query, err
                );
                err.into_datasource()
            })?;

        let records = expand_annotations(&request.annotation, annotations);
        info!("Returned {} annotation records", records.len());
        Ok(records)
    }

    /// Answer a `/search` request
    pub async fn handle_search(&self, request: SearchRequest) -> SimpleJsonResult<Vec<String>> {
        let names = self
            .sources
            .searcher()?
            .search(&request.target)
            .await
            .map_err(|err| err.into_datasource())?;

        info!("Search for '{}' returned {} names", request.target, names.len());
        Ok(names)
    }

    /// Answer a `/tag-keys` request
    pub async fn handle_tag_keys(&self) -> SimpleJsonResult<Vec<TagKey>> {
        let keys = self
            .sources
            .tag_searcher()?
            .tag_keys()
            .await
            .map_err(|err| err.into_datasource())?;

        info!("Returned {} tag keys", keys.len());
        Ok(keys)
    }

    /// Answer a `/tag-values` request
    pub async fn handle_tag_values(
        &self,
        request: TagValuesRequest,
    ) -> SimpleJsonResult<Vec<TagValue>> {
        let values = self
            .sources
            .tag_searcher()?
            .tag_values(&request.key)
            .await
            .map_err(|err| err.into_datasource())?;

        info!(
            "Returned {} tag values for key '{}'",
            values.len(),
            request.key
        );
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use simplejson_core::{
        datasource::{QueryArguments, TableQuerier, TableQueryArguments, TimeSeriesQuerier},
        error::SimpleJsonError,
        query::{DataPoint, QueryRange},
        table::TableColumn,
        time::Timestamp,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TimeSeriesQuerier for CountingSource {
        async fn query(&self, target: &str, args: &QueryArguments) -> SimpleJsonResult<Vec<DataPoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if target == "broken" {
                return Err(SimpleJsonError::datasource("series store unavailable"));
            }
            Ok(vec![
                DataPoint::new(args.range.to, 2.0),
                DataPoint::new(args.range.from, 1.0),
            ])
        }
    }

    #[async_trait]
    impl TableQuerier for CountingSource {
        async fn query_table(
            &self,
            target: &str,
            _: &TableQueryArguments,
        ) -> SimpleJsonResult<Vec<TableColumn>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let short = if target == "ragged" { 1 } else { 2 };
            Ok(vec![
                TableColumn::string("Host", vec!["a".into(), "b".into()]),
                TableColumn::number("Value", vec![1.0; short]),
            ])
        }
    }

    fn request(targets: Vec<Target>) -> QueryRequest {
        QueryRequest {
            panel_id: serde_json::Value::Null,
            range: QueryRange {
                from: Timestamp::from_millis(1_000).unwrap(),
                to: Timestamp::from_millis(9_000).unwrap(),
                raw: Default::default(),
            },
            range_raw: Default::default(),
            interval: std::time::Duration::from_secs(30),
            interval_ms: 30_000,
            targets,
            adhoc_filters: Vec::new(),
            format: "json".to_string(),
            max_data_points: 100,
        }
    }

    fn typed(name: &str, kind: &str) -> Target {
        Target {
            target_type: kind.to_string(),
            ..Target::new(name)
        }
    }

    fn dispatcher(source: Arc<CountingSource>) -> Dispatcher {
        Dispatcher::new(
            Datasources::new()
                .with_querier(source.clone())
                .with_table_querier(source),
        )
    }

    #[tokio::test]
    async fn test_mixed_targets_keep_order() {
        let source = Arc::new(CountingSource::default());
        let entries = dispatcher(source.clone())
            .handle_query(request(vec![
                typed("cpu", ""),
                typed("hosts", "table"),
                typed("mem", "timeserie"),
            ]))
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], QueryResponseEntry::TimeSeries(s) if s.target == "cpu"));
        assert!(matches!(&entries[1], QueryResponseEntry::Table(t) if t.rows.len() == 2));
        assert!(matches!(&entries[2], QueryResponseEntry::TimeSeries(s) if s.target == "mem"));

        if let QueryResponseEntry::TimeSeries(series) = &entries[0] {
            assert_eq!(series.datapoints[0].value, 1.0);
            assert_eq!(series.datapoints[1].value, 2.0);
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unknown_kind_calls_no_datasource() {
        let source = Arc::new(CountingSource::default());
        let err = dispatcher(source.clone())
            .handle_query(request(vec![typed("cpu", ""), typed("x", "bogus")]))
            .await
            .unwrap_err();

        assert!(matches!(err, SimpleJsonError::UnknownTargetKind(ref k) if k == "bogus"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_datasource_failure_aborts_request() {
        let source = Arc::new(CountingSource::default());
        let err = dispatcher(source.clone())
            .handle_query(request(vec![
                typed("broken", ""),
                typed("cpu", ""),
            ]))
            .await
            .unwrap_err();

        assert_eq!(err.category(), "datasource");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ragged_table_fails() {
        let source = Arc::new(CountingSource::default());
        let err = dispatcher(source)
            .handle_query(request(vec![typed("ragged", "table")]))
            .await
            .unwrap_err();

        assert_eq!(err.category(), "column_length_mismatch");
    }

    #[tokio::test]
    async fn test_missing_capability() {
        let source = Arc::new(CountingSource::default());
        let dispatcher = Dispatcher::new(Datasources::new().with_querier(source));

        let err = dispatcher
            .handle_query(request(vec![typed("hosts", "table")]))
            .await
            .unwrap_err();
        assert!(matches!(err, SimpleJsonError::NotImplemented("table query")));

        let err = dispatcher.handle_tag_keys().await.unwrap_err();
        assert!(matches!(err, SimpleJsonError::NotImplemented("tag search")));
    }

    #[tokio::test]
    async fn test_empty_target_list() {
        let source = Arc::new(CountingSource::default());
        let entries = dispatcher(source).handle_query(request(Vec::new())).await.unwrap();
        assert!(entries.is_empty());
    }
}

//! Annotations and their expansion into wire records
//!
//! A point annotation becomes a single record. A region annotation becomes two
//! records, one at its start and one at its end, that share a `regionId`. The
//! region id is the index of the source annotation in the datasource's result,
//! so it is only meaningful within one response.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::query::{QueryRange, RawRange};
use crate::time::{self, Timestamp};

/// The annotation descriptor configured on the dashboard. It is echoed back
/// in every record and never interpreted beyond `query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub datasource: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub icon_color: String,
}

/// Body of an `/annotations` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationsRequest {
    pub range: QueryRange,
    #[serde(default)]
    pub range_raw: RawRange,
    #[serde(default)]
    pub annotation: AnnotationQuery,
}

/// An event returned by an annotation datasource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub start: Timestamp,
    /// Present for region annotations
    pub end: Option<Timestamp>,
    pub title: String,
    pub text: String,
    pub tags: BTreeSet<String>,
}

/// One annotation record on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub annotation: AnnotationQuery,
    #[serde(with = "time::point_time")]
    pub time: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<usize>,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Annotation {
    /// An annotation at a single point in time
    pub fn point<T: Into<String>, X: Into<String>>(start: Timestamp, title: T, text: X) -> Self {
        Self {
            start,
            end: None,
            title: title.into(),
            text: text.into(),
            tags: BTreeSet::new(),
        }
    }

    /// An annotation spanning `start` to `end`
    pub fn region<T: Into<String>, X: Into<String>>(
        start: Timestamp,
        end: Timestamp,
        title: T,
        text: X,
    ) -> Self {
        Self {
            end: Some(end),
            ..Self::point(start, title, text)
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn is_region(&self) -> bool {
        self.end.is_some()
    }
}

/// Expand annotations into wire records, preserving datasource order.
pub fn expand_annotations(
    query: &AnnotationQuery,
    annotations: Vec<Annotation>,
) -> Vec<AnnotationRecord> {
    let mut records = Vec::with_capacity(annotations.len());

    for (index, annotation) in annotations.into_iter().enumerate() {
        let region_id = annotation.is_region().then_some(index);
        let tags: Vec<String> = annotation.tags.into_iter().collect();

        let start = AnnotationRecord {
            annotation: query.clone(),
            time: annotation.start,
            region_id,
            title: annotation.title,
            text: annotation.text,
            tags,
        };

        let end = annotation.end.map(|end| AnnotationRecord {
            time: end,
            ..start.clone()
        });

        records.push(start);
        records.extend(end);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_secs(secs).unwrap()
    }

    fn deploy_query() -> AnnotationQuery {
        AnnotationQuery {
            name: "deploy".to_string(),
            datasource: "Simple JSON Datasource".to_string(),
            query: "#deploy".to_string(),
            enable: true,
            icon_color: "rgba(255, 96, 96, 1)".to_string(),
        }
    }

    #[test]
    fn test_point_annotation_yields_one_record() {
        let records = expand_annotations(
            &deploy_query(),
            vec![Annotation::point(ts(1_234), "First Title", "First annotation")],
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].region_id, None);
        assert_eq!(records[0].time, ts(1_234));
        assert_eq!(records[0].annotation, deploy_query());
    }

    #[test]
    fn test_region_annotation_yields_paired_records() {
        let records = expand_annotations(
            &deploy_query(),
            vec![
                Annotation::point(ts(1_234), "First Title", "First annotation"),
                Annotation::region(ts(1_235), ts(1_237), "Second Title", "Second")
                    .with_tags(["outage"]),
            ],
        );

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].region_id, Some(1));
        assert_eq!(records[2].region_id, Some(1));
        assert_eq!(records[1].time, ts(1_235));
        assert_eq!(records[2].time, ts(1_237));
        assert_eq!(records[1].title, records[2].title);
        assert_eq!(records[2].tags, vec!["outage".to_string()]);
    }

    #[test]
    fn test_region_at_index_zero_keeps_its_id() {
        let records = expand_annotations(
            &deploy_query(),
            vec![Annotation::region(ts(10), ts(20), "Outage", "")],
        );

        let value = serde_json::to_value(&records).unwrap();
        assert_eq!(value[0]["regionId"], 0);
        assert_eq!(value[1]["regionId"], 0);
    }

    #[test]
    fn test_region_ids_follow_source_index() {
        let records = expand_annotations(
            &deploy_query(),
            vec![
                Annotation::region(ts(1), ts(2), "a", ""),
                Annotation::point(ts(3), "b", ""),
                Annotation::region(ts(4), ts(5), "c", ""),
            ],
        );

        let ids: Vec<Option<usize>> = records.iter().map(|r| r.region_id).collect();
        assert_eq!(ids, vec![Some(0), Some(0), None, Some(2), Some(2)]);
    }

    #[test]
    fn test_record_wire_shape() {
        let records = expand_annotations(
            &deploy_query(),
            vec![Annotation::point(ts(1_234), "First Title", "First annotation")],
        );

        assert_eq!(
            serde_json::to_value(&records[0]).unwrap(),
            json!({
                "annotation": {
                    "name": "deploy",
                    "datasource": "Simple JSON Datasource",
                    "query": "#deploy",
                    "enable": true,
                    "iconColor": "rgba(255, 96, 96, 1)"
                },
                "time": 1_234_000,
                "title": "First Title",
                "text": "First annotation",
                "tags": []
            })
        );
    }

    #[test]
    fn test_tags_are_deduplicated_and_ordered() {
        let annotation = Annotation::point(ts(1), "t", "").with_tags(["web", "deploy", "web"]);
        let records = expand_annotations(&AnnotationQuery::default(), vec![annotation]);
        assert_eq!(records[0].tags, vec!["deploy".to_string(), "web".to_string()]);
    }
}

//! Query envelopes and timeseries responses
//!
//! A `/query` request looks like:
//!
//! ```json
//! {
//!   "panelId": 1,
//!   "range": {"from": "2016-10-31T06:33:44.866Z", "to": "2016-10-31T12:33:44.866Z",
//!             "raw": {"from": "now-6h", "to": "now"}},
//!   "rangeRaw": {"from": "now-6h", "to": "now"},
//!   "interval": "30s",
//!   "intervalMs": 30000,
//!   "targets": [{"target": "upper_50", "refId": "A", "hide": false, "type": "timeserie"}],
//!   "adhocFilters": [{"key": "host", "operator": "=", "value": "web-1"}],
//!   "format": "json",
//!   "maxDataPoints": 550
//! }
//! ```
//!
//! and is answered with one entry per target, in request order.

use serde::de::Error as _;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::datasource::{QueryArguments, TableQueryArguments};
use crate::error::{SimpleJsonError, SimpleJsonResult};
use crate::table::TableResponse;
use crate::time::{self, TimeRange, Timestamp};

/// The unparsed, relative form of a range, e.g. `now-6h`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRange {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

/// Absolute range of a request, in range time encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRange {
    #[serde(with = "time::range_time")]
    pub from: Timestamp,
    #[serde(with = "time::range_time")]
    pub to: Timestamp,
    #[serde(default)]
    pub raw: RawRange,
}

/// One key/operator/value filter set on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdhocFilter {
    pub key: String,
    pub operator: String,
    pub value: String,
}

/// How a target wants its data shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    TimeSeries,
    Table,
}

/// A single named series or table requested by a panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub ref_id: String,
    #[serde(default)]
    pub hide: bool,
    #[serde(default, rename = "type")]
    pub target_type: String,
}

/// Body of a `/query` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub panel_id: serde_json::Value,
    pub range: QueryRange,
    #[serde(default)]
    pub range_raw: RawRange,
    #[serde(default, with = "time::duration")]
    pub interval: Duration,
    #[serde(default)]
    pub interval_ms: i64,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub adhoc_filters: Vec<AdhocFilter>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub max_data_points: i64,
}

/// A single value at a point in time.
///
/// On the wire a datapoint is the pair `[value, milliseconds]`, both numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub time: Timestamp,
    pub value: f64,
}

/// Wire form of a timeseries target result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesResponse {
    pub target: String,
    pub datapoints: Vec<DataPoint>,
}

/// One element of a `/query` response array
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResponseEntry {
    TimeSeries(TimeSeriesResponse),
    Table(TableResponse),
}

/// Body of a `/search` request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default, alias = "Target")]
    pub target: String,
}

/// Body of a `/tag-keys` request. Carries no fields but must be a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagKeysRequest {}

/// Body of a `/tag-values` request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagValuesRequest {
    #[serde(default)]
    pub key: String,
}

impl QueryRange {
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.from, self.to)
    }
}

impl FromStr for TargetKind {
    type Err = SimpleJsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "timeserie" => Ok(TargetKind::TimeSeries),
            "table" => Ok(TargetKind::Table),
            other => Err(SimpleJsonError::UnknownTargetKind(other.to_string())),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::TimeSeries => f.write_str("timeserie"),
            TargetKind::Table => f.write_str("table"),
        }
    }
}

impl Target {
    pub fn new<S: Into<String>>(target: S) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Resolve the `type` field; absent and empty both mean timeseries
    pub fn kind(&self) -> SimpleJsonResult<TargetKind> {
        self.target_type.parse()
    }
}

impl QueryRequest {
    /// Arguments for a timeseries datasource call
    pub fn query_arguments(&self) -> QueryArguments {
        QueryArguments {
            range: self.range.time_range(),
            interval: self.interval,
            max_data_points: self.max_data_points,
            filters: self.adhoc_filters.clone(),
        }
    }

    /// Arguments for a table datasource call
    pub fn table_arguments(&self) -> TableQueryArguments {
        TableQueryArguments {
            range: self.range.time_range(),
            filters: self.adhoc_filters.clone(),
        }
    }
}

impl DataPoint {
    pub fn new(time: Timestamp, value: f64) -> Self {
        Self { time, value }
    }
}

impl Serialize for DataPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.value)?;
        pair.serialize_element(&(time::encode_point_time(self.time) as f64))?;
        pair.end()
    }
}

impl<'de> Deserialize<'de> for DataPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [value, millis] = <[f64; 2]>::deserialize(deserializer)?;
        let time = time::decode_point_time(millis as i64).map_err(D::Error::custom)?;
        Ok(Self { time, value })
    }
}

/// Encode a timeseries result, sorting datapoints ascending by time.
///
/// Consumers assume sorted series, so this sort is required for correctness.
pub fn encode_series<S: Into<String>>(target: S, mut points: Vec<DataPoint>) -> TimeSeriesResponse {
    points.sort_by_key(|point| point.time);
    TimeSeriesResponse {
        target: target.into(),
        datapoints: points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis).unwrap()
    }

    #[test]
    fn test_decode_full_envelope() {
        let body = json!({
            "panelId": 1,
            "range": {
                "from": "2016-10-31T06:33:44.866Z",
                "to": "2016-10-31T12:33:44.866Z",
                "raw": {"from": "now-6h", "to": "now"}
            },
            "rangeRaw": {"from": "now-6h", "to": "now"},
            "interval": "30s",
            "intervalMs": 30000,
            "targets": [
                {"target": "upper_50", "refId": "A", "hide": false, "type": "timeserie"},
                {"target": "upper_75", "refId": "B"}
            ],
            "adhocFilters": [{"key": "host", "operator": "=", "value": "web-1"}],
            "format": "json",
            "maxDataPoints": 550
        });

        let request: QueryRequest = serde_json::from_value(body).unwrap();

        assert_eq!(request.range.from.timestamp_millis(), 1_477_895_624_866);
        assert_eq!(request.range.to.timestamp_millis(), 1_477_917_224_866);
        assert_eq!(request.range_raw.from, "now-6h");
        assert_eq!(request.interval, Duration::from_secs(30));
        assert_eq!(request.max_data_points, 550);
        assert_eq!(request.targets.len(), 2);
        assert_eq!(request.targets[1].ref_id, "B");
        assert_eq!(request.targets[1].kind().unwrap(), TargetKind::TimeSeries);

        let args = request.query_arguments();
        assert_eq!(args.filters[0].key, "host");
        assert_eq!(args.range.from, request.range.from);
    }

    #[test]
    fn test_decode_rejects_bad_interval() {
        let body = json!({
            "range": {"from": "2016-10-31T06:33:44.866Z", "to": "2016-10-31T12:33:44.866Z"},
            "interval": "1.5s",
            "targets": []
        });
        assert!(serde_json::from_value::<QueryRequest>(body).is_err());
    }

    #[test]
    fn test_target_kinds() {
        assert_eq!("".parse::<TargetKind>().unwrap(), TargetKind::TimeSeries);
        assert_eq!("timeserie".parse::<TargetKind>().unwrap(), TargetKind::TimeSeries);
        assert_eq!("table".parse::<TargetKind>().unwrap(), TargetKind::Table);

        let err = "bogus".parse::<TargetKind>().unwrap_err();
        assert!(matches!(err, SimpleJsonError::UnknownTargetKind(ref k) if k == "bogus"));
        assert!("timeseries".parse::<TargetKind>().is_err());
    }

    #[test]
    fn test_encode_series_sorts_by_time() {
        let points = vec![
            DataPoint::new(ts(3_000), 3.0),
            DataPoint::new(ts(1_000), 1.0),
            DataPoint::new(ts(2_000), 2.0),
            DataPoint::new(ts(1_000), 1.5),
        ];

        let series = encode_series("cpu", points);
        let times: Vec<i64> = series
            .datapoints
            .iter()
            .map(|p| p.time.timestamp_millis())
            .collect();

        assert_eq!(times, vec![1_000, 1_000, 2_000, 3_000]);
        // equal times keep their input order
        assert_eq!(series.datapoints[0].value, 1.0);
        assert_eq!(series.datapoints[1].value, 1.5);
    }

    #[test]
    fn test_datapoint_wire_pair() {
        let series = encode_series("upper_75", vec![DataPoint::new(ts(1_450_754_160_000), 622.0)]);
        assert_eq!(
            serde_json::to_value(&series).unwrap(),
            json!({"target": "upper_75", "datapoints": [[622.0, 1_450_754_160_000.0]]})
        );

        let decoded: DataPoint = serde_json::from_value(json!([365, 1450754220000u64])).unwrap();
        assert_eq!(decoded.value, 365.0);
        assert_eq!(decoded.time, ts(1_450_754_220_000));
    }

    #[test]
    fn test_search_request_accepts_either_case() {
        let lower: SearchRequest = serde_json::from_str(r#"{"target":"cpu"}"#).unwrap();
        let upper: SearchRequest = serde_json::from_str(r#"{"Target":"cpu"}"#).unwrap();
        let empty: SearchRequest = serde_json::from_str("{}").unwrap();

        assert_eq!(lower.target, "cpu");
        assert_eq!(upper.target, "cpu");
        assert_eq!(empty.target, "");
    }

    #[test]
    fn test_tag_keys_request_requires_object() {
        assert!(serde_json::from_str::<TagKeysRequest>("{}").is_ok());
        assert!(serde_json::from_str::<TagKeysRequest>(r#"{"extra":1}"#).is_ok());
        assert!(serde_json::from_str::<TagKeysRequest>("{not json").is_err());
        assert!(serde_json::from_str::<TagKeysRequest>("[]").is_err());
    }
}

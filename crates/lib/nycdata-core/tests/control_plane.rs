use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nycdata_core::control::{
    BuildingProfileRequest, ComplaintSearchRequest, ComplaintTrendsRequest,
    HousingViolationsRequest, PermittedEventsRequest, StreetClosuresRequest,
};
use nycdata_core::reliability::RetryPolicy;
use nycdata_core::{CoreError, OpenDataControl, ReliabilityConfig, RowSource};
use nycdata_model::{Borough, Envelope, Row};
use serde_json::{Value, json};

type Params = BTreeMap<String, String>;
type Responder = dyn Fn(&str, &Params, usize) -> Result<Vec<Row>, CoreError> + Send + Sync;

/// In-memory source that records every request and answers from a closure.
struct ScriptedSource {
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Params)>>,
    responder: Box<Responder>,
}

impl ScriptedSource {
    fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &Params, usize) -> Result<Vec<Row>, CoreError> + Send + Sync + 'static,
    {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<(String, Params)> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl RowSource for ScriptedSource {
    async fn fetch_rows(&self, dataset_id: &str, params: &Params) -> Result<Vec<Row>, CoreError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("requests lock")
            .push((dataset_id.to_string(), params.clone()));
        (self.responder)(dataset_id, params, attempt)
    }
}

fn fast_config() -> ReliabilityConfig {
    ReliabilityConfig::default().with_retry(
        RetryPolicy::default()
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
            .with_jitter_fraction(0.0),
    )
}

fn control<F>(responder: F) -> OpenDataControl<ScriptedSource>
where
    F: Fn(&str, &Params, usize) -> Result<Vec<Row>, CoreError> + Send + Sync + 'static,
{
    OpenDataControl::new(ScriptedSource::new(responder), fast_config())
}

fn rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .map(|value| match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        })
        .collect()
}

fn complaint_rows() -> Vec<Row> {
    rows(vec![
        json!({
            "unique_key": "60000001",
            "created_date": "2025-03-01T10:00:00.000",
            "complaint_type": "Noise - Residential",
            "status": "Open",
            "borough": "BRONX",
            "community_board": "04 BRONX",
        }),
        json!({
            "unique_key": "60000001",
            "created_date": "2025-03-01T10:00:00.000",
            "complaint_type": "Noise - Residential",
            "status": "Open",
            "borough": "BRONX",
            "community_board": "04 BRONX",
        }),
        json!({
            "unique_key": "60000002",
            "created_date": "2025-03-01T11:00:00.000",
            "complaint_type": "HEAT/HOT WATER",
            "status": "Closed",
            "borough": "BRONX",
        }),
    ])
}

fn bronx_search() -> ComplaintSearchRequest {
    ComplaintSearchRequest {
        borough: Some("bx".to_string()),
        days: Some(30.0),
        limit: Some(50.0),
        ..ComplaintSearchRequest::default()
    }
}

fn failure_kind(envelope: &Envelope) -> &str {
    envelope.as_failure().map_or("", |body| body.kind.as_str())
}

#[tokio::test]
async fn search_deduplicates_and_enriches() {
    let control = control(|_, _, _| Ok(complaint_rows()));
    let envelope = control.search_complaints(bronx_search()).await;

    let success = envelope.as_success().expect("search succeeds");
    assert_eq!(success.count, 2);
    assert_eq!(success.records.len(), 2);
    assert_eq!(success.meta["deduplication"]["duplicatesRemoved"], 1);
    assert_eq!(success.meta["filters"]["borough"], "BRONX");
    let first = &success.records[0];
    assert_eq!(first.geo.borough, Some(Borough::Bronx));
    assert_eq!(first.geo.community_district.as_deref(), Some("204"));
    assert!(first.geo.nta.is_some());

    let requests = control.source().requests();
    assert_eq!(requests[0].0, "erm2-nwe9");
    assert!(requests[0].1["$where"].contains("borough = 'BRONX'"));
}

#[tokio::test]
async fn identical_queries_hit_the_cache() {
    let control = control(|_, _, _| Ok(complaint_rows()));
    let first = control.search_complaints(bronx_search()).await;
    let second = control.search_complaints(bronx_search()).await;

    assert_eq!(control.source().calls(), 1);
    assert_eq!(first.as_success().expect("first").meta["cached"], false);
    assert_eq!(second.as_success().expect("second").meta["cached"], true);
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let control = control(|_, _, attempt| {
        if attempt < 2 {
            Err(CoreError::Upstream {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
        } else {
            Ok(complaint_rows())
        }
    });
    let envelope = control.search_complaints(bronx_search()).await;

    assert!(envelope.is_success());
    assert_eq!(control.source().calls(), 3);
    assert_eq!(control.rate().snapshot().requests_in_window, 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let control = control(|_, _, _| {
        Err(CoreError::Upstream {
            status: 404,
            message: "dataset not found".to_string(),
        })
    });
    let envelope = control.search_complaints(bronx_search()).await;

    assert_eq!(control.source().calls(), 1);
    assert_eq!(failure_kind(&envelope), "UPSTREAM_ERROR");
    let body = envelope.as_failure().expect("failure");
    assert_eq!(body.details["status"], 404);
    assert_eq!(body.details["rateLimit"]["requestsInWindow"], 1);
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_error() {
    let control = control(|_, _, _| Err(CoreError::Transient("connection reset".to_string())));
    let envelope = control.search_complaints(bronx_search()).await;

    assert_eq!(control.source().calls(), 3);
    assert_eq!(failure_kind(&envelope), "TRANSIENT_FAILURE");
    // Failures are not cached.
    let _ = control.search_complaints(bronx_search()).await;
    assert_eq!(control.source().calls(), 6);
}

#[tokio::test]
async fn invalid_input_makes_no_request() {
    let control = control(|_, _, _| Ok(Vec::new()));
    let envelope = control
        .search_complaints(ComplaintSearchRequest {
            borough: Some("New Jersey".to_string()),
            days: Some(2.5),
            ..ComplaintSearchRequest::default()
        })
        .await;

    assert_eq!(failure_kind(&envelope), "INVALID_INPUT");
    let body = envelope.as_failure().expect("failure");
    assert_eq!(body.details["parameters"].as_array().map(Vec::len), Some(2));
    assert!(body.message.contains("STATEN ISLAND"));
    assert_eq!(control.source().calls(), 0);
}

#[tokio::test]
async fn hard_caps_are_checked_before_requests() {
    let control = control(|_, _, _| Ok(Vec::new()));
    let too_many_days = control
        .search_complaints(ComplaintSearchRequest {
            days: Some(400.0),
            ..ComplaintSearchRequest::default()
        })
        .await;
    let too_many_rows = control
        .search_complaints(ComplaintSearchRequest {
            limit: Some(10_000.0),
            ..ComplaintSearchRequest::default()
        })
        .await;

    assert_eq!(failure_kind(&too_many_days), "RATE_LIMIT_EXCEEDED");
    assert_eq!(failure_kind(&too_many_rows), "RATE_LIMIT_EXCEEDED");
    assert_eq!(control.source().calls(), 0);
}

#[tokio::test]
async fn paginates_up_to_the_requested_limit() {
    let source = ScriptedSource::new(|_, params, _| {
        let offset: usize = params["$offset"].parse().expect("offset");
        let limit: usize = params["$limit"].parse().expect("limit");
        Ok(rows(
            (offset..offset + limit)
                .map(|key| json!({ "unique_key": key.to_string(), "created_date": "2025-03-01T10:00:00.000" }))
                .collect(),
        ))
    });
    let control = OpenDataControl::new(source, fast_config().with_page_size(100));
    let envelope = control
        .search_complaints(ComplaintSearchRequest {
            limit: Some(250.0),
            ..ComplaintSearchRequest::default()
        })
        .await;

    let success = envelope.as_success().expect("success");
    assert_eq!(success.count, 250);
    assert_eq!(control.source().calls(), 3);
    let offsets: Vec<String> = control
        .source()
        .requests()
        .into_iter()
        .map(|(_, params)| params["$offset"].clone())
        .collect();
    assert_eq!(offsets, ["0", "100", "200"]);
}

#[tokio::test]
async fn street_closures_merge_purposes() {
    let control = control(|_, _, _| {
        Ok(rows(vec![
            json!({
                "segmentid": 1,
                "onstreetname": "BROADWAY",
                "borough_code": "M",
                "work_start_date": "2025-01-01T00:00:00.000",
                "work_end_date": "2025-01-10T00:00:00.000",
                "purpose": "Paving",
            }),
            json!({
                "segmentid": 1,
                "onstreetname": "BROADWAY",
                "borough_code": "M",
                "work_start_date": "2025-01-01T00:00:00.000",
                "work_end_date": "2025-01-10T00:00:00.000",
                "purpose": "Utility Work",
            }),
        ]))
    });
    let envelope = control
        .street_closures(StreetClosuresRequest {
            borough: Some("Manhattan".to_string()),
            ..StreetClosuresRequest::default()
        })
        .await;

    let success = envelope.as_success().expect("success");
    assert_eq!(success.count, 1);
    let record = &success.records[0];
    assert_eq!(record.details["purposes"], json!(["Paving", "Utility Work"]));
    assert_eq!(record.geo.borough, Some(Borough::Manhattan));
    assert_eq!(success.meta["activity"]["inactive"], 1);
    let requests = control.source().requests();
    assert!(requests[0].1["$where"].contains("borough_code = 'M'"));
}

#[tokio::test]
async fn trends_sum_event_counts() {
    let control = control(|_, params, _| {
        let select = params.get("$select").cloned().unwrap_or_default();
        if select.contains("as period") {
            Ok(rows(vec![
                json!({"period": "2025-03-01T00:00:00.000", "topic": "Noise", "count": "4"}),
                json!({"period": "2025-03-01T00:00:00.000", "topic": "Noise", "count": "2"}),
                json!({"period": "2025-03-02T00:00:00.000", "topic": "Heat", "count": "5"}),
            ]))
        } else {
            Ok(rows(vec![
                json!({"topic": "Noise", "count": "6"}),
                json!({"topic": "Heat", "count": "5"}),
            ]))
        }
    });
    let envelope = control
        .complaint_trends(ComplaintTrendsRequest {
            days: Some(30.0),
            ..ComplaintTrendsRequest::default()
        })
        .await;

    let success = envelope.as_success().expect("success");
    assert_eq!(success.event_type, "311_complaint_trend");
    assert_eq!(success.records.len(), 2);
    assert_eq!(success.count, 11);
    assert_eq!(success.meta["deduplication"]["duplicatesRemoved"], 1);
    assert_eq!(success.meta["topComplaintTypes"][0]["value"], "Noise");
    assert_eq!(success.meta["trend"]["status"], "available");
    assert_eq!(control.source().calls(), 2);
}

#[tokio::test]
async fn housing_severity_counts_only_deduplicated_violations() {
    let control = control(|_, _, _| {
        Ok(rows(vec![
            json!({
                "violationid": "9001",
                "inspectiondate": "2025-03-01T00:00:00.000",
                "class": "C",
                "boro": "BROOKLYN",
                "boroid": "3",
                "block": "2345",
                "lot": "12",
                "communityboard": "1",
                "violationstatus": "Open",
            }),
            json!({
                "violationid": "9001",
                "inspectiondate": "2025-03-01T00:00:00.000",
                "class": "A",
                "boro": "BROOKLYN",
                "boroid": "3",
                "block": "2345",
                "lot": "12",
                "communityboard": "1",
                "violationstatus": "Open",
            }),
            json!({
                "violationid": "9002",
                "inspectiondate": "2025-03-02T00:00:00.000",
                "class": "B",
                "boro": "BROOKLYN",
                "boroid": "3",
                "block": "100",
                "lot": "7",
                "violationstatus": "Close",
            }),
        ]))
    });
    let envelope = control
        .housing_violations(HousingViolationsRequest {
            borough: Some("Brooklyn".to_string()),
            status: Some("open".to_string()),
            ..HousingViolationsRequest::default()
        })
        .await;

    let success = envelope.as_success().expect("success");
    assert_eq!(success.count, 2);
    assert_eq!(success.meta["deduplication"]["duplicatesRemoved"], 1);
    let severity = &success.meta["severity"];
    assert_eq!(severity["total"], 2);
    assert_eq!(severity["counts"]["A"], 0);
    assert_eq!(severity["counts"]["B"], 1);
    assert_eq!(severity["counts"]["C"], 1);
    assert_eq!(severity["hazardIndex"], 2.5);

    let lots: Vec<Option<&str>> = success
        .records
        .iter()
        .map(|record| record.geo.bbl.as_deref())
        .collect();
    assert_eq!(lots, [Some("3023450012"), Some("3001000007")]);
    assert_eq!(success.records[0].geo.community_district.as_deref(), Some("301"));

    let requests = control.source().requests();
    assert_eq!(requests[0].0, "wvxf-dwi5");
    assert!(requests[0].1["$where"].contains("boro = 'BROOKLYN'"));
    assert!(requests[0].1["$where"].contains("violationstatus = 'OPEN'"));
}

#[tokio::test]
async fn permitted_events_filter_borough_and_merge_locations() {
    let control = control(|_, _, _| {
        Ok(rows(vec![
            json!({
                "event_id": "777",
                "event_name": "Bronx Week Parade",
                "start_date_time": "2025-05-18T12:00:00.000",
                "event_type": "Parade",
                "event_borough": "Bronx",
                "event_location": "GRAND CONCOURSE between EAST 161 STREET and EAST 167 STREET",
            }),
            json!({
                "event_id": "777",
                "event_name": "Bronx Week Parade",
                "start_date_time": "2025-05-18T12:00:00.000",
                "event_type": "Parade",
                "event_borough": "Bronx",
                "event_location": "EAST 167 STREET between GRAND CONCOURSE and GERARD AVENUE",
            }),
            json!({
                "event_id": "778",
                "start_date_time": "2025-05-19T09:00:00.000",
                "event_type": "Street Event",
                "event_borough": "Bronx",
                "event_location": "ARTHUR AVENUE",
            }),
        ]))
    });
    let envelope = control
        .permitted_events(PermittedEventsRequest {
            borough: Some("2".to_string()),
            ..PermittedEventsRequest::default()
        })
        .await;

    let success = envelope.as_success().expect("success");
    assert_eq!(success.count, 2);
    assert_eq!(success.meta["deduplication"]["duplicatesRemoved"], 1);
    let parade = &success.records[0];
    assert_eq!(
        parade.details["event_locations"],
        json!([
            "GRAND CONCOURSE between EAST 161 STREET and EAST 167 STREET",
            "EAST 167 STREET between GRAND CONCOURSE and GERARD AVENUE",
        ])
    );
    assert_eq!(parade.geo.borough, Some(Borough::Bronx));
    assert_eq!(success.records[1].details["event_locations"], json!(["ARTHUR AVENUE"]));

    let requests = control.source().requests();
    assert_eq!(requests[0].0, "tvpp-9vvx");
    assert!(requests[0].1["$where"].contains("upper(event_borough) = 'BRONX'"));
}

#[tokio::test]
async fn building_profile_requires_a_bbl() {
    let control = control(|_, _, _| Ok(Vec::new()));
    let envelope = control.building_profile(BuildingProfileRequest::default()).await;

    assert_eq!(failure_kind(&envelope), "INVALID_INPUT");
    let body = envelope.as_failure().expect("failure");
    assert!(body.message.contains("bbl"));
    assert_eq!(control.source().calls(), 0);
}

#[tokio::test]
async fn building_profile_validates_bbl() {
    let control = control(|_, _, _| {
        Ok(rows(vec![json!({
            "bbl": "1000010010.00000000",
            "borough": "MN",
            "cd": "101",
            "address": "1 BATTERY PARK",
            "assesstot": "1500000",
        })]))
    });

    let invalid = control
        .building_profile(BuildingProfileRequest {
            bbl: Some("9000010010".to_string()),
        })
        .await;
    assert_eq!(failure_kind(&invalid), "INVALID_INPUT");
    assert_eq!(control.source().calls(), 0);

    let envelope = control
        .building_profile(BuildingProfileRequest {
            bbl: Some("1000010010".to_string()),
        })
        .await;
    let success = envelope.as_success().expect("success");
    assert_eq!(success.count, 1);
    let record = &success.records[0];
    assert_eq!(record.geo.bbl.as_deref(), Some("1000010010"));
    assert_eq!(record.geo.community_district.as_deref(), Some("101"));
    assert_eq!(record.value, Some(1_500_000.0));
    assert!(success.window.is_none());
}

#[tokio::test]
async fn service_status_reports_cache_and_rate() {
    let control = control(|_, _, _| Ok(complaint_rows()));
    let _ = control.search_complaints(bronx_search()).await;
    let status = control.service_status().await;

    assert_eq!(status.cache_entries, 1);
    assert_eq!(status.rate.requests_in_window, 1);
    assert_eq!(status.caps.max_days, 365);
    assert_eq!(status.datasets.len(), 5);
}

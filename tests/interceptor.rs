use course_filter_lib::{
    config::EngineConfig,
    db::Database,
    filters::{FilterAxis, FilterValues, Polarity},
    interceptor::{EmitOutcome, PassthroughReason, RequestDetails},
    AppState,
};
use serde_json::{json, Value};
use tokio::{io::AsyncReadExt, sync::mpsc};

const CATALOG_URL: &str = "https://courses.aalto.fi/s/sfsites/aura?r=7&aura.ApexAction.execute=1";
const OTHER_URL: &str = "https://courses.aalto.fi/s/sfsites/l/%7B%22mode%22%3A%22PROD%22%7D/app.css";

fn state_with(config: EngineConfig) -> AppState {
    AppState::with_database(Database::open_in_memory().unwrap(), config)
}

fn state() -> AppState {
    state_with(EngineConfig {
        academic_year: Some(2024),
        ..EngineConfig::default()
    })
}

/// Pre-filled chunk stream with the sender already closed.
fn chunked(body: &[u8], size: usize) -> mpsc::Receiver<Vec<u8>> {
    let pieces: Vec<Vec<u8>> = body.chunks(size).map(<[u8]>::to_vec).collect();
    let (tx, rx) = mpsc::channel(pieces.len().max(1));
    for piece in pieces {
        tx.try_send(piece).unwrap();
    }
    rx
}

fn catalog_body() -> String {
    json!({
        "actions": [
            {
                "id": "812;a",
                "state": "SUCCESS",
                "returnValue": {
                    "returnValue": {
                        "courses": [
                            {
                                "Name": "Programming Parallel Computers – Åbo",
                                "hed__Course__r": { "CourseCode__c": "CS-E4580" },
                                "hed__Start_Date__c": "2024-09-02",
                                "hed__End_Date__c": "2024-10-18",
                                "credits": 5.0
                            },
                            {
                                "Name": "Matriisilaskenta",
                                "hed__Course__r": { "CourseCode__c": "MS-C1342" },
                                "hed__Start_Date__c": "2025-01-08",
                                "hed__End_Date__c": "2025-02-19",
                                "credits": 5.0
                            }
                        ],
                        "pageSize": 20
                    },
                    "cacheable": false
                }
            },
            { "id": "813;a", "state": "SUCCESS", "returnValue": null }
        ]
    })
    .to_string()
}

fn courses_of(body: &[u8]) -> Vec<Value> {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["actions"][0]["returnValue"]["returnValue"]["courses"]
        .as_array()
        .unwrap()
        .clone()
}

#[tokio::test]
async fn filters_body_split_inside_multibyte_characters() {
    let state = state();
    state
        .settings
        .set_filter_values(FilterAxis::Prefix, Polarity::Positive, &FilterValues::new(["CS"]))
        .await
        .unwrap();

    let body = catalog_body();
    let mut out = Vec::new();
    let report = state
        .interceptor
        .handle(
            RequestDetails::new("812", CATALOG_URL),
            chunked(body.as_bytes(), 1),
            &mut out,
        )
        .await
        .unwrap();

    assert_eq!(report.outcome, EmitOutcome::Filtered { kept: 1, total: 2 });
    assert_eq!(report.bytes_in, body.len());
    assert_eq!(report.bytes_out, out.len());

    let courses = courses_of(&out);
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["Name"], "Programming Parallel Computers – Åbo");
    assert!(String::from_utf8(out.clone()).unwrap().contains("\"credits\":5.0"));

    let envelope: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(envelope["actions"][0]["returnValue"]["returnValue"]["pageSize"], 20);
    assert_eq!(envelope["actions"][1]["id"], "813;a");

    assert!(state.settings.courses_loaded().await.unwrap());
    let periods = state.settings.course_periods().await.unwrap();
    assert_eq!(periods.get("CS-E4580").map(String::as_str), Some("I"));
    assert!(!periods.contains_key("MS-C1342"));
}

#[tokio::test]
async fn empty_selection_keeps_everything_and_records_labels() {
    let state = state();
    let body = catalog_body();
    let mut out = Vec::new();

    let report = state
        .interceptor
        .handle(
            RequestDetails::new("1", CATALOG_URL),
            chunked(body.as_bytes(), 64),
            &mut out,
        )
        .await
        .unwrap();

    assert_eq!(report.outcome, EmitOutcome::Filtered { kept: 2, total: 2 });
    assert_eq!(courses_of(&out), courses_of(body.as_bytes()));

    let periods = state.settings.course_periods().await.unwrap();
    assert_eq!(periods["MS-C1342"], "III");
}

#[tokio::test]
async fn period_field_writes_labels_into_courses() {
    let state = state_with(EngineConfig {
        academic_year: Some(2024),
        period_field: Some("period".into()),
        ..EngineConfig::default()
    });
    let mut out = Vec::new();
    state
        .interceptor
        .handle(
            RequestDetails::new("2", CATALOG_URL),
            chunked(catalog_body().as_bytes(), 100),
            &mut out,
        )
        .await
        .unwrap();

    let courses = courses_of(&out);
    assert_eq!(courses[0]["period"], "I");
    assert_eq!(courses[1]["period"], "III");
}

#[tokio::test]
async fn malformed_body_is_emitted_unchanged() {
    let state = state();
    let body = br#"{"actions":[{"returnValue":{"returnValue":{"courses":[{"#;
    let mut out = Vec::new();

    let report = state
        .interceptor
        .handle(RequestDetails::new("3", CATALOG_URL), chunked(body, 7), &mut out)
        .await
        .unwrap();

    assert_eq!(out, body);
    assert_eq!(
        report.outcome,
        EmitOutcome::PassedThrough {
            reason: PassthroughReason::MalformedEnvelope
        }
    );
    assert!(state.settings.courses_loaded().await.unwrap());
}

#[tokio::test]
async fn unreadable_filter_settings_emit_body_unchanged() {
    let db = Database::open_in_memory().unwrap();
    db.execute(|conn| {
        conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES ('prefixes', X'00', 'now')",
            [],
        )?;
        Ok(())
    })
    .await
    .unwrap();
    let state = AppState::with_database(
        db,
        EngineConfig {
            academic_year: Some(2024),
            ..EngineConfig::default()
        },
    );
    let body = catalog_body();
    let mut out = Vec::new();

    let report = state
        .interceptor
        .handle(RequestDetails::new("8", CATALOG_URL), chunked(body.as_bytes(), 64), &mut out)
        .await
        .unwrap();

    assert_eq!(out, body.as_bytes());
    assert_eq!(
        report.outcome,
        EmitOutcome::PassedThrough {
            reason: PassthroughReason::SettingsUnavailable
        }
    );
    assert!(state.settings.courses_loaded().await.unwrap());
}

#[tokio::test]
async fn invalid_utf8_is_emitted_byte_for_byte() {
    let state = state();
    let body = b"{\"actions\":[{\"returnValue\":{\"returnValue\":{\"courses\":[],\"x\":\"\xff\xfe\"}}}]}";
    let mut out = Vec::new();

    let report = state
        .interceptor
        .handle(RequestDetails::new("4", CATALOG_URL), chunked(body, 5), &mut out)
        .await
        .unwrap();

    assert_eq!(out, body);
    assert_eq!(
        report.outcome,
        EmitOutcome::PassedThrough {
            reason: PassthroughReason::DecodeError
        }
    );
}

#[tokio::test]
async fn envelope_without_courses_is_untouched() {
    let state = state();
    let body = br#"{"actions":[{"returnValue":{"returnValue":{"facets": {"b":1, "a":2}}}}]}"#;
    let mut out = Vec::new();

    let report = state
        .interceptor
        .handle(RequestDetails::new("5", CATALOG_URL), chunked(body, 9), &mut out)
        .await
        .unwrap();

    assert_eq!(out, body);
    assert_eq!(report.outcome, EmitOutcome::NoCourseData);
}

#[tokio::test]
async fn other_urls_are_piped_through() {
    let state = state();
    let body = b"body { color: red }";
    let mut out = Vec::new();

    let report = state
        .interceptor
        .handle(RequestDetails::new("6", OTHER_URL), chunked(body, 4), &mut out)
        .await
        .unwrap();

    assert_eq!(out, body);
    assert_eq!(report.outcome, EmitOutcome::NotIntercepted);
    assert!(!state.settings.courses_loaded().await.unwrap());
}

#[tokio::test]
async fn second_interception_of_same_request_passes_through() {
    let state = state();
    let (first_tx, first_rx) = mpsc::channel(4);

    let interceptor = state.interceptor.clone();
    let first = tokio::spawn(async move {
        let mut out = Vec::new();
        let report = interceptor
            .handle(RequestDetails::new("dup", CATALOG_URL), first_rx, &mut out)
            .await
            .unwrap();
        (report, out)
    });
    // Let the first pipeline claim the id and park on its chunk stream.
    tokio::task::yield_now().await;

    let mut second_out = Vec::new();
    let second = state
        .interceptor
        .handle(
            RequestDetails::new("dup", CATALOG_URL),
            chunked(b"raw", 2),
            &mut second_out,
        )
        .await
        .unwrap();
    assert_eq!(
        second.outcome,
        EmitOutcome::PassedThrough {
            reason: PassthroughReason::Duplicate
        }
    );
    assert_eq!(second_out, b"raw");

    first_tx.send(catalog_body().into_bytes()).await.unwrap();
    drop(first_tx);
    let (report, out) = first.await.unwrap();
    assert_eq!(report.outcome, EmitOutcome::Filtered { kept: 2, total: 2 });
    assert_eq!(courses_of(&out).len(), 2);
}

#[tokio::test]
async fn emission_closes_the_stream_after_one_body() {
    let state = state();
    let (mut page_side, mut filter_side) = tokio::io::duplex(64 * 1024);

    let body = catalog_body();
    let report = state
        .interceptor
        .handle(
            RequestDetails::new("7", CATALOG_URL),
            chunked(body.as_bytes(), 13),
            &mut filter_side,
        )
        .await
        .unwrap();

    let mut received = Vec::new();
    page_side.read_to_end(&mut received).await.unwrap();
    assert_eq!(received.len(), report.bytes_out);
    assert_eq!(courses_of(&received).len(), 2);
}

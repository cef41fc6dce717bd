// Integration tests for the live event view against a scripted backend
//
// These follow a multi-class endurance race through its weekend:
// 1. The event loads while the race is running
// 2. The race is picked and refreshed on every poll
// 3. Filtering by class switches the gap column to class intervals
// 4. The event finishing stops the refresh loop

use std::sync::Arc;
use std::time::Duration;

use pitwall::api::{Endpoint, MockApi};
use pitwall::live::{EventViewHandle, SelectionFallback, ViewOptions};
use pitwall::model::{EventDetail, LifecycleStatus, ResultRow};

const SLUG: &str = "6-hours-of-spa-2025";

fn spa(event_status: &str, race_status: &str, with_warmup: bool) -> EventDetail {
    let warmup = if with_warmup {
        r#"{"id": 13, "type": "warmup", "name": "Warm Up", "startTime": "2025-05-10T09:00:00Z", "status": "completed"},"#
    } else {
        ""
    };
    let json = format!(
        r##"{{
            "id": 21,
            "name": "6 Hours of Spa-Francorchamps",
            "slug": "{SLUG}",
            "series": {{"id": 2, "name": "WEC", "slug": "wec", "colorPrimary": "#00548F"}},
            "circuit": {{"id": 8, "name": "Spa-Francorchamps", "country": "Belgium", "city": "Stavelot"}},
            "startDate": "2025-05-08",
            "endDate": "2025-05-10",
            "status": "{event_status}",
            "sessions": [
                {{"id": 11, "type": "practice", "name": "FP1", "startTime": "2025-05-08T10:00:00Z", "status": "completed"}},
                {{"id": 12, "type": "qualifying", "name": "Hyperpole", "startTime": "2025-05-09T15:00:00Z", "status": "completed"}},
                {warmup}
                {{"id": 14, "type": "race", "name": "Race", "startTime": "2025-05-10T11:00:00Z", "status": "{race_status}"}}
            ]
        }}"##
    );
    serde_json::from_str(&json).unwrap()
}

fn row(position: u32, car: u32, class_name: &str, time: &str, laps: u32, gap: &str) -> ResultRow {
    serde_json::from_value(serde_json::json!({
        "id": car,
        "position": position,
        "driverName": format!("Car {}", car),
        "driverNumber": car,
        "teamName": "Team",
        "className": class_name,
        "time": time,
        "laps": laps,
        "gap": gap,
        "status": "Running"
    }))
    .unwrap()
}

fn gt3_rows() -> Vec<ResultRow> {
    vec![
        row(14, 92, "LMGT3", "2:10:04.118", 70, "+4 Laps"),
        row(15, 46, "LMGT3", "2:10:09.540", 70, "+4 Laps"),
        row(16, 81, "LMGT3", "2:10:30.002", 69, "+5 Laps"),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_multi_class_race_weekend() {
    let api = Arc::new(MockApi::new());
    api.push_event(Some(spa("live", "live", false)));
    api.set_result_classes(14, vec!["Hypercar".to_string(), "LMGT3".to_string()]);
    api.set_results(14, None, vec![row(1, 6, "Hypercar", "2:09:58.001", 74, "")]);
    api.set_results(14, Some("LMGT3"), gt3_rows());

    let mut handle = EventViewHandle::spawn(api.clone(), SLUG, ViewOptions::default());
    let view = handle
        .wait_for(|v| v.event.is_some() && !v.is_loading())
        .await
        .unwrap();
    assert_eq!(view.selected_session.as_ref().map(|s| s.id), Some(14));
    assert!(view.polling);
    // without a class filter the backend gap is shown as is
    assert_eq!(view.gaps(), vec![Some(String::new())]);

    handle.select_class(Some("LMGT3".to_string())).unwrap();
    let view = handle
        .wait_for(|v| v.results.len() == 3 && !v.is_loading())
        .await
        .unwrap();
    assert_eq!(
        view.gaps(),
        vec![
            Some(String::new()),
            Some("+5.422".to_string()),
            Some("+1L".to_string()),
        ]
    );

    // the race ends, the next poll picks it up and the loop stops
    api.push_event(Some(spa("completed", "completed", false)));
    let view = handle.wait_for(|v| !v.polling).await.unwrap();
    assert_eq!(
        view.selected_session.map(|s| s.status),
        Some(LifecycleStatus::Completed)
    );
    assert_eq!(view.selected_class.as_deref(), Some("LMGT3"));

    // the finished race is fetched once more, then nothing until the view goes away
    let view = handle.wait_for(|v| !v.is_loading()).await.unwrap();
    assert_eq!(view.results.len(), 3);
    let calls = api.total_calls();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.total_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_session_removed_during_event() {
    let api = Arc::new(MockApi::new());
    api.push_event(Some(spa("live", "completed", true)));
    api.push_event(Some(spa("live", "completed", false)));

    let options = ViewOptions {
        fallback: SelectionFallback::KeepStale,
        ..Default::default()
    };
    let mut handle = EventViewHandle::spawn(api.clone(), SLUG, options);
    handle
        .wait_for(|v| v.event.is_some() && !v.is_loading())
        .await
        .unwrap();
    handle.select_session(13).unwrap();
    handle
        .wait_for(|v| v.selected_session.as_ref().is_some_and(|s| s.id == 13))
        .await
        .unwrap();

    // warm up disappears from the schedule at the next refresh
    tokio::time::sleep(Duration::from_millis(5500)).await;
    let view = handle.current();
    assert!(view.event.unwrap().session(13).is_none());
    assert_eq!(view.selected_session.map(|s| s.id), Some(13));
}

#[tokio::test(start_paused = true)]
async fn test_session_removed_with_reselect() {
    let api = Arc::new(MockApi::new());
    api.push_event(Some(spa("live", "completed", true)));
    api.push_event(Some(spa("live", "completed", false)));

    let options = ViewOptions {
        fallback: SelectionFallback::Reselect,
        ..Default::default()
    };
    let mut handle = EventViewHandle::spawn(api.clone(), SLUG, options);
    handle
        .wait_for(|v| v.event.is_some() && !v.is_loading())
        .await
        .unwrap();
    handle.select_session(13).unwrap();
    handle
        .wait_for(|v| v.selected_session.as_ref().is_some_and(|s| s.id == 13))
        .await
        .unwrap();

    let view = handle
        .wait_for(|v| v.selected_session.as_ref().is_some_and(|s| s.id == 14))
        .await
        .unwrap();
    assert!(view.event.unwrap().session(13).is_none());
    handle.wait_for(|v| !v.is_loading()).await.unwrap();
    assert_eq!(api.result_requests().last(), Some(&(14, None)));
}

#[tokio::test(start_paused = true)]
async fn test_backend_outage_during_live_event() {
    let api = Arc::new(MockApi::new());
    api.push_event(Some(spa("live", "live", false)));
    api.set_results(14, None, vec![row(1, 6, "Hypercar", "2:09:58.001", 74, "")]);

    let mut handle = EventViewHandle::spawn(api.clone(), SLUG, ViewOptions::default());
    handle
        .wait_for(|v| v.results.len() == 1 && !v.is_loading())
        .await
        .unwrap();

    api.fail(Endpoint::Event);
    tokio::time::sleep(Duration::from_secs(16)).await;
    let view = handle.current();
    assert!(view.polling);
    assert!(view.last_refresh_error.is_some());
    assert_eq!(view.results.len(), 1);
    assert_eq!(api.calls(Endpoint::Event), 4);

    api.recover(Endpoint::Event);
    let view = handle
        .wait_for(|v| v.last_refresh_error.is_none())
        .await
        .unwrap();
    assert!(view.event.is_some());
}

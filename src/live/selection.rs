use log::debug;

use crate::model::{EventDetail, LifecycleStatus, Session, SessionType};

/// Session types worth showing by default, most relevant first
const SESSION_PRIORITY: [SessionType; 3] =
    [SessionType::Race, SessionType::Sprint, SessionType::Qualifying];

/// What a poll does when the selected session disappears from the refreshed event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionFallback {
    /// Leave the selection pointing at the vanished session.
    #[default]
    KeepStale,
    /// Pick a new default session from the refreshed event.
    Reselect,
}

fn pick_by_priority<'a>(candidates: &[&'a Session]) -> Option<&'a Session> {
    SESSION_PRIORITY.iter().find_map(|session_type| {
        candidates
            .iter()
            .copied()
            .find(|s| s.session_type == *session_type)
    })
}

/// Pick the session whose results are shown when the user has not chosen one.
///
/// Practice sessions are never picked. While the event is live the highest priority
/// session wins regardless of its own status; otherwise completed sessions are preferred,
/// degrading to the whole non-practice schedule when nothing has completed yet. The
/// result is `None` only when every session is a practice session.
pub fn pick_default_session<'a>(
    event_status: &LifecycleStatus,
    sessions: &'a [Session],
) -> Option<&'a Session> {
    let non_practice: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.session_type != SessionType::Practice)
        .collect();
    let first = *non_practice.first()?;

    if event_status.is_live() {
        return Some(pick_by_priority(&non_practice).unwrap_or(first));
    }

    let completed: Vec<&Session> = non_practice
        .iter()
        .copied()
        .filter(|s| s.status.is_completed())
        .collect();

    pick_by_priority(&completed)
        .or_else(|| completed.first().copied())
        .or_else(|| pick_by_priority(&non_practice))
        .or(Some(first))
}

/// Outcome of matching the selection against a freshly polled event.
#[derive(Clone, Debug, PartialEq)]
pub enum Reconciliation {
    /// Same session, nothing the user sees changed.
    Unchanged,
    /// Same session identity with new field values.
    Updated(Session),
    /// The session is no longer part of the event.
    Missing,
}

/// Match `selected` by id against the sessions of `latest`.
pub fn reconcile_selection(selected: &Session, latest: &EventDetail) -> Reconciliation {
    match latest.session(selected.id) {
        Some(fresh) if fresh.differs_from(selected) => {
            debug!(
                "Selected session {} changed: {} -> {}",
                selected.id, selected.status, fresh.status
            );
            Reconciliation::Updated(fresh.clone())
        }
        Some(_) => Reconciliation::Unchanged,
        None => Reconciliation::Missing,
    }
}

/// Apply a reconciliation to the held selection, returning true when it changed.
///
/// With `KeepStale` a missing session leaves the selection untouched. With `Reselect` the
/// default session of `latest` replaces it.
pub fn apply_reconciliation(
    selected: &mut Option<Session>,
    latest: &EventDetail,
    fallback: SelectionFallback,
) -> bool {
    let Some(current) = selected.as_ref() else {
        return false;
    };
    match reconcile_selection(current, latest) {
        Reconciliation::Unchanged => false,
        Reconciliation::Updated(fresh) => {
            *selected = Some(fresh);
            true
        }
        Reconciliation::Missing => match fallback {
            SelectionFallback::KeepStale => {
                debug!(
                    "Selected session {} is gone from the event, keeping it",
                    current.id
                );
                false
            }
            SelectionFallback::Reselect => {
                *selected = pick_default_session(&latest.status, &latest.sessions).cloned();
                true
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    use crate::model::{Circuit, Series};

    fn session(id: i64, session_type: SessionType, status: LifecycleStatus) -> Session {
        Session {
            id,
            name: format!("{} {}", session_type.as_str(), id),
            session_type,
            start_time: Utc.with_ymd_and_hms(2025, 6, 14, 14, 0, 0).unwrap(),
            end_time: None,
            status,
        }
    }

    fn event(status: LifecycleStatus, sessions: Vec<Session>) -> EventDetail {
        EventDetail {
            id: 1,
            name: "24 Hours of Le Mans".to_string(),
            slug: "le-mans-2025".to_string(),
            series: Series {
                id: 2,
                name: "WEC".to_string(),
                slug: "wec".to_string(),
                color_primary: None,
                color_secondary: None,
                logo_url: None,
            },
            circuit: Circuit {
                id: 4,
                name: "Circuit de la Sarthe".to_string(),
                country: "France".to_string(),
                city: "Le Mans".to_string(),
                track_map_url: None,
                timezone: None,
            },
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            status,
            sessions,
        }
    }

    use LifecycleStatus::{Completed, Live, Upcoming};

    #[test]
    fn test_no_sessions_or_only_practice() {
        assert_eq!(pick_default_session(&Live, &[]), None);
        let practice = vec![
            session(1, SessionType::Practice, Completed),
            session(2, SessionType::Practice, Live),
        ];
        assert_eq!(pick_default_session(&Live, &practice), None);
        assert_eq!(pick_default_session(&Completed, &practice), None);
    }

    #[test]
    fn test_live_event_prefers_race() {
        let sessions = vec![
            session(1, SessionType::Qualifying, Completed),
            session(2, SessionType::Sprint, Completed),
            session(3, SessionType::Race, Upcoming),
        ];
        assert_eq!(pick_default_session(&Live, &sessions).map(|s| s.id), Some(3));
    }

    #[test]
    fn test_live_event_without_priority_types_takes_first() {
        let sessions = vec![
            session(1, SessionType::Practice, Completed),
            session(2, SessionType::Warmup, Live),
            session(3, SessionType::Other("hyperpole".to_string()), Upcoming),
        ];
        assert_eq!(pick_default_session(&Live, &sessions).map(|s| s.id), Some(2));
    }

    #[test]
    fn test_completed_event_prefers_completed_priority_session() {
        let sessions = vec![
            session(1, SessionType::Qualifying, Completed),
            session(2, SessionType::Sprint, Completed),
            session(3, SessionType::Race, Upcoming),
        ];
        assert_eq!(
            pick_default_session(&Completed, &sessions).map(|s| s.id),
            Some(2)
        );
    }

    #[test]
    fn test_completed_without_priority_type_takes_first_completed() {
        let sessions = vec![
            session(1, SessionType::Warmup, Upcoming),
            session(2, SessionType::Warmup, Completed),
            session(3, SessionType::Race, Upcoming),
        ];
        assert_eq!(
            pick_default_session(&Completed, &sessions).map(|s| s.id),
            Some(2)
        );
    }

    #[test]
    fn test_nothing_completed_falls_back_to_whole_schedule() {
        let sessions = vec![
            session(1, SessionType::Practice, Upcoming),
            session(2, SessionType::Qualifying, Upcoming),
            session(3, SessionType::Race, Upcoming),
        ];
        assert_eq!(
            pick_default_session(&Upcoming, &sessions).map(|s| s.id),
            Some(3)
        );

        let sessions = vec![
            session(1, SessionType::Warmup, Upcoming),
            session(2, SessionType::Other("test".to_string()), Upcoming),
        ];
        assert_eq!(
            pick_default_session(&Upcoming, &sessions).map(|s| s.id),
            Some(1)
        );
    }

    #[test]
    fn test_reconcile_status_change_keeps_identity() {
        let selected = session(5, SessionType::Race, Live);
        let mut fresh = selected.clone();
        fresh.status = Completed;
        let latest = event(Live, vec![session(4, SessionType::Qualifying, Completed), fresh]);

        let mut selection = Some(selected);
        assert!(apply_reconciliation(
            &mut selection,
            &latest,
            SelectionFallback::KeepStale
        ));
        let selection = selection.unwrap();
        assert_eq!(selection.id, 5);
        assert_eq!(selection.status, Completed);
    }

    #[test]
    fn test_reconcile_detects_each_displayed_field() {
        let selected = session(5, SessionType::Race, Live);

        let mut renamed = selected.clone();
        renamed.name = "Race (restarted)".to_string();
        let mut moved = selected.clone();
        moved.start_time = Utc.with_ymd_and_hms(2025, 6, 14, 16, 0, 0).unwrap();
        let mut ended = selected.clone();
        ended.end_time = Some(Utc.with_ymd_and_hms(2025, 6, 15, 16, 0, 0).unwrap());

        for fresh in [renamed, moved, ended] {
            let latest = event(Live, vec![fresh.clone()]);
            assert_eq!(
                reconcile_selection(&selected, &latest),
                Reconciliation::Updated(fresh)
            );
        }

        let latest = event(Live, vec![selected.clone()]);
        assert_eq!(
            reconcile_selection(&selected, &latest),
            Reconciliation::Unchanged
        );
    }

    #[test]
    fn test_reconcile_does_not_rerun_default_selection() {
        // the user looks at qualifying while the race is live
        let selected = session(4, SessionType::Qualifying, Completed);
        let latest = event(
            Live,
            vec![selected.clone(), session(5, SessionType::Race, Live)],
        );
        let mut selection = Some(selected.clone());
        assert!(!apply_reconciliation(
            &mut selection,
            &latest,
            SelectionFallback::KeepStale
        ));
        assert_eq!(selection, Some(selected));
    }

    #[test]
    fn test_missing_session_policies() {
        let selected = session(9, SessionType::Sprint, Live);
        let latest = event(Live, vec![session(5, SessionType::Race, Live)]);
        assert_eq!(
            reconcile_selection(&selected, &latest),
            Reconciliation::Missing
        );

        let mut stale = Some(selected.clone());
        assert!(!apply_reconciliation(
            &mut stale,
            &latest,
            SelectionFallback::KeepStale
        ));
        assert_eq!(stale.map(|s| s.id), Some(9));

        let mut reselected = Some(selected);
        assert!(apply_reconciliation(
            &mut reselected,
            &latest,
            SelectionFallback::Reselect
        ));
        assert_eq!(reselected.map(|s| s.id), Some(5));
    }

    #[test]
    fn test_no_selection_is_left_alone() {
        let latest = event(Live, vec![session(5, SessionType::Race, Live)]);
        let mut selection = None;
        assert!(!apply_reconciliation(
            &mut selection,
            &latest,
            SelectionFallback::Reselect
        ));
        assert_eq!(selection, None);
    }

    fn arb_session_type() -> impl Strategy<Value = SessionType> {
        prop_oneof![
            Just(SessionType::Practice),
            Just(SessionType::Qualifying),
            Just(SessionType::Sprint),
            Just(SessionType::Race),
            Just(SessionType::Warmup),
        ]
    }

    fn arb_status() -> impl Strategy<Value = LifecycleStatus> {
        prop_oneof![Just(Upcoming), Just(Live), Just(Completed)]
    }

    fn arb_sessions() -> impl Strategy<Value = Vec<Session>> {
        prop::collection::vec((arb_session_type(), arb_status()), 0..8).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (t, s))| session(i as i64 + 1, t, s))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // A default exists exactly when some session is not practice
        #[test]
        fn prop_none_iff_only_practice(status in arb_status(), sessions in arb_sessions()) {
            let only_practice = sessions.iter().all(|s| s.session_type == SessionType::Practice);
            let picked = pick_default_session(&status, &sessions);
            prop_assert_eq!(picked.is_none(), only_practice);
            if let Some(picked) = picked {
                prop_assert_ne!(&picked.session_type, &SessionType::Practice);
            }
        }

        // While live, an existing race is always the default
        #[test]
        fn prop_live_event_picks_race(sessions in arb_sessions()) {
            let first_race = sessions.iter().find(|s| s.session_type == SessionType::Race);
            let picked = pick_default_session(&Live, &sessions);
            if let Some(race) = first_race {
                prop_assert_eq!(picked.map(|s| s.id), Some(race.id));
            }
        }

        // Without completed sessions the choice only depends on the session types
        #[test]
        fn prop_upcoming_event_without_completed(sessions in arb_sessions()) {
            let sessions: Vec<Session> = sessions
                .into_iter()
                .map(|mut s| { s.status = Upcoming; s })
                .collect();
            let non_practice: Vec<&Session> = sessions
                .iter()
                .filter(|s| s.session_type != SessionType::Practice)
                .collect();
            let expected = pick_by_priority(&non_practice).or(non_practice.first().copied());
            prop_assert_eq!(
                pick_default_session(&Upcoming, &sessions).map(|s| s.id),
                expected.map(|s| s.id)
            );
        }
    }
}

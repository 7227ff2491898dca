use chrono::NaiveDate;
use parlor_core::model::{Appointment, AppointmentStatus, User};
use parlor_core::schedule::{self, DateOrder, StatusFilter};
use parlor_core::session::{Session, SessionStore, Theme};
use parlor_core::slots::{self, BookingWindow};
use tempfile::tempdir;

fn appointment(id: &str, date: NaiveDate, time: Option<&str>, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: id.to_string(),
        user_id: "u1".to_string(),
        service_id: "svc-1".to_string(),
        service_name: "Haircut".to_string(),
        service_price: 25.0,
        service_duration: 30,
        date,
        time: time.map(str::to_string),
        status,
        notes: None,
        created_at: None,
    }
}

#[test]
fn session_roundtrip_and_agenda_pipeline() {
    let temp = tempdir().expect("tempdir");
    let store = SessionStore::open(temp.path()).expect("open session store");

    store
        .save(&Session {
            token: Some("tok-abc".to_string()),
            user: Some(User {
                id: "u1".to_string(),
                name: "Dana".to_string(),
                email: "dana@example.com".to_string(),
            }),
            theme: Theme::Dark,
        })
        .expect("save session");

    let session = store.load().expect("load session");
    assert!(session.is_logged_in());
    assert_eq!(session.theme, Theme::Dark);

    let today = NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date");
    let tomorrow = NaiveDate::from_ymd_opt(2024, 6, 11).expect("valid date");
    let yesterday = NaiveDate::from_ymd_opt(2024, 6, 9).expect("valid date");
    let noon = today.and_hms_opt(12, 0, 0).expect("valid time");

    let appointments = vec![
        appointment("done", yesterday, Some("10:00"), AppointmentStatus::Completed),
        appointment("tonight", today, None, AppointmentStatus::Confirmed),
        appointment("ditched", tomorrow, Some("09:00"), AppointmentStatus::Cancelled),
        appointment("next", tomorrow, Some("09:00"), AppointmentStatus::Pending),
    ];

    let agenda = schedule::partition(appointments, noon);
    assert_eq!(agenda.upcoming.len(), 2);
    assert_eq!(agenda.past.len(), 2);
    assert!(agenda.past.iter().any(|a| a.id == "ditched"));

    let confirmed =
        schedule::filter_by_status(&agenda.upcoming, StatusFilter::Only(AppointmentStatus::Confirmed));
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id, "tonight");

    // "tonight" occupies end of day on the 10th, which is still sooner
    // than tomorrow's 09:00.
    let soonest_first = schedule::sort_by_instant(&agenda.upcoming, DateOrder::Closest);
    assert_eq!(soonest_first[0].id, "tonight");
    assert_eq!(soonest_first[1].id, "next");

    // Slot generation for the service being rebooked.
    let generated = slots::generate(&BookingWindow::default(), 30);
    assert!(generated.iter().all(|s| s.available));
    assert_eq!(generated.first().map(|s| s.time.as_str()), Some("09:00"));
}

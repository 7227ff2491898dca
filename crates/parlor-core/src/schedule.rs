use chrono::{NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::datetime::parse_clock_time;
use crate::model::{Appointment, AppointmentStatus};

/// A user's appointments split relative to the current instant.
#[derive(Debug, Clone, Default)]
pub struct Agenda {
    pub upcoming: Vec<Appointment>,
    pub past: Vec<Appointment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(AppointmentStatus),
}

impl std::str::FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            Ok(StatusFilter::Only(s.parse()?))
        }
    }
}

/// `Closest` sorts soonest-first (ascending instant), `Farthest` the
/// reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    Closest,
    Farthest,
}

impl std::str::FromStr for DateOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closest" => Ok(DateOrder::Closest),
            "farthest" => Ok(DateOrder::Farthest),
            other => Err(anyhow::anyhow!(
                "unknown date order: {other} (expected closest or farthest)"
            )),
        }
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

/// The instant an appointment occupies for scheduling comparisons: its
/// date plus its time-of-day, or end of day when no time is set. An
/// unparseable time-of-day also falls back to end of day rather than
/// failing the render.
pub fn appointment_instant(appointment: &Appointment) -> NaiveDateTime {
    let time = appointment
        .time
        .as_deref()
        .and_then(parse_clock_time)
        .and_then(|(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0))
        .unwrap_or_else(end_of_day);

    appointment.date.and_time(time)
}

/// Split into upcoming and past. A cancelled appointment is always past,
/// even when its instant is ahead of `now`; every appointment lands in
/// exactly one bucket.
pub fn partition(appointments: Vec<Appointment>, now: NaiveDateTime) -> Agenda {
    let mut agenda = Agenda::default();

    for appointment in appointments {
        let cancelled = appointment.status == AppointmentStatus::Cancelled;
        if !cancelled && appointment_instant(&appointment) >= now {
            agenda.upcoming.push(appointment);
        } else {
            agenda.past.push(appointment);
        }
    }

    debug!(
        upcoming = agenda.upcoming.len(),
        past = agenda.past.len(),
        "partitioned appointments"
    );
    agenda
}

/// Keep the appointments matching `filter`; `All` keeps everything. The
/// input is left untouched.
pub fn filter_by_status(appointments: &[Appointment], filter: StatusFilter) -> Vec<Appointment> {
    appointments
        .iter()
        .filter(|appointment| match filter {
            StatusFilter::All => true,
            StatusFilter::Only(status) => appointment.status == status,
        })
        .cloned()
        .collect()
}

/// Order by the same instant reconstruction used for partitioning. The
/// sort is stable in both directions: appointments on the same instant
/// keep their original relative order.
pub fn sort_by_instant(appointments: &[Appointment], order: DateOrder) -> Vec<Appointment> {
    let mut sorted = appointments.to_vec();
    sorted.sort_by(|a, b| {
        let (ia, ib) = (appointment_instant(a), appointment_instant(b));
        match order {
            DateOrder::Closest => ia.cmp(&ib),
            DateOrder::Farthest => ib.cmp(&ia),
        }
    });
    sorted
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{DateOrder, StatusFilter, filter_by_status, partition, sort_by_instant};
    use crate::model::{Appointment, AppointmentStatus};

    fn appointment(id: &str, date: (i32, u32, u32), time: Option<&str>) -> Appointment {
        Appointment {
            id: id.to_string(),
            user_id: "u1".to_string(),
            service_id: "svc".to_string(),
            service_name: "Haircut".to_string(),
            service_price: 25.0,
            service_duration: 30,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid date"),
            time: time.map(str::to_string),
            status: AppointmentStatus::Confirmed,
            notes: None,
            created_at: None,
        }
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .expect("valid date")
            .and_hms_opt(12, 0, 0)
            .expect("valid time")
    }

    #[test]
    fn timeless_appointment_counts_until_end_of_day() {
        let agenda = partition(vec![appointment("a", (2024, 6, 10), None)], noon());
        assert_eq!(agenda.upcoming.len(), 1);
        assert!(agenda.past.is_empty());
    }

    #[test]
    fn cancelled_is_always_past() {
        let mut future = appointment("a", (2024, 6, 10), None);
        future.status = AppointmentStatus::Cancelled;

        let agenda = partition(vec![future], noon());
        assert!(agenda.upcoming.is_empty());
        assert_eq!(agenda.past.len(), 1);
    }

    #[test]
    fn morning_appointment_is_past_by_noon() {
        let agenda = partition(vec![appointment("a", (2024, 6, 10), Some("09:00"))], noon());
        assert!(agenda.upcoming.is_empty());
        assert_eq!(agenda.past.len(), 1);
    }

    #[test]
    fn unparseable_time_falls_back_to_end_of_day() {
        let agenda = partition(
            vec![appointment("a", (2024, 6, 10), Some("not-a-time"))],
            noon(),
        );
        assert_eq!(agenda.upcoming.len(), 1);
    }

    #[test]
    fn every_appointment_lands_in_exactly_one_bucket() {
        let input = vec![
            appointment("a", (2024, 6, 9), Some("10:00")),
            appointment("b", (2024, 6, 10), Some("15:00")),
            appointment("c", (2024, 6, 11), None),
        ];
        let agenda = partition(input, noon());
        assert_eq!(agenda.upcoming.len() + agenda.past.len(), 3);
    }

    #[test]
    fn sort_directions() {
        let a = appointment("a", (2024, 6, 10), Some("09:00"));
        let b = appointment("b", (2024, 6, 10), Some("11:00"));
        let c = appointment("c", (2024, 6, 11), Some("09:00"));
        let input = vec![b.clone(), c.clone(), a.clone()];

        let closest = sort_by_instant(&input, DateOrder::Closest);
        assert_eq!(
            closest.iter().map(|x| x.id.as_str()).collect::<Vec<_>>(),
            ["a", "b", "c"]
        );

        let farthest = sort_by_instant(&input, DateOrder::Farthest);
        assert_eq!(
            farthest.iter().map(|x| x.id.as_str()).collect::<Vec<_>>(),
            ["c", "b", "a"]
        );

        // Input untouched.
        assert_eq!(
            input.iter().map(|x| x.id.as_str()).collect::<Vec<_>>(),
            ["b", "c", "a"]
        );
    }

    #[test]
    fn ties_keep_original_relative_order() {
        let first = appointment("first", (2024, 6, 10), Some("10:00"));
        let second = appointment("second", (2024, 6, 10), Some("10:00"));
        let input = vec![first, second];

        for order in [DateOrder::Closest, DateOrder::Farthest] {
            let sorted = sort_by_instant(&input, order);
            assert_eq!(
                sorted.iter().map(|x| x.id.as_str()).collect::<Vec<_>>(),
                ["first", "second"],
                "{order:?}"
            );
        }
    }

    #[test]
    fn status_filter_all_keeps_everything() {
        let mut b = appointment("b", (2024, 6, 10), None);
        b.status = AppointmentStatus::Pending;
        let input = vec![appointment("a", (2024, 6, 10), None), b];

        assert_eq!(filter_by_status(&input, StatusFilter::All).len(), 2);
        let confirmed =
            filter_by_status(&input, StatusFilter::Only(AppointmentStatus::Confirmed));
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, "a");
    }

    #[test]
    fn status_filter_parses() {
        assert_eq!(
            "all".parse::<StatusFilter>().expect("all"),
            StatusFilter::All
        );
        assert_eq!(
            "confirmed".parse::<StatusFilter>().expect("confirmed"),
            StatusFilter::Only(AppointmentStatus::Confirmed)
        );
        assert!("unknown".parse::<StatusFilter>().is_err());
    }
}

use chrono::{Duration, NaiveTime, Timelike};
use tracing::debug;

use crate::model::{Period, TimeSlot};

/// The salon's working window for one day. Slot starts land inside
/// `[open, close)`; a slot whose start falls inside the optional break is
/// skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub lunch_break: Option<(NaiveTime, NaiveTime)>,
}

impl Default for BookingWindow {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            lunch_break: None,
        }
    }
}

impl BookingWindow {
    pub fn new(
        open: NaiveTime,
        close: NaiveTime,
        lunch_break: Option<(NaiveTime, NaiveTime)>,
    ) -> anyhow::Result<Self> {
        if open >= close {
            return Err(anyhow::anyhow!(
                "booking window must open before it closes: {open} >= {close}"
            ));
        }
        if let Some((start, end)) = lunch_break
            && start >= end
        {
            return Err(anyhow::anyhow!(
                "booking break must start before it ends: {start} >= {end}"
            ));
        }
        Ok(Self {
            open,
            close,
            lunch_break,
        })
    }

    fn in_break(&self, time: NaiveTime) -> bool {
        self.lunch_break
            .map(|(start, end)| time >= start && time < end)
            .unwrap_or(false)
    }
}

/// Step between consecutive slots, tiered by service length. Anything at
/// or under half an hour (including a degenerate zero) books on the
/// half-hour; hour-plus services book on the hour.
pub fn step_minutes(duration_minutes: u32) -> u32 {
    if duration_minutes >= 60 {
        60
    } else if duration_minutes <= 30 {
        30
    } else {
        45
    }
}

/// Generate the candidate slots for one service on one day. Pure and
/// deterministic: every slot starts available, annotation happens later.
pub fn generate(window: &BookingWindow, duration_minutes: u32) -> Vec<TimeSlot> {
    let step = Duration::minutes(i64::from(step_minutes(duration_minutes)));
    let mut slots = Vec::new();
    let mut time = window.open;

    while time < window.close {
        if !window.in_break(time) {
            slots.push(TimeSlot {
                time: time.format("%H:%M").to_string(),
                period: Period::for_hour(time.hour()),
                available: true,
            });
        }

        // NaiveTime arithmetic wraps at midnight; a wrap means we ran off
        // the end of the day.
        let (next, wrapped) = time.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        time = next;
    }

    debug!(
        count = slots.len(),
        duration = duration_minutes,
        "generated candidate slots"
    );
    slots
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::{BookingWindow, generate, step_minutes};
    use crate::model::Period;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn minutes_of(time: &str) -> i32 {
        let (h, m) = time.split_once(':').expect("HH:MM");
        h.parse::<i32>().expect("hour") * 60 + m.parse::<i32>().expect("minute")
    }

    #[test]
    fn step_tiers() {
        assert_eq!(step_minutes(90), 60);
        assert_eq!(step_minutes(60), 60);
        assert_eq!(step_minutes(45), 45);
        assert_eq!(step_minutes(31), 45);
        assert_eq!(step_minutes(30), 30);
        assert_eq!(step_minutes(20), 30);
        assert_eq!(step_minutes(0), 30);
    }

    #[test]
    fn consecutive_slots_differ_by_step() {
        let window = BookingWindow::default();
        for (duration, expected_gap) in [(90_u32, 60), (20, 30), (45, 45)] {
            let slots = generate(&window, duration);
            assert!(slots.len() > 1);
            for pair in slots.windows(2) {
                assert_eq!(
                    minutes_of(&pair[1].time) - minutes_of(&pair[0].time),
                    expected_gap,
                    "duration {duration}"
                );
            }
        }
    }

    #[test]
    fn slots_stay_inside_window() {
        let window = BookingWindow::new(t(8, 0), t(20, 0), None).expect("window");
        let slots = generate(&window, 45);
        assert!(!slots.is_empty());
        for slot in &slots {
            assert!(minutes_of(&slot.time) >= 8 * 60);
            assert!(minutes_of(&slot.time) < 20 * 60, "slot {}", slot.time);
        }
    }

    #[test]
    fn break_excludes_slot_starts() {
        let window =
            BookingWindow::new(t(8, 0), t(20, 0), Some((t(11, 30), t(14, 0)))).expect("window");
        let slots = generate(&window, 20);
        assert!(slots.iter().any(|s| s.time == "11:00"));
        assert!(slots.iter().all(|s| {
            let m = minutes_of(&s.time);
            m < 11 * 60 + 30 || m >= 14 * 60
        }));
        assert!(slots.iter().any(|s| s.time == "14:00"));
    }

    #[test]
    fn zero_duration_terminates_and_uses_half_hour_steps() {
        let window = BookingWindow::default();
        let slots = generate(&window, 0);
        assert_eq!(slots.len(), 16); // 09:00..16:30 on the half hour
        assert_eq!(slots[0].time, "09:00");
        assert_eq!(slots[1].time, "09:30");
    }

    #[test]
    fn periods_follow_canonical_boundaries() {
        let window = BookingWindow::new(t(8, 0), t(20, 0), None).expect("window");
        let slots = generate(&window, 60);
        for slot in &slots {
            let hour = minutes_of(&slot.time) / 60;
            let expected = if hour < 12 {
                Period::Morning
            } else if hour < 18 {
                Period::Afternoon
            } else {
                Period::Evening
            };
            assert_eq!(slot.period, expected, "slot {}", slot.time);
        }
        assert!(slots.iter().any(|s| s.period == Period::Evening));
    }

    #[test]
    fn every_generated_slot_defaults_available() {
        let slots = generate(&BookingWindow::default(), 45);
        assert!(slots.iter().all(|s| s.available));
    }
}

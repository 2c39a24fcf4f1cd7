// libs/scheduling-cell/tests/availability_test.rs
use assert_matches::assert_matches;
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use uuid::Uuid;

use scheduling_cell::models::{BookedInterval, DayPeriod, SchedulingError};
use scheduling_cell::services::availability::{intervals_overlap, AvailabilityEngine};
use shared_config::BusinessHours;

// Monday under the default working days
const MONDAY: &str = "2025-06-16";

fn monday() -> NaiveDate {
    MONDAY.parse().unwrap()
}

fn at(date: NaiveDate, time: &str) -> DateTime<Utc> {
    format!("{}T{}:00Z", date, time).parse().unwrap()
}

fn booking(date: NaiveDate, start: &str, end: &str) -> BookedInterval {
    BookedInterval {
        appointment_id: Uuid::new_v4(),
        staff_id: None,
        start: at(date, start),
        end: at(date, end),
    }
}

fn slot_times(slots: &[scheduling_cell::models::AvailabilitySlot]) -> Vec<&str> {
    slots.iter().map(|s| s.display_time.as_str()).collect()
}

#[test]
fn booking_blocks_overlapping_candidates_but_not_touching_ones() {
    // Scenario: 8-18 hours, lunch 13-14, 15-minute grid, one booking
    // 09:00-09:30, requested duration 30.
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();
    let booked = vec![booking(monday(), "09:00", "09:30")];

    let result = engine
        .compute_slots(monday(), 30, &hours, &booked, None, None)
        .unwrap();

    let times = slot_times(&result.slots);
    // Ends exactly when the booking starts: still available.
    assert!(times.contains(&"08:30"));
    // Each of these would overlap 09:00-09:30.
    assert!(!times.contains(&"08:45"));
    assert!(!times.contains(&"09:00"));
    assert!(!times.contains(&"09:15"));
    // Starts exactly when the booking ends: available again.
    assert!(times.contains(&"09:30"));
}

#[test]
fn lunch_interval_excludes_candidates_that_spill_into_it() {
    // A 30-minute candidate at 13:45 runs to 14:15 and crosses the end of
    // lunch; 12:45 crosses the start of it.
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();

    let result = engine
        .compute_slots(monday(), 30, &hours, &[], None, None)
        .unwrap();

    let times = slot_times(&result.slots);
    assert!(!times.contains(&"12:45"));
    assert!(!times.contains(&"13:00"));
    assert!(!times.contains(&"13:45"));
    // First candidate clear of lunch.
    assert!(times.contains(&"14:00"));
    // Last candidate that still fits before closing.
    assert!(times.contains(&"17:30"));
    assert!(!times.contains(&"17:45"));
}

#[test]
fn accounting_identity_holds() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();
    let booked = vec![
        booking(monday(), "09:00", "09:30"),
        booking(monday(), "10:00", "11:00"),
        booking(monday(), "16:45", "17:15"),
    ];

    let result = engine
        .compute_slots(monday(), 30, &hours, &booked, None, None)
        .unwrap();

    assert_eq!(
        result.total_slots,
        result.available_count + result.occupied_count
    );
    assert_eq!(result.available_count as usize, result.slots.len());
    // 39 candidates on the 15-minute grid fit a 30-minute visit in 8-18.
    assert_eq!(result.total_slots, 39);
}

#[test]
fn no_slot_overlaps_any_booking() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();
    let booked = vec![
        booking(monday(), "08:30", "09:10"),
        booking(monday(), "11:05", "11:50"),
        booking(monday(), "15:00", "16:00"),
    ];

    let result = engine
        .compute_slots(monday(), 45, &hours, &booked, None, None)
        .unwrap();

    for slot in &result.slots {
        let end = slot.start_date_time + chrono::Duration::minutes(45);
        for interval in &booked {
            assert!(
                !intervals_overlap(slot.start_date_time, end, interval.start, interval.end),
                "slot {} overlaps booking {}..{}",
                slot.display_time,
                interval.start,
                interval.end
            );
        }
    }
}

#[test]
fn slots_are_chronological_and_period_tagged() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();

    let result = engine
        .compute_slots(monday(), 15, &hours, &[], None, None)
        .unwrap();

    let mut previous = None;
    for slot in &result.slots {
        if let Some(prev) = previous {
            assert!(slot.start_date_time > prev);
        }
        previous = Some(slot.start_date_time);

        let expected = if slot.start_date_time < at(monday(), "13:00") {
            DayPeriod::Morning
        } else {
            DayPeriod::Afternoon
        };
        assert_eq!(slot.period, expected);
    }
}

#[test]
fn non_working_day_yields_empty_result() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();
    let sunday: NaiveDate = "2025-06-15".parse().unwrap();

    let result = engine
        .compute_slots(sunday, 30, &hours, &[], None, None)
        .unwrap();

    assert!(result.slots.is_empty());
    assert_eq!(result.total_slots, 0);
    assert_eq!(result.available_count, 0);
    assert_eq!(result.occupied_count, 0);
}

#[test]
fn fully_booked_day_is_a_valid_result() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();
    // One booking covering the whole working day.
    let booked = vec![booking(monday(), "08:00", "18:00")];

    let result = engine
        .compute_slots(monday(), 30, &hours, &booked, None, None)
        .unwrap();

    assert!(result.slots.is_empty());
    assert_eq!(result.available_count, 0);
    assert_eq!(result.occupied_count, result.total_slots);
    assert!(result.total_slots > 0);
}

#[test]
fn excluded_appointment_does_not_block() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();
    let mut interval = booking(monday(), "10:00", "10:30");
    let editing_id = Uuid::new_v4();
    interval.appointment_id = editing_id;

    let blocked = engine
        .compute_slots(monday(), 30, &hours, &[interval.clone()], None, None)
        .unwrap();
    assert!(!slot_times(&blocked.slots).contains(&"10:00"));

    let excluded = engine
        .compute_slots(monday(), 30, &hours, &[interval], Some(editing_id), None)
        .unwrap();
    assert!(slot_times(&excluded.slots).contains(&"10:00"));
}

#[test]
fn staff_filter_restricts_which_bookings_count() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();
    let vet_a = Uuid::new_v4();
    let vet_b = Uuid::new_v4();

    let mut interval = booking(monday(), "10:00", "10:30");
    interval.staff_id = Some(vet_a);
    let booked = vec![interval];

    // Filtering for the booked vet: slot is taken.
    let for_a = engine
        .compute_slots(monday(), 30, &hours, &booked, None, Some(vet_a))
        .unwrap();
    assert!(!slot_times(&for_a.slots).contains(&"10:00"));

    // A different vet is free at the same time.
    let for_b = engine
        .compute_slots(monday(), 30, &hours, &booked, None, Some(vet_b))
        .unwrap();
    assert!(slot_times(&for_b.slots).contains(&"10:00"));

    // Unfiltered view counts every booking.
    let unfiltered = engine
        .compute_slots(monday(), 30, &hours, &booked, None, None)
        .unwrap();
    assert!(!slot_times(&unfiltered.slots).contains(&"10:00"));
}

#[test]
fn candidate_spilling_past_closing_is_never_generated() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours::default();

    // A 90-minute visit must end by 18:00, so the last candidate is 16:30.
    let result = engine
        .compute_slots(monday(), 90, &hours, &[], None, None)
        .unwrap();

    let last = result.slots.last().unwrap();
    assert_eq!(last.display_time, "16:30");
}

#[test]
fn rejects_non_positive_slot_duration() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours {
        slot_duration_minutes: 0,
        ..BusinessHours::default()
    };

    let result = engine.compute_slots(monday(), 30, &hours, &[], None, None);
    assert_matches!(result, Err(SchedulingError::InvalidConfiguration(_)));
}

#[test]
fn rejects_inverted_lunch_interval() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours {
        lunch_start_hour: 14,
        lunch_end_hour: 13,
        ..BusinessHours::default()
    };

    let result = engine.compute_slots(monday(), 30, &hours, &[], None, None);
    assert_matches!(result, Err(SchedulingError::InvalidConfiguration(_)));
}

#[test]
fn custom_working_days_are_respected() {
    let engine = AvailabilityEngine::new();
    let hours = BusinessHours {
        working_days: vec![Weekday::Sun],
        ..BusinessHours::default()
    };
    let sunday: NaiveDate = "2025-06-15".parse().unwrap();

    let result = engine
        .compute_slots(sunday, 30, &hours, &[], None, None)
        .unwrap();
    assert!(result.available_count > 0);

    let empty = engine
        .compute_slots(monday(), 30, &hours, &[], None, None)
        .unwrap();
    assert_eq!(empty.total_slots, 0);
}

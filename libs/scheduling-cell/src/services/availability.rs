// libs/scheduling-cell/src/services/availability.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_config::BusinessHours;

use crate::models::{
    AvailabilitySlot, BookedInterval, DayAvailability, DayPeriod, SchedulingError,
};

/// Computes which start times are actually free for a given day. Pure: the
/// booked intervals are a read-only snapshot supplied by the caller, and
/// nothing is cached between calls. Staleness of the snapshot, like final
/// conflict arbitration under concurrent writers, is the persistence
/// layer's responsibility.
pub struct AvailabilityEngine;

impl AvailabilityEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute candidate slots for `date` at the configured granularity.
    ///
    /// Candidates are generated from opening time up to the latest start
    /// whose full interval still fits before closing; a candidate that would
    /// spill past closing is never generated. Each generated candidate is
    /// counted exactly once as available or occupied, so
    /// `total_slots == available_count + occupied_count` always holds.
    pub fn compute_slots(
        &self,
        date: NaiveDate,
        requested_duration: i32,
        hours: &BusinessHours,
        booked: &[BookedInterval],
        exclude_appointment_id: Option<Uuid>,
        staff_id: Option<Uuid>,
    ) -> Result<DayAvailability, SchedulingError> {
        self.validate_hours(hours)?;

        if requested_duration <= 0 {
            return Err(SchedulingError::ValidationError(
                "Requested duration must be positive".to_string(),
            ));
        }

        if !hours.working_days.contains(&date.weekday()) {
            debug!("{} is not a working day, no slots generated", date);
            return Ok(DayAvailability::empty());
        }

        let day_start = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| SchedulingError::ValidationError(format!("Invalid date: {}", date)))?
            .and_utc();

        let open = day_start + Duration::hours(hours.start_hour as i64);
        let close = day_start + Duration::hours(hours.end_hour as i64);
        let lunch_start = day_start + Duration::hours(hours.lunch_start_hour as i64);
        let lunch_end = day_start + Duration::hours(hours.lunch_end_hour as i64);

        let duration = Duration::minutes(requested_duration as i64);
        let step = Duration::minutes(hours.slot_duration_minutes as i64);

        // Bookings that count against this computation: everything except
        // the appointment being edited, narrowed to one staff member when a
        // filter is supplied.
        let relevant: Vec<&BookedInterval> = booked
            .iter()
            .filter(|interval| Some(interval.appointment_id) != exclude_appointment_id)
            .filter(|interval| match staff_id {
                Some(staff) => interval.staff_id == Some(staff),
                None => true,
            })
            .collect();

        let mut slots = Vec::new();
        let mut available_count = 0;
        let mut occupied_count = 0;

        let mut start = open;
        while start + duration <= close {
            let end = start + duration;

            let blocked = intervals_overlap(start, end, lunch_start, lunch_end)
                || relevant
                    .iter()
                    .any(|interval| intervals_overlap(start, end, interval.start, interval.end));

            if blocked {
                occupied_count += 1;
            } else {
                available_count += 1;
                slots.push(AvailabilitySlot {
                    start_date_time: start,
                    display_time: start.format("%H:%M").to_string(),
                    period: if start < lunch_start {
                        DayPeriod::Morning
                    } else {
                        DayPeriod::Afternoon
                    },
                });
            }

            start += step;
        }

        debug!(
            "Computed slots for {}: {} available, {} occupied",
            date, available_count, occupied_count
        );

        Ok(DayAvailability {
            slots,
            total_slots: available_count + occupied_count,
            available_count,
            occupied_count,
        })
    }

    /// Check a single interval against a booked snapshot. Used by the
    /// reschedule coordinator to revalidate a move/resize target before
    /// issuing the mutation.
    pub fn interval_is_free(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        booked: &[BookedInterval],
        exclude_appointment_id: Option<Uuid>,
        staff_id: Option<Uuid>,
    ) -> bool {
        !booked
            .iter()
            .filter(|interval| Some(interval.appointment_id) != exclude_appointment_id)
            .filter(|interval| match staff_id {
                Some(staff) => interval.staff_id == Some(staff),
                None => true,
            })
            .any(|interval| intervals_overlap(start, end, interval.start, interval.end))
    }

    fn validate_hours(&self, hours: &BusinessHours) -> Result<(), SchedulingError> {
        if hours.slot_duration_minutes <= 0 {
            return Err(SchedulingError::InvalidConfiguration(format!(
                "Slot duration must be positive, got {}",
                hours.slot_duration_minutes
            )));
        }
        if hours.lunch_start_hour >= hours.lunch_end_hour {
            return Err(SchedulingError::InvalidConfiguration(format!(
                "Lunch break must start before it ends ({} >= {})",
                hours.lunch_start_hour, hours.lunch_end_hour
            )));
        }
        if hours.start_hour >= hours.end_hour {
            return Err(SchedulingError::InvalidConfiguration(format!(
                "Opening hour must be before closing hour ({} >= {})",
                hours.start_hour, hours.end_hour
            )));
        }
        if hours.end_hour > 24 {
            return Err(SchedulingError::InvalidConfiguration(format!(
                "Closing hour must be within the day, got {}",
                hours.end_hour
            )));
        }
        Ok(())
    }
}

impl Default for AvailabilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Half-open interval intersection: `[a_start, a_end)` meets
/// `[b_start, b_end)` iff `a_start < b_end && b_start < a_end`. Touching
/// endpoints are not overlaps, so a slot ending exactly when a booking
/// starts stays available.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

//! Candidate time-slot generation.
//!
//! Pure computation over an injected clock: no side effects, fresh
//! sequence on every call.

use chrono::{DateTime, Duration, TimeZone, Utc};
use reserva_core::config::DialogueSection;
use reserva_core::types::TimeSlot;

/// Produces candidate appointment windows for a service/provider pair over
/// a bounded horizon of consecutive calendar days.
#[derive(Debug, Clone)]
pub struct SlotGenerator {
    horizon_days: u32,
    /// Sorted hour marks (UTC) at which slots open each day.
    hour_marks: Vec<u32>,
    slot_duration_minutes: i64,
}

impl SlotGenerator {
    pub fn new(horizon_days: u32, hour_marks: Vec<u32>, slot_duration_minutes: u32) -> Self {
        let mut hour_marks: Vec<u32> = hour_marks.into_iter().filter(|h| *h < 24).collect();
        hour_marks.sort_unstable();
        hour_marks.dedup();
        Self {
            horizon_days,
            hour_marks,
            slot_duration_minutes: i64::from(slot_duration_minutes),
        }
    }

    pub fn from_config(section: &DialogueSection) -> Self {
        Self::new(
            section.horizon_days,
            section.hour_marks.clone(),
            section.slot_duration_minutes,
        )
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Generate slots starting from the current wall clock.
    pub fn generate(&self, service_id: &str, provider_id: &str) -> Vec<TimeSlot> {
        self.generate_at(Utc::now(), service_id, provider_id)
    }

    /// Generate slots for `horizon_days` consecutive days starting at
    /// `now`'s date. Day-0 slots whose start is not strictly after `now`
    /// are dropped; later days emit every configured hour mark. Ordered by
    /// start time.
    pub fn generate_at(
        &self,
        now: DateTime<Utc>,
        service_id: &str,
        provider_id: &str,
    ) -> Vec<TimeSlot> {
        let mut slots = Vec::new();
        for day in 0..i64::from(self.horizon_days) {
            let date = now.date_naive() + Duration::days(day);
            for &hour in &self.hour_marks {
                let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                    continue;
                };
                let start = Utc.from_utc_datetime(&naive);
                if day == 0 && start <= now {
                    continue;
                }
                slots.push(TimeSlot {
                    start,
                    end: start + Duration::minutes(self.slot_duration_minutes),
                    provider_id: provider_id.to_string(),
                    service_id: service_id.to_string(),
                });
            }
        }
        slots
    }
}

impl Default for SlotGenerator {
    fn default() -> Self {
        Self::from_config(&DialogueSection::default())
    }
}

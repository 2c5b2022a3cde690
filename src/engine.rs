use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::debug;

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::lifecycle::{MilestoneLifecycle, PaymentOutcome};
use crate::milestone::{Booking, PaymentScheduleMilestone};
use crate::schedule::ScheduleGenerator;
use crate::serialization::{ScheduleSummary, ScheduleView};
use crate::store::{MilestoneStore, RuleStore};
use crate::types::{BookingId, MilestoneId};

/// payment schedule engine, the entry point for booking and payment workflows
pub struct PaymentScheduleEngine<S> {
    pub store: S,
    pub config: EngineConfig,
    pub events: EventStore,
}

impl<S: RuleStore + MilestoneStore> PaymentScheduleEngine<S> {
    /// create engine with default configuration
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            events: EventStore::new(),
        }
    }

    /// create engine with a validated configuration
    pub fn with_config(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            events: EventStore::new(),
        })
    }

    /// generate and persist a confirmed booking's schedule with system time
    pub fn generate_schedule_now(
        &mut self,
        booking: &Booking,
    ) -> Result<Vec<PaymentScheduleMilestone>> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.generate_schedule(booking, &time)
    }

    /// generate and persist a confirmed booking's schedule
    ///
    /// called once per booking; an empty list means payment is flexible
    pub fn generate_schedule(
        &mut self,
        booking: &Booking,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<PaymentScheduleMilestone>> {
        let now = time_provider.now();
        let generator = ScheduleGenerator::new(&self.store, self.config.percentage_tolerance);
        let generated = generator.generate_detailed(booking, now)?;
        let milestones = generated.milestones;

        if milestones.is_empty() {
            self.events.emit(Event::ScheduleSkipped {
                booking_id: booking.id,
                rule_type: generated.rule.map(|rule| rule.rule_type()),
                timestamp: now,
            });
        } else {
            self.events.emit(Event::ScheduleGenerated {
                booking_id: booking.id,
                rule_id: generated.rule.map(|rule| rule.id),
                milestone_count: milestones.len(),
                total_due: milestones.iter().map(|m| m.amount_due).sum(),
                timestamp: now,
            });
        }

        Ok(milestones)
    }

    /// record a payment with system time
    pub fn record_payment_now(
        &mut self,
        milestone_id: MilestoneId,
        cumulative_paid: Money,
    ) -> Result<PaymentOutcome> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.record_payment(milestone_id, cumulative_paid, &time)
    }

    /// record the cumulative amount received for a milestone
    pub fn record_payment(
        &mut self,
        milestone_id: MilestoneId,
        cumulative_paid: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentOutcome> {
        let now = time_provider.now();
        let lifecycle = MilestoneLifecycle::new(&self.store, self.config.max_update_retries);
        let outcome = lifecycle.record_payment(milestone_id, cumulative_paid, now)?;

        match &outcome {
            PaymentOutcome::Applied { milestone, previous_status, overpayment } => {
                self.events.emit(Event::MilestonePaymentRecorded {
                    booking_id: milestone.booking_id,
                    milestone_id,
                    amount_paid: milestone.amount_paid,
                    amount_due: milestone.amount_due,
                    timestamp: now,
                });
                if *previous_status != milestone.status {
                    self.events.emit(Event::MilestoneStatusChanged {
                        booking_id: milestone.booking_id,
                        milestone_id,
                        old_status: *previous_status,
                        new_status: milestone.status,
                        timestamp: now,
                    });
                }
                if overpayment.is_positive() {
                    self.events.emit(Event::OverpaymentReported {
                        booking_id: milestone.booking_id,
                        milestone_id,
                        excess: *overpayment,
                        timestamp: now,
                    });
                }
            }
            PaymentOutcome::Ignored { milestone } => {
                self.events.emit(Event::LatePaymentIgnored {
                    booking_id: milestone.booking_id,
                    milestone_id,
                    status: milestone.status,
                    provided: cumulative_paid,
                    timestamp: now,
                });
            }
        }

        Ok(outcome)
    }

    /// mark pending milestones due before `today` as overdue, returns how many moved
    ///
    /// the evaluation date is always supplied by the caller
    pub fn sweep_overdue(&mut self, today: NaiveDate) -> Result<usize> {
        let lifecycle = MilestoneLifecycle::new(&self.store, self.config.max_update_retries);
        let changed = lifecycle.sweep_overdue(today)?;
        let count = changed.len();

        if count > 0 {
            self.events.emit(Event::MilestonesMarkedOverdue {
                milestone_ids: changed,
                as_of: today,
            });
        }

        Ok(count)
    }

    /// cancel a booking's open milestones with system time
    pub fn cancel_schedule_now(&mut self, booking_id: BookingId) -> Result<usize> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.cancel_schedule(booking_id, &time)
    }

    /// cancel a booking's open milestones, paid ones stay paid
    pub fn cancel_schedule(
        &mut self,
        booking_id: BookingId,
        time_provider: &SafeTimeProvider,
    ) -> Result<usize> {
        let lifecycle = MilestoneLifecycle::new(&self.store, self.config.max_update_retries);
        let changed = lifecycle.cancel_schedule(booking_id)?;
        let count = changed.len();

        if count > 0 {
            self.events.emit(Event::ScheduleCancelled {
                booking_id,
                milestone_ids: changed,
                timestamp: time_provider.now(),
            });
        }

        Ok(count)
    }

    /// a booking's milestones, ascending by sequence
    pub fn get_schedule(&self, booking_id: BookingId) -> Result<Vec<PaymentScheduleMilestone>> {
        self.store.schedule_for_booking(booking_id)
    }

    /// totals and the next milestone to pay
    pub fn schedule_summary(&self, booking_id: BookingId) -> Result<ScheduleSummary> {
        let schedule = self.get_schedule(booking_id)?;
        Ok(ScheduleSummary::from_schedule(booking_id, &schedule))
    }

    /// full serializable schedule view
    pub fn schedule_view(&self, booking_id: BookingId) -> Result<ScheduleView> {
        let schedule = self.get_schedule(booking_id)?;
        debug!(%booking_id, milestones = schedule.len(), "schedule view requested");
        Ok(ScheduleView::from_schedule(booking_id, &schedule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{AmountSpec, DueSpec, PaymentRule};
    use crate::store::MemoryStore;
    use crate::types::MilestoneStatus;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn booking(
        room: Uuid,
        booked: NaiveDate,
        checkin: NaiveDate,
        total: i64,
        currency: &str,
    ) -> Booking {
        Booking::new(room, booked, checkin, Money::from_major(total), currency)
    }

    fn deposit_engine() -> (PaymentScheduleEngine<MemoryStore>, Uuid) {
        let store = MemoryStore::new();
        let room = Uuid::new_v4();
        store
            .insert_rule(&PaymentRule::deposit(
                room,
                AmountSpec::percentage(dec!(30)),
                DueSpec::at_booking(),
                DueSpec::days_before_checkin(7),
            ))
            .unwrap();
        (PaymentScheduleEngine::new(store), room)
    }

    #[test]
    fn test_generate_emits_event() {
        let (mut engine, room) = deposit_engine();
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
        ));
        let booking = booking(room, date(2025, 1, 1), date(2025, 2, 1), 1_000, "EUR");

        let milestones = engine.generate_schedule(&booking, &time).unwrap();
        assert_eq!(milestones.len(), 2);
        assert_eq!(milestones[0].created_at, time.now());

        let events = engine.events.take_events();
        assert!(matches!(
            &events[..],
            [Event::ScheduleGenerated { milestone_count: 2, total_due, .. }]
                if *total_due == Money::from_major(1_000)
        ));
    }

    #[test]
    fn test_with_config_validates() {
        let negative = EngineConfig::default().with_percentage_tolerance(dec!(-0.5));
        let err = PaymentScheduleEngine::with_config(MemoryStore::new(), negative).err();
        assert!(matches!(err, Some(crate::errors::ScheduleError::Configuration { .. })));

        let config = EngineConfig::default().with_max_update_retries(5);
        let engine = PaymentScheduleEngine::with_config(MemoryStore::new(), config).unwrap();
        assert_eq!(engine.config.max_update_retries, 5);
    }

    #[test]
    fn test_flexible_room_emits_skip() {
        let store = MemoryStore::new();
        let room = Uuid::new_v4();
        store.insert_rule(&PaymentRule::flexible(room)).unwrap();
        let mut engine = PaymentScheduleEngine::new(store);
        let booking = booking(room, date(2025, 1, 1), date(2025, 2, 1), 1_000, "EUR");

        assert!(engine.generate_schedule_now(&booking).unwrap().is_empty());
        assert!(matches!(
            engine.events.events(),
            [Event::ScheduleSkipped { rule_type: Some(crate::types::RuleType::Flexible), .. }]
        ));
    }

    #[test]
    fn test_payment_uses_time_provider() {
        let (mut engine, room) = deposit_engine();
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
        ));
        let control = time.test_control().unwrap();
        let booking = booking(room, date(2025, 1, 1), date(2025, 2, 1), 1_000, "EUR");
        let milestones = engine.generate_schedule(&booking, &time).unwrap();
        engine.events.clear();

        control.advance(chrono::Duration::days(2));
        let outcome = engine
            .record_payment(milestones[0].id, Money::from_major(300), &time)
            .unwrap();
        assert_eq!(outcome.status(), MilestoneStatus::Paid);
        assert_eq!(outcome.milestone().paid_at, Some(time.now()));

        let events = engine.events.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            Event::MilestoneStatusChanged {
                old_status: MilestoneStatus::Pending,
                new_status: MilestoneStatus::Paid,
                ..
            }
        ));
    }

    #[test]
    fn test_sweep_and_cancel_counts() {
        let (mut engine, room) = deposit_engine();
        let booking = booking(room, date(2025, 1, 1), date(2025, 2, 1), 1_000, "EUR");
        let milestones = engine.generate_schedule_now(&booking).unwrap();
        engine.record_payment_now(milestones[0].id, Money::from_major(300)).unwrap();

        // balance due 2025-01-25
        assert_eq!(engine.sweep_overdue(date(2025, 1, 25)).unwrap(), 0);
        assert_eq!(engine.sweep_overdue(date(2025, 1, 26)).unwrap(), 1);
        assert_eq!(engine.sweep_overdue(date(2025, 1, 26)).unwrap(), 0);

        assert_eq!(engine.cancel_schedule_now(booking.id).unwrap(), 1);
        let summary = engine.schedule_summary(booking.id).unwrap();
        assert_eq!(summary.total_paid, Money::from_major(300));
        assert_eq!(summary.outstanding, Money::ZERO);
        assert!(summary.next_due.is_none());
    }

    #[test]
    fn test_late_payment_event() {
        let (mut engine, room) = deposit_engine();
        let booking = booking(room, date(2025, 1, 1), date(2025, 2, 1), 1_000, "EUR");
        let milestones = engine.generate_schedule_now(&booking).unwrap();
        engine.record_payment_now(milestones[0].id, Money::from_major(300)).unwrap();
        engine.events.clear();

        let outcome = engine.record_payment_now(milestones[0].id, Money::from_major(350)).unwrap();
        assert!(matches!(outcome, PaymentOutcome::Ignored { .. }));
        assert!(matches!(engine.events.events(), [Event::LatePaymentIgnored { .. }]));
    }
}

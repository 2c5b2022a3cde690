use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::decimal::Money;
use crate::errors::{Result, ScheduleError};
use crate::milestone::PaymentScheduleMilestone;
use crate::store::{MilestoneGuard, MilestoneStore, MilestoneUpdate};
use crate::types::{BookingId, MilestoneId, MilestoneStatus};

/// status a milestone moves to when the cumulative amount paid is recorded
///
/// paid and cancelled are terminal and map to themselves
pub fn transition(
    current: MilestoneStatus,
    cumulative_paid: Money,
    amount_due: Money,
) -> MilestoneStatus {
    if current.is_terminal() {
        return current;
    }

    if cumulative_paid >= amount_due {
        MilestoneStatus::Paid
    } else if cumulative_paid.is_positive() {
        MilestoneStatus::Partial
    } else {
        current
    }
}

/// result of recording a payment
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Applied {
        milestone: PaymentScheduleMilestone,
        previous_status: MilestoneStatus,
        /// amount received beyond the amount due, tolerated and reported
        overpayment: Money,
    },
    /// milestone was already paid or cancelled, nothing changed
    Ignored {
        milestone: PaymentScheduleMilestone,
    },
}

impl PaymentOutcome {
    pub fn milestone(&self) -> &PaymentScheduleMilestone {
        match self {
            PaymentOutcome::Applied { milestone, .. } => milestone,
            PaymentOutcome::Ignored { milestone } => milestone,
        }
    }

    pub fn status(&self) -> MilestoneStatus {
        self.milestone().status
    }
}

/// applies payments, overdue sweeps and cancellations to stored milestones
pub struct MilestoneLifecycle<'a, S: MilestoneStore + ?Sized> {
    store: &'a S,
    max_update_retries: u32,
}

impl<'a, S: MilestoneStore + ?Sized> MilestoneLifecycle<'a, S> {
    pub fn new(store: &'a S, max_update_retries: u32) -> Self {
        Self {
            store,
            max_update_retries,
        }
    }

    /// record the cumulative amount received for a milestone
    ///
    /// the caller supplies a cumulative total rather than a delta, so replays
    /// of the same figure are harmless
    pub fn record_payment(
        &self,
        milestone_id: MilestoneId,
        cumulative_paid: Money,
        now: DateTime<Utc>,
    ) -> Result<PaymentOutcome> {
        if cumulative_paid.is_negative() {
            return Err(ScheduleError::InvalidPaymentAmount { amount: cumulative_paid });
        }

        for attempt in 0..=self.max_update_retries {
            let current = self
                .store
                .milestone(milestone_id)?
                .ok_or(ScheduleError::MilestoneNotFound { id: milestone_id })?;

            if current.status.is_terminal() {
                warn!(
                    %milestone_id,
                    status = %current.status,
                    amount_paid = %current.amount_paid,
                    provided = %cumulative_paid,
                    "payment recorded against settled milestone ignored"
                );
                return Ok(PaymentOutcome::Ignored { milestone: current });
            }

            if cumulative_paid < current.amount_paid {
                return Err(ScheduleError::AmountPaidDecreased {
                    recorded: current.amount_paid,
                    provided: cumulative_paid,
                });
            }

            let status = transition(current.status, cumulative_paid, current.amount_due);
            let update = MilestoneUpdate {
                status,
                amount_paid: cumulative_paid,
                paid_at: (status == MilestoneStatus::Paid).then_some(now),
            };

            if !self.store.compare_and_update(milestone_id, MilestoneGuard::of(&current), update)? {
                debug!(%milestone_id, attempt, "milestone changed underneath payment, retrying");
                continue;
            }

            let previous_status = current.status;
            let milestone = PaymentScheduleMilestone {
                status: update.status,
                amount_paid: update.amount_paid,
                paid_at: update.paid_at,
                ..current
            };
            let overpayment = milestone.overpayment();

            if overpayment.is_positive() {
                warn!(
                    %milestone_id,
                    amount_due = %milestone.amount_due,
                    amount_paid = %milestone.amount_paid,
                    %overpayment,
                    "milestone overpaid"
                );
            }
            info!(
                %milestone_id,
                from = %previous_status,
                to = %milestone.status,
                amount_paid = %milestone.amount_paid,
                "milestone payment recorded"
            );

            return Ok(PaymentOutcome::Applied {
                milestone,
                previous_status,
                overpayment,
            });
        }

        Err(ScheduleError::ConcurrentModification { id: milestone_id })
    }

    /// mark every pending milestone due before `today` as overdue
    ///
    /// one conditional bulk update, safe to repeat and to race with payments
    pub fn sweep_overdue(&self, today: NaiveDate) -> Result<Vec<MilestoneId>> {
        let changed = self.store.mark_overdue(today)?;
        info!(%today, transitioned = changed.len(), "overdue sweep complete");
        Ok(changed)
    }

    /// cancel every open milestone of a booking, paid ones are kept
    pub fn cancel_schedule(&self, booking_id: BookingId) -> Result<Vec<MilestoneId>> {
        let changed = self.store.cancel_open(booking_id)?;
        info!(%booking_id, cancelled = changed.len(), "payment schedule cancelled");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::DueTiming;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded(amounts: &[i64]) -> (MemoryStore, BookingId, Vec<PaymentScheduleMilestone>) {
        let store = MemoryStore::new();
        let booking = Uuid::new_v4();
        let rows: Vec<_> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                PaymentScheduleMilestone::pending(
                    booking,
                    i as u32 + 1,
                    format!("Step {}", i + 1),
                    Money::from_major(*amount),
                    "EUR",
                    date(2025, 1, 10),
                    DueTiming::SpecificDate,
                    None,
                    Utc::now(),
                )
            })
            .collect();
        store.insert_schedule(booking, &rows).unwrap();
        (store, booking, rows)
    }

    fn pay<S: MilestoneStore + ?Sized>(
        lifecycle: &MilestoneLifecycle<'_, S>,
        id: MilestoneId,
        amount: i64,
    ) -> Result<PaymentOutcome> {
        lifecycle.record_payment(id, Money::from_major(amount), Utc::now())
    }

    #[test]
    fn test_transition_table() {
        use MilestoneStatus::*;
        let due = Money::from_major(500);

        assert_eq!(transition(Pending, Money::from_major(500), due), Paid);
        assert_eq!(transition(Pending, Money::from_major(200), due), Partial);
        assert_eq!(transition(Pending, Money::ZERO, due), Pending);
        assert_eq!(transition(Partial, Money::from_major(600), due), Paid);
        assert_eq!(transition(Partial, Money::from_major(300), due), Partial);
        assert_eq!(transition(Overdue, Money::from_major(500), due), Paid);
        assert_eq!(transition(Overdue, Money::from_major(100), due), Partial);
        assert_eq!(transition(Overdue, Money::ZERO, due), Overdue);
        assert_eq!(transition(Paid, Money::from_major(100), due), Paid);
        assert_eq!(transition(Cancelled, Money::from_major(500), due), Cancelled);
    }

    #[test]
    fn test_full_payment_sets_paid_at() {
        let (store, _, rows) = seeded(&[500]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);
        let now = Utc::now();

        let outcome = lifecycle.record_payment(rows[0].id, Money::from_major(500), now).unwrap();
        assert_eq!(outcome.status(), MilestoneStatus::Paid);
        assert_eq!(outcome.milestone().paid_at, Some(now));

        let stored = store.milestone(rows[0].id).unwrap().unwrap();
        assert_eq!(stored.status, MilestoneStatus::Paid);
        assert_eq!(stored.paid_at, Some(now));
    }

    #[test]
    fn test_partial_then_paid() {
        let (store, _, rows) = seeded(&[500]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);

        let outcome = pay(&lifecycle, rows[0].id, 200).unwrap();
        assert_eq!(outcome.status(), MilestoneStatus::Partial);
        assert!(outcome.milestone().paid_at.is_none());

        let outcome = pay(&lifecycle, rows[0].id, 500).unwrap();
        let PaymentOutcome::Applied { previous_status, overpayment, .. } = outcome else {
            panic!("expected applied payment");
        };
        assert_eq!(previous_status, MilestoneStatus::Partial);
        assert_eq!(overpayment, Money::ZERO);
    }

    #[test]
    fn test_paid_is_terminal() {
        let (store, _, rows) = seeded(&[500]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);
        let first = Utc::now();
        lifecycle.record_payment(rows[0].id, Money::from_major(500), first).unwrap();

        let outcome = lifecycle
            .record_payment(rows[0].id, Money::from_major(600), first + chrono::Duration::days(3))
            .unwrap();
        assert!(matches!(outcome, PaymentOutcome::Ignored { .. }));

        let stored = store.milestone(rows[0].id).unwrap().unwrap();
        assert_eq!(stored.status, MilestoneStatus::Paid);
        assert_eq!(stored.amount_paid, Money::from_major(500));
        assert_eq!(stored.paid_at, Some(first));
    }

    #[test]
    fn test_overpayment_reported() {
        let (store, _, rows) = seeded(&[500]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);

        let outcome = pay(&lifecycle, rows[0].id, 550).unwrap();
        let PaymentOutcome::Applied { milestone, overpayment, .. } = outcome else {
            panic!("expected applied payment");
        };
        assert_eq!(milestone.status, MilestoneStatus::Paid);
        assert_eq!(milestone.amount_paid, Money::from_major(550));
        assert_eq!(overpayment, Money::from_major(50));
    }

    #[test]
    fn test_decreasing_cumulative_rejected() {
        let (store, _, rows) = seeded(&[500]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);
        pay(&lifecycle, rows[0].id, 300).unwrap();

        let err = pay(&lifecycle, rows[0].id, 100).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::AmountPaidDecreased {
                recorded: Money::from_major(300),
                provided: Money::from_major(100),
            }
        );
    }

    #[test]
    fn test_replayed_cumulative_is_idempotent() {
        let (store, _, rows) = seeded(&[500]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);

        pay(&lifecycle, rows[0].id, 300).unwrap();
        pay(&lifecycle, rows[0].id, 300).unwrap();

        let stored = store.milestone(rows[0].id).unwrap().unwrap();
        assert_eq!(stored.amount_paid, Money::from_major(300));
        assert_eq!(stored.status, MilestoneStatus::Partial);
    }

    #[test]
    fn test_negative_and_unknown() {
        let (store, _, rows) = seeded(&[500]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);

        assert!(matches!(
            lifecycle.record_payment(rows[0].id, Money::from_major(-1), Utc::now()),
            Err(ScheduleError::InvalidPaymentAmount { .. })
        ));

        let missing = Uuid::new_v4();
        assert_eq!(
            lifecycle.record_payment(missing, Money::from_major(1), Utc::now()).unwrap_err(),
            ScheduleError::MilestoneNotFound { id: missing }
        );
    }

    #[test]
    fn test_overdue_sweep_then_payment() {
        let (store, _, rows) = seeded(&[500]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);

        assert_eq!(lifecycle.sweep_overdue(date(2025, 1, 11)).unwrap(), vec![rows[0].id]);
        assert!(lifecycle.sweep_overdue(date(2025, 1, 11)).unwrap().is_empty());

        let outcome = pay(&lifecycle, rows[0].id, 100).unwrap();
        assert_eq!(outcome.status(), MilestoneStatus::Partial);

        // partial milestones are not swept again
        assert!(lifecycle.sweep_overdue(date(2025, 2, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_cancel_keeps_paid() {
        let (store, booking, rows) = seeded(&[300, 700, 100]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);
        pay(&lifecycle, rows[0].id, 300).unwrap();
        lifecycle.record_payment(rows[1].id, Money::from_major(50), Utc::now()).unwrap();

        let cancelled = lifecycle.cancel_schedule(booking).unwrap();
        assert_eq!(cancelled.len(), 2);

        let schedule = store.schedule_for_booking(booking).unwrap();
        assert_eq!(schedule[0].status, MilestoneStatus::Paid);
        assert_eq!(schedule[1].status, MilestoneStatus::Cancelled);
        assert_eq!(schedule[1].amount_paid, Money::from_major(50));
        assert_eq!(schedule[2].status, MilestoneStatus::Cancelled);

        // retry is harmless
        assert!(lifecycle.cancel_schedule(booking).unwrap().is_empty());
    }

    #[test]
    fn test_payment_after_cancel_ignored() {
        let (store, booking, rows) = seeded(&[500]);
        let lifecycle = MilestoneLifecycle::new(&store, 3);
        lifecycle.cancel_schedule(booking).unwrap();

        let outcome = pay(&lifecycle, rows[0].id, 500).unwrap();
        assert!(matches!(outcome, PaymentOutcome::Ignored { .. }));
        assert_eq!(outcome.status(), MilestoneStatus::Cancelled);
    }

    /// store whose first compare-and-set loses to a concurrent sweep
    struct RacingStore {
        inner: MemoryStore,
        raced: std::sync::atomic::AtomicBool,
        sweep_date: NaiveDate,
    }

    impl MilestoneStore for RacingStore {
        fn insert_schedule(
            &self,
            booking_id: BookingId,
            milestones: &[PaymentScheduleMilestone],
        ) -> Result<()> {
            self.inner.insert_schedule(booking_id, milestones)
        }

        fn schedule_for_booking(
            &self,
            booking_id: BookingId,
        ) -> Result<Vec<PaymentScheduleMilestone>> {
            self.inner.schedule_for_booking(booking_id)
        }

        fn milestone(&self, id: MilestoneId) -> Result<Option<PaymentScheduleMilestone>> {
            self.inner.milestone(id)
        }

        fn compare_and_update(
            &self,
            id: MilestoneId,
            expected: MilestoneGuard,
            update: MilestoneUpdate,
        ) -> Result<bool> {
            if !self.raced.swap(true, std::sync::atomic::Ordering::SeqCst) {
                self.inner.mark_overdue(self.sweep_date)?;
            }
            self.inner.compare_and_update(id, expected, update)
        }

        fn mark_overdue(&self, today: NaiveDate) -> Result<Vec<MilestoneId>> {
            self.inner.mark_overdue(today)
        }

        fn cancel_open(&self, booking_id: BookingId) -> Result<Vec<MilestoneId>> {
            self.inner.cancel_open(booking_id)
        }
    }

    #[test]
    fn test_payment_retries_after_concurrent_sweep() {
        let (inner, _, rows) = seeded(&[500]);
        let store = RacingStore {
            inner,
            raced: std::sync::atomic::AtomicBool::new(false),
            sweep_date: date(2025, 1, 11),
        };
        let lifecycle = MilestoneLifecycle::new(&store, 3);

        let outcome = pay(&lifecycle, rows[0].id, 200).unwrap();
        let PaymentOutcome::Applied { previous_status, milestone, .. } = outcome else {
            panic!("expected applied payment");
        };
        assert_eq!(previous_status, MilestoneStatus::Overdue);
        assert_eq!(milestone.status, MilestoneStatus::Partial);
    }

    #[test]
    fn test_no_retries_left() {
        let (inner, _, rows) = seeded(&[500]);
        let store = RacingStore {
            inner,
            raced: std::sync::atomic::AtomicBool::new(false),
            sweep_date: date(2025, 1, 11),
        };
        let lifecycle = MilestoneLifecycle::new(&store, 0);

        assert_eq!(
            pay(&lifecycle, rows[0].id, 200).unwrap_err(),
            ScheduleError::ConcurrentModification { id: rows[0].id }
        );
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use tracing::error;

use crate::errors::{Result, ScheduleError};
use crate::milestone::PaymentScheduleMilestone;
use crate::rules::{PaymentRule, RuleRecord};
use crate::store::{MilestoneGuard, MilestoneStore, MilestoneUpdate, RuleStore};
use crate::types::{BookingId, MilestoneId, MilestoneStatus, RoomId};

#[derive(Default)]
struct Milestones {
    rows: HashMap<MilestoneId, PaymentScheduleMilestone>,
    by_booking: HashMap<BookingId, Vec<MilestoneId>>,
}

/// in-memory rule and milestone store
#[derive(Default)]
pub struct MemoryStore {
    rules: RwLock<Vec<RuleRecord>>,
    milestones: RwLock<Milestones>,
    fail_on_insert: AtomicBool,
    fail_on_update: AtomicBool,
}

fn poisoned<T>(_: T) -> ScheduleError {
    error!("memory store lock poisoned");
    ScheduleError::persistence("store lock poisoned")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// store a typed rule as an active record
    pub fn insert_rule(&self, rule: &PaymentRule) -> Result<()> {
        self.insert_rule_record(RuleRecord::from(rule))
    }

    /// store a raw record as-is, including misconfigured ones
    pub fn insert_rule_record(&self, record: RuleRecord) -> Result<()> {
        let mut rules = self.rules.write().map_err(poisoned)?;
        rules.retain(|r| r.id != record.id);
        rules.push(record);
        Ok(())
    }

    /// make the next schedule inserts fail
    pub fn set_fail_on_insert(&self, fail: bool) {
        self.fail_on_insert.store(fail, Ordering::SeqCst);
    }

    /// make the next milestone updates fail
    pub fn set_fail_on_update(&self, fail: bool) {
        self.fail_on_update.store(fail, Ordering::SeqCst);
    }

    /// total milestone rows across all bookings
    pub fn milestone_count(&self) -> Result<usize> {
        Ok(self.read_milestones()?.rows.len())
    }

    fn read_milestones(&self) -> Result<RwLockReadGuard<'_, Milestones>> {
        self.milestones.read().map_err(poisoned)
    }

    fn write_milestones(&self) -> Result<RwLockWriteGuard<'_, Milestones>> {
        if self.fail_on_update.load(Ordering::SeqCst) {
            return Err(ScheduleError::persistence("milestone update failed"));
        }
        self.milestones.write().map_err(poisoned)
    }
}

impl RuleStore for MemoryStore {
    fn active_rules(&self, room_id: RoomId, date: NaiveDate) -> Result<Vec<RuleRecord>> {
        let rules = self.rules.read().map_err(poisoned)?;
        Ok(rules
            .iter()
            .filter(|r| r.room_id == room_id && r.is_effective_on(date))
            .cloned()
            .collect())
    }
}

impl MilestoneStore for MemoryStore {
    fn insert_schedule(
        &self,
        booking_id: BookingId,
        milestones: &[PaymentScheduleMilestone],
    ) -> Result<()> {
        let mut store = self.milestones.write().map_err(poisoned)?;

        if store.by_booking.contains_key(&booking_id) {
            return Err(ScheduleError::ScheduleAlreadyExists { booking_id });
        }
        if let Some(stray) = milestones.iter().find(|m| m.booking_id != booking_id) {
            return Err(ScheduleError::persistence(format!(
                "milestone {} belongs to booking {}, not {}",
                stray.id, stray.booking_id, booking_id
            )));
        }
        // checked before touching the maps so nothing is half-written
        if self.fail_on_insert.load(Ordering::SeqCst) {
            return Err(ScheduleError::persistence("schedule insert failed"));
        }
        if milestones.is_empty() {
            return Ok(());
        }

        let ids = milestones.iter().map(|m| m.id).collect();
        for m in milestones {
            store.rows.insert(m.id, m.clone());
        }
        store.by_booking.insert(booking_id, ids);
        Ok(())
    }

    fn schedule_for_booking(&self, booking_id: BookingId) -> Result<Vec<PaymentScheduleMilestone>> {
        let store = self.read_milestones()?;
        let mut schedule: Vec<PaymentScheduleMilestone> = store
            .by_booking
            .get(&booking_id)
            .map(|ids| ids.iter().filter_map(|id| store.rows.get(id).cloned()).collect())
            .unwrap_or_default();
        schedule.sort_by_key(|m| m.milestone_sequence);
        Ok(schedule)
    }

    fn milestone(&self, id: MilestoneId) -> Result<Option<PaymentScheduleMilestone>> {
        Ok(self.read_milestones()?.rows.get(&id).cloned())
    }

    fn compare_and_update(
        &self,
        id: MilestoneId,
        expected: MilestoneGuard,
        update: MilestoneUpdate,
    ) -> Result<bool> {
        let mut store = self.write_milestones()?;
        let row = store
            .rows
            .get_mut(&id)
            .ok_or(ScheduleError::MilestoneNotFound { id })?;

        if MilestoneGuard::of(row) != expected {
            return Ok(false);
        }

        row.status = update.status;
        row.amount_paid = update.amount_paid;
        row.paid_at = update.paid_at;
        Ok(true)
    }

    fn mark_overdue(&self, today: NaiveDate) -> Result<Vec<MilestoneId>> {
        let mut store = self.write_milestones()?;
        let mut changed = Vec::new();

        for row in store.rows.values_mut() {
            if row.status == MilestoneStatus::Pending && row.due_date < today {
                row.status = MilestoneStatus::Overdue;
                changed.push(row.id);
            }
        }

        Ok(changed)
    }

    fn cancel_open(&self, booking_id: BookingId) -> Result<Vec<MilestoneId>> {
        let mut store = self.write_milestones()?;
        let ids = store.by_booking.get(&booking_id).cloned().unwrap_or_default();
        let mut changed = Vec::new();

        for id in ids {
            if let Some(row) = store.rows.get_mut(&id) {
                if row.status.is_open() {
                    row.status = MilestoneStatus::Cancelled;
                    changed.push(id);
                }
            }
        }

        Ok(changed)
    }
}

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::errors::{Result, ScheduleError};
use crate::rules::PaymentRule;
use crate::store::RuleStore;
use crate::types::RoomId;

/// selects the single payment rule that applies to a room on a date
pub struct RuleResolver<'a, S: RuleStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RuleStore + ?Sized> RuleResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// `None` means payment is flexible for this room and date
    pub fn resolve(
        &self,
        room_id: RoomId,
        reference_date: NaiveDate,
    ) -> Result<Option<PaymentRule>> {
        let mut candidates = self.store.active_rules(room_id, reference_date)?;

        match candidates.len() {
            0 => {
                debug!(%room_id, %reference_date, "no payment rule applies");
                Ok(None)
            }
            1 => {
                let record = candidates.remove(0);
                let rule = PaymentRule::try_from(record)?;
                debug!(
                    %room_id,
                    %reference_date,
                    rule_id = %rule.id,
                    rule_type = %rule.rule_type(),
                    "payment rule resolved"
                );
                Ok(Some(rule))
            }
            count => {
                error!(%room_id, %reference_date, count, "overlapping active payment rules");
                Err(ScheduleError::ResolutionConflict {
                    room_id,
                    date: reference_date,
                    count,
                })
            }
        }
    }
}

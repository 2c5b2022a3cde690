use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScheduleError};
use crate::rules::{
    AmountSpec, DepositTerms, DueSpec, PaymentPolicy, PaymentRule, ScheduleMilestoneConfig,
};
use crate::types::{AmountType, DueTiming, RoomId, RuleId, RuleType};

/// flat, string-typed rule row as a rule store keeps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    pub room_id: RoomId,
    pub name: String,
    pub rule_type: String,
    pub is_active: bool,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,

    // deposit rules
    pub deposit_amount: Option<Decimal>,
    pub deposit_type: Option<String>,
    pub deposit_due: Option<String>,
    pub deposit_due_days: Option<u32>,
    pub deposit_due_date: Option<NaiveDate>,
    // balance amount fields are kept for audit only, the balance is the remainder
    pub balance_amount: Option<Decimal>,
    pub balance_type: Option<String>,
    pub balance_due: Option<String>,
    pub balance_due_days: Option<u32>,
    pub balance_due_date: Option<NaiveDate>,

    // payment schedule rules
    #[serde(default)]
    pub milestones: Vec<MilestoneRecord>,
}

/// flat installment row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneRecord {
    pub sequence: u32,
    pub name: String,
    pub amount_type: String,
    pub amount: Decimal,
    pub due: String,
    pub days: Option<u32>,
    pub specific_date: Option<NaiveDate>,
}

impl RuleRecord {
    /// active and inside its validity window
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.valid_from.map_or(true, |from| date >= from)
            && self.valid_until.map_or(true, |until| date <= until)
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| ScheduleError::configuration(format!("{} is required", field)))
}

fn due_spec(due: &str, days: Option<u32>, specific_date: Option<NaiveDate>) -> Result<DueSpec> {
    Ok(DueSpec {
        due: due.parse::<DueTiming>()?,
        days,
        specific_date,
    })
}

impl TryFrom<RuleRecord> for PaymentRule {
    type Error = ScheduleError;

    fn try_from(record: RuleRecord) -> Result<Self> {
        let policy = match record.rule_type.parse::<RuleType>()? {
            RuleType::Flexible => PaymentPolicy::Flexible,
            RuleType::Deposit => {
                let deposit_type = required(record.deposit_type.as_deref(), "deposit_type")?;
                let deposit_amount = required(record.deposit_amount, "deposit_amount")?;
                let deposit_due = required(record.deposit_due.as_deref(), "deposit_due")?;
                let balance_due = required(record.balance_due.as_deref(), "balance_due")?;

                PaymentPolicy::Deposit(DepositTerms {
                    deposit: AmountSpec {
                        amount_type: deposit_type.parse::<AmountType>()?,
                        amount: deposit_amount,
                    },
                    deposit_due: due_spec(
                        deposit_due,
                        record.deposit_due_days,
                        record.deposit_due_date,
                    )?,
                    balance_due: due_spec(
                        balance_due,
                        record.balance_due_days,
                        record.balance_due_date,
                    )?,
                })
            }
            RuleType::PaymentSchedule => {
                let mut milestones = record
                    .milestones
                    .into_iter()
                    .map(|m| -> Result<ScheduleMilestoneConfig> {
                        Ok(ScheduleMilestoneConfig {
                            sequence: m.sequence,
                            amount: AmountSpec {
                                amount_type: m.amount_type.parse::<AmountType>()?,
                                amount: m.amount,
                            },
                            due: due_spec(&m.due, m.days, m.specific_date)?,
                            name: m.name,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                milestones.sort_by_key(|m| m.sequence);
                PaymentPolicy::PaymentSchedule(milestones)
            }
        };
        policy.validate_sequences()?;

        Ok(PaymentRule {
            id: record.id,
            room_id: record.room_id,
            name: record.name,
            valid_from: record.valid_from,
            valid_until: record.valid_until,
            policy,
        })
    }
}

impl From<&PaymentRule> for RuleRecord {
    fn from(rule: &PaymentRule) -> Self {
        let mut record = RuleRecord {
            id: rule.id,
            room_id: rule.room_id,
            name: rule.name.clone(),
            rule_type: rule.rule_type().as_str().to_string(),
            is_active: true,
            valid_from: rule.valid_from,
            valid_until: rule.valid_until,
            deposit_amount: None,
            deposit_type: None,
            deposit_due: None,
            deposit_due_days: None,
            deposit_due_date: None,
            balance_amount: None,
            balance_type: None,
            balance_due: None,
            balance_due_days: None,
            balance_due_date: None,
            milestones: Vec::new(),
        };

        match &rule.policy {
            PaymentPolicy::Flexible => {}
            PaymentPolicy::Deposit(terms) => {
                record.deposit_amount = Some(terms.deposit.amount);
                record.deposit_type = Some(terms.deposit.amount_type.as_str().to_string());
                record.deposit_due = Some(terms.deposit_due.due.as_str().to_string());
                record.deposit_due_days = terms.deposit_due.days;
                record.deposit_due_date = terms.deposit_due.specific_date;
                record.balance_due = Some(terms.balance_due.due.as_str().to_string());
                record.balance_due_days = terms.balance_due.days;
                record.balance_due_date = terms.balance_due.specific_date;
            }
            PaymentPolicy::PaymentSchedule(milestones) => {
                record.milestones = milestones
                    .iter()
                    .map(|m| MilestoneRecord {
                        sequence: m.sequence,
                        name: m.name.clone(),
                        amount_type: m.amount.amount_type.as_str().to_string(),
                        amount: m.amount.amount,
                        due: m.due.due.as_str().to_string(),
                        days: m.due.days,
                        specific_date: m.due.specific_date,
                    })
                    .collect();
            }
        }

        record
    }
}

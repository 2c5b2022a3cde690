use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{BookingId, MilestoneId, RoomId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// timing strategy missing a parameter, or an unrecognized enumerant
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
    },

    #[error("schedule configuration error: percentages sum to {sum}, expected 100")]
    ScheduleConfiguration {
        sum: rust_decimal::Decimal,
    },

    #[error("resolution conflict: {count} active rules for room {room_id} on {date}")]
    ResolutionConflict {
        room_id: RoomId,
        date: NaiveDate,
        count: usize,
    },

    #[error("persistence error: {message}")]
    Persistence {
        message: String,
    },

    #[error("schedule already exists for booking {booking_id}")]
    ScheduleAlreadyExists {
        booking_id: BookingId,
    },

    #[error("milestone not found: {id}")]
    MilestoneNotFound {
        id: MilestoneId,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("amount paid cannot decrease: recorded {recorded}, provided {provided}")]
    AmountPaidDecreased {
        recorded: Money,
        provided: Money,
    },

    #[error("milestone {id} kept changing while recording payment")]
    ConcurrentModification {
        id: MilestoneId,
    },
}

impl ScheduleError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ScheduleError::Configuration {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        ScheduleError::Persistence {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

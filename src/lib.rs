pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod milestone;
pub mod rules;
pub mod schedule;
pub mod serialization;
pub mod store;
pub mod types;

// re-export key types
pub use config::EngineConfig;
pub use decimal::Money;
pub use engine::PaymentScheduleEngine;
pub use errors::{Result, ScheduleError};
pub use events::{Event, EventStore};
pub use lifecycle::{transition, MilestoneLifecycle, PaymentOutcome};
pub use milestone::{Booking, PaymentScheduleMilestone};
pub use rules::{
    AmountSpec, DepositTerms, DueSpec, MilestoneRecord, PaymentPolicy, PaymentRule, RuleRecord,
    RuleResolver, ScheduleMilestoneConfig,
};
pub use schedule::{
    build_milestones, compute_amount, compute_due_date, GeneratedSchedule, ScheduleGenerator,
};
pub use serialization::{MilestoneView, ScheduleSummary, ScheduleView};
pub use store::{MemoryStore, MilestoneGuard, MilestoneStore, MilestoneUpdate, RuleStore};
pub use types::{
    AmountType, BookingId, DueTiming, MilestoneId, MilestoneStatus, RoomId, RuleId, RuleType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

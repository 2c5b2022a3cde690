pub mod amount;
pub mod due_date;
pub mod generator;

pub use amount::{amount_for, compute_amount};
pub use due_date::{compute_due_date, due_date_for};
pub use generator::{
    build_milestones, GeneratedSchedule, ScheduleGenerator, BALANCE_NAME, DEPOSIT_NAME,
};

/// quick start - generate a deposit schedule for one booking
use payment_schedule_rs::{
    AmountSpec, Booking, DueSpec, MemoryStore, Money, PaymentRule, PaymentScheduleEngine,
};
use payment_schedule_rs::chrono::NaiveDate;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 30% deposit at booking, balance a week before checkin
    let room = Uuid::new_v4();
    let store = MemoryStore::new();
    store.insert_rule(&PaymentRule::deposit(
        room,
        AmountSpec::percentage(dec!(30)),
        DueSpec::at_booking(),
        DueSpec::days_before_checkin(7),
    ))?;

    let mut engine = PaymentScheduleEngine::new(store);

    // confirm a booking and build its schedule
    let booking = Booking::new(
        room,
        NaiveDate::from_ymd_opt(2025, 1, 1).ok_or("invalid date")?,
        NaiveDate::from_ymd_opt(2025, 2, 1).ok_or("invalid date")?,
        Money::from_major(1_000),
        "EUR",
    );
    let milestones = engine.generate_schedule_now(&booking)?;

    // pay the deposit
    engine.record_payment_now(milestones[0].id, Money::from_major(300))?;

    // print current state
    println!("{}", engine.schedule_view(booking.id)?.to_json_pretty()?);

    Ok(())
}

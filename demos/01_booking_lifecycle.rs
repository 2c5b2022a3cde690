/// booking lifecycle - installments, partial payment, overdue sweep, cancellation
use payment_schedule_rs::{
    AmountSpec, Booking, DueSpec, MemoryStore, MilestoneStatus, Money, PaymentOutcome,
    PaymentRule, PaymentScheduleEngine, SafeTimeProvider, ScheduleMilestoneConfig, TimeSource,
};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== booking lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    // 50/30/20 installment plan
    let room = Uuid::new_v4();
    let store = MemoryStore::new();
    store.insert_rule(&PaymentRule::installments(
        room,
        vec![
            ScheduleMilestoneConfig {
                sequence: 1,
                name: "Reservation".to_string(),
                amount: AmountSpec::percentage(dec!(50)),
                due: DueSpec::at_booking(),
            },
            ScheduleMilestoneConfig {
                sequence: 2,
                name: "Second payment".to_string(),
                amount: AmountSpec::percentage(dec!(30)),
                due: DueSpec::days_after_booking(30),
            },
            ScheduleMilestoneConfig {
                sequence: 3,
                name: "Final payment".to_string(),
                amount: AmountSpec::percentage(dec!(20)),
                due: DueSpec::on_checkin(),
            },
        ],
    ))?;
    let mut engine = PaymentScheduleEngine::new(store);

    // 1. confirmation
    println!("1. booking confirmed");
    println!("--------------------");
    let booking = Booking::new(
        room,
        time.now().date_naive(),
        time.now().date_naive() + Duration::days(92),
        Money::from_major(2_000),
        "EUR",
    );
    let milestones = engine.generate_schedule(&booking, &time)?;
    for m in &milestones {
        println!("  {}: {} {} due {}", m.milestone_name, m.amount_due, m.currency, m.due_date);
    }

    // 2. reservation paid in two transfers
    println!("\n2. reservation payments");
    println!("-----------------------");
    let outcome = engine.record_payment(milestones[0].id, Money::from_major(400), &time)?;
    println!("  received 400, status = {}", outcome.status());
    controller.advance(Duration::days(2));
    let outcome = engine.record_payment(milestones[0].id, Money::from_major(1_000), &time)?;
    println!("  received 1000 in total, status = {}", outcome.status());

    // 3. second payment missed
    println!("\n3. overdue sweep");
    println!("----------------");
    controller.advance(Duration::days(30));
    let today = time.now().date_naive();
    let moved = engine.sweep_overdue(today)?;
    println!("  {}: {} milestone(s) now overdue", today, moved);
    println!("  repeated sweep moves {}", engine.sweep_overdue(today)?);

    let summary = engine.schedule_summary(booking.id)?;
    println!("  outstanding: {}", summary.outstanding);
    if let Some(next) = &summary.next_due {
        println!("  next due: {} ({})", next.name, next.status);
    }

    // 4. late payment on a settled milestone is ignored
    println!("\n4. late correction");
    println!("------------------");
    match engine.record_payment(milestones[0].id, Money::from_major(1_100), &time)? {
        PaymentOutcome::Ignored { milestone } => {
            println!("  ignored, milestone stays {}", milestone.status)
        }
        PaymentOutcome::Applied { milestone, .. } => {
            println!("  applied, status = {}", milestone.status)
        }
    }

    // 5. guest cancels
    println!("\n5. cancellation");
    println!("---------------");
    let cancelled = engine.cancel_schedule(booking.id, &time)?;
    println!("  {} open milestone(s) cancelled", cancelled);
    for m in engine.get_schedule(booking.id)? {
        let marker = if m.status == MilestoneStatus::Paid { "✓" } else { "✗" };
        println!("  {} {} {}", marker, m.milestone_name, m.status);
    }

    println!("\nevents:");
    for event in engine.events.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}

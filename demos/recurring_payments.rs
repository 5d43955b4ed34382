//! Recurring payments example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use recurring_core::{
    init_tracing, CustomHoliday, DateAdjustmentPolicy, DayOfMonthPattern, DefinitionBuilder,
    MemoryStorage, RecurringPaymentLedger, SchedulerConfig,
};

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| format!("invalid date {y}-{m}-{d}").into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    println!("📅 Recurring Core - Recurring Payments Example\n");

    let storage = MemoryStorage::new();
    storage.add_category("household")?;
    storage.add_custom_holiday(CustomHoliday::new(
        date(2025, 12, 30)?,
        "Office closed".to_string(),
        true,
    ))?;

    let config = SchedulerConfig::default().with_horizon_months(12);
    let mut ledger = RecurringPaymentLedger::with_config(storage, config)?;

    // 1. Define recurring payments
    println!("🗂  Creating definitions...");
    let rent = DefinitionBuilder::new(
        "rent".to_string(),
        "Rent".to_string(),
        BigDecimal::from(80000),
        1,
        date(2025, 1, 27)?,
    )
    .day_of_month(DayOfMonthPattern::LastBusinessDayMinus(2))
    .category("household".to_string())
    .build()?;

    let car_tax = DefinitionBuilder::new(
        "car-tax".to_string(),
        "Car tax".to_string(),
        BigDecimal::from(45000),
        12,
        date(2025, 5, 31)?,
    )
    .day_of_month(DayOfMonthPattern::EndOfMonth)
    .adjustment(DateAdjustmentPolicy::MoveToPreviousBusinessDay)
    .lead_time_months(6)
    .evenly_distributed_savings()
    .category("household".to_string())
    .build()?;

    ledger.create_definition(rent).await?;
    ledger.create_definition(car_tax).await?;
    println!("  ✓ Rent and car tax defined\n");

    // 2. Generate occurrences
    let reference = date(2025, 1, 1)?;
    for id in ["rent", "car-tax"] {
        let plan = ledger.synchronize(id, reference).await?;
        println!("📌 {} ({} occurrences):", id, plan.occurrences.len());
        for occurrence in &plan.occurrences {
            println!(
                "  {} ¥{} {:?}",
                occurrence.scheduled_date, occurrence.expected_amount, occurrence.status
            );
        }
        println!();
    }

    // 3. Put money aside for the car tax
    println!("💰 Saving for the car tax...");
    for month in 1..=5 {
        let balance = ledger.record_monthly_savings("car-tax", 2025, month).await?;
        println!("  2025-{:02}: saved ¥{}", month, balance.total_saved_amount);
    }

    // 4. Pay it
    let occurrences = ledger.list_occurrences("car-tax").await?;
    if let Some(first) = occurrences.first() {
        let difference = ledger
            .complete_occurrence(
                &first.id,
                first.scheduled_date,
                BigDecimal::from(46000),
                Some("bank-2025-05-30".to_string()),
            )
            .await?;
        println!(
            "\n🧾 Paid ¥{} against ¥{} ({:?} by ¥{})",
            difference.actual, difference.expected, difference.difference_type, difference.difference
        );
    }

    if let Some(balance) = ledger.get_balance("car-tax").await? {
        println!(
            "  Saved ¥{}, paid ¥{}, balance ¥{}",
            balance.total_saved_amount,
            balance.total_paid_amount,
            balance.balance()
        );
    }

    // 5. Synchronize again after the payment
    let plan = ledger.synchronize("car-tax", date(2025, 6, 1)?).await?;
    println!(
        "\n🔄 Resynchronized: {} locked, {} created, {} updated, {} removed",
        plan.locked.len(),
        plan.created.len(),
        plan.updated.len(),
        plan.removed.len()
    );

    let stats = ledger.balance_cache_stats();
    println!(
        "\n📈 Balance cache: {} hits, {} misses, {} invalidations",
        stats.hits, stats.misses, stats.invalidations
    );

    Ok(())
}

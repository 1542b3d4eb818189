//! # Order Editing Demo
//!
//! Walks through the delta-kit workflow on the generated order domain:
//!
//! 1. **Builders**: create an order and edit it without copying untouched data
//! 2. **Deltas**: commit edits and ship the resulting deltas to a replica
//! 3. **Journal**: merge several edits into one delta per order
//! 4. **Deletion**: remove an order and replay the removal
//!
//! Run: `RUST_LOG=debug cargo run -p delta-example-orders`

use std::sync::Arc;

use delta_example_orders::time::Timestamp;
use delta_example_orders::{Customer, Journal, OrderBook, Status, Tier};
use delta_kit::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> delta_kit::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Order Editing Demo ===\n");

    let mut primary = OrderBook::new();
    let mut replica = OrderBook::new();

    demo_builders(&mut primary, &mut replica)?;
    demo_journal(&mut primary, &mut replica)?;
    demo_deletion(&mut primary, &mut replica)?;

    println!("\n=== Done! ===");
    Ok(())
}

// ── Section 1: Builders and deltas ───────────────────────────────

fn demo_builders(primary: &mut OrderBook, replica: &mut OrderBook) -> delta_kit::Result<()> {
    println!("1. Creating and editing an order...\n");

    let mut customer = Customer::builder(7);
    customer
        .set_name("Grace Hopper".into())
        .set_email("grace@example.com".into())
        .set_tier(Tier::Gold);

    let mut draft = primary.edit(100);
    draft.set_customer(Some(customer));
    draft.put_line(1, "KEYBOARD", 1, 8_900);
    draft.put_line(2, "CABLE", 3, 450);
    draft.tags_mut().insert("priority".into());

    let created = primary
        .commit(&draft)?
        .expect("a new order always produces a delta");
    println!("   ADD delta: {created:?}\n");
    replica.apply(&created)?;

    let before = Arc::clone(primary.get(100).expect("order was committed"));
    let mut edit = primary.edit(100);
    edit.place(Timestamp::from_millis(1_700_000_000_000));
    edit.set_line_quantity(2, 5);
    edit.notes_mut()
        .insert("gift".into(), "wrap in blue paper".into());

    let updated = primary.commit(&edit)?.expect("the edit changed the order");
    println!("   UPDATE delta: {updated:?}\n");
    replica.apply(&updated)?;

    let after = primary.get(100).expect("order is still stored");
    println!(
        "   Customer shared between versions: {}",
        match (before.customer(), after.customer()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    );
    println!("   Total: {} cents", after.total_cents());
    assert_eq!(primary, replica);
    info!(orders = replica.len(), "replica in sync");
    Ok(())
}

// ── Section 2: Journal ───────────────────────────────────────────

fn demo_journal(primary: &mut OrderBook, replica: &mut OrderBook) -> delta_kit::Result<()> {
    println!("\n2. Batching edits with a journal...\n");

    let mut journal = Journal::new();

    let mut first = primary.edit(100);
    first.tags_mut().insert("express".into());
    if let Some(delta) = primary.commit(&first)? {
        journal.record(&delta)?;
    }

    let mut second = primary.edit(100);
    second.tags_mut().remove("priority");
    second.set_status(Status::Shipped);
    if let Some(delta) = primary.commit(&second)? {
        journal.record(&delta)?;
    }

    let mut other = primary.edit(200);
    other.put_line(1, "MOUSE", 1, 2_500);
    if let Some(delta) = primary.commit(&other)? {
        journal.record(&delta)?;
    }

    let batch = journal.drain();
    println!("   {} edits merged into {} deltas", 3, batch.len());
    for delta in &batch {
        println!("   {} order {}", delta.delta_type(), delta.id());
        replica.apply(delta)?;
    }
    assert_eq!(primary, replica);
    Ok(())
}

// ── Section 3: Deletion ──────────────────────────────────────────

fn demo_deletion(primary: &mut OrderBook, replica: &mut OrderBook) -> delta_kit::Result<()> {
    println!("\n3. Cancelling and deleting an order...\n");

    let snapshot = primary.clone();
    let order = Arc::clone(primary.get(200).expect("order 200 exists"));
    let delete = order
        .to_delta(DeltaType::Delete)?
        .expect("delete deltas are never empty");
    primary.apply(&delete)?;
    println!("   Primary now holds {} order(s)", primary.len());

    let catch_up = primary.diff(&snapshot)?;
    for delta in &catch_up {
        println!("   catch-up: {} order {}", delta.delta_type(), delta.id());
        replica.apply(delta)?;
    }
    assert_eq!(primary, replica);
    info!(orders = replica.len(), "replica in sync after deletion");
    Ok(())
}

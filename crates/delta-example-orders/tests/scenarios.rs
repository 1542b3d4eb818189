//! End-to-end editing and replication scenarios on the order domain.

use std::sync::Arc;

use delta_example_orders::time::Timestamp;
use delta_example_orders::*;
use delta_kit::prelude::*;

fn customer(id: u64, name: &str, email: &str) -> CustomerBuilder {
    let mut builder = Customer::builder(id);
    builder.set_name(name.into()).set_email(email.into());
    builder
}

fn seeded() -> OrderBook {
    let mut book = OrderBook::new();
    let mut draft = book.edit(1);
    draft.set_customer(Some(customer(7, "Grace", "grace@example.com")));
    draft.put_line(1, "KEYBOARD", 1, 8_900);
    draft.put_line(2, "CABLE", 3, 450);
    draft.tags_mut().insert("priority".into());
    draft.notes_mut().insert("gift".into(), "yes".into());
    book.commit(&draft).unwrap();
    book
}

#[test]
fn replica_follows_committed_deltas() {
    let mut primary = OrderBook::new();
    let mut replica = OrderBook::new();

    let mut draft = primary.edit(1);
    draft.put_line(1, "KEYBOARD", 1, 8_900);
    replica.apply(&primary.commit(&draft).unwrap().unwrap()).unwrap();

    let mut edit = primary.edit(1);
    edit.place(Timestamp::from_millis(1_000));
    edit.put_line(2, "CABLE", 2, 450);
    replica.apply(&primary.commit(&edit).unwrap().unwrap()).unwrap();

    assert_eq!(primary, replica);
    let order = replica.get(1).unwrap();
    assert_eq!(*order.status(), Status::Placed);
    assert_eq!(order.placed_at(), &Some(Timestamp::from_millis(1_000)));
    assert_eq!(order.total_cents(), 8_900 + 900);
}

#[test]
fn editing_a_line_only_ships_that_line() {
    let book = seeded();
    let mut edit = book.edit(1);
    assert!(edit.set_line_quantity(2, 4));
    let delta = edit.reconcile().unwrap().unwrap();

    assert!(!delta.has_tags());
    assert!(!delta.has_customer());
    let lines = delta.lines_flatten();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].id(), &LineKey { order: 1, line: 2 });
    assert_eq!(lines[0].quantity(), Some(&4));
    assert!(!lines[0].has_sku());
}

#[test]
fn customer_edit_is_a_nested_update() {
    let book = seeded();
    let mut edit = book.edit(1);
    edit.customer_mut()
        .as_mut()
        .unwrap()
        .set_email("hopper@example.com".into());
    let delta = edit.reconcile().unwrap().unwrap();

    let nested = delta.customer().unwrap();
    assert_eq!(nested.delta_type(), DeltaType::Update);
    assert_eq!(nested.email(), Some(&"hopper@example.com".to_string()));
    assert!(!nested.has_name());
}

#[test]
fn replacing_the_customer_reports_only_the_new_one() {
    let mut book = seeded();
    let mut edit = book.edit(1);
    edit.set_customer(Some(customer(8, "Ada", "ada@example.com")));
    let delta = book.commit(&edit).unwrap().unwrap();

    let nested = delta.customer().unwrap();
    assert_eq!(nested.delta_type(), DeltaType::Add);
    assert_eq!(*nested.id(), 8);

    let mut replica = seeded();
    replica.apply(&delta).unwrap();
    assert_eq!(replica, book);
}

#[test]
fn removing_a_line_ships_a_delete_pair() {
    let mut book = seeded();
    let mut edit = book.edit(1);
    assert!(edit.remove_line(1));
    let delta = book.commit(&edit).unwrap().unwrap();

    let pairs = delta.lines().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].delta_type(), DeltaType::Delete);
    assert_eq!(pairs[0].key(), &LineKey { order: 1, line: 1 });

    let mut replica = seeded();
    replica.apply(&delta).unwrap();
    assert_eq!(replica, book);
    assert_eq!(replica.get(1).unwrap().lines().len(), 1);
}

#[test]
fn clearing_an_opaque_value() {
    let mut book = seeded();
    let mut edit = book.edit(1);
    edit.place(Timestamp::from_millis(5));
    book.commit(&edit).unwrap();

    let mut edit = book.edit(1);
    edit.set_placed_at(None);
    let delta = book.commit(&edit).unwrap().unwrap();
    assert_eq!(delta.placed_at(), Some(&None));
    assert_eq!(book.get(1).unwrap().placed_at(), &None);
}

#[test]
fn untouched_parts_are_shared_between_versions() {
    let mut book = seeded();
    let before = Arc::clone(book.get(1).unwrap());
    let mut edit = book.edit(1);
    edit.set_status(Status::Cancelled);
    book.commit(&edit).unwrap();
    let after = book.get(1).unwrap();

    assert!(Arc::ptr_eq(after.lines(), before.lines()));
    assert!(Arc::ptr_eq(after.tags(), before.tags()));
    assert!(Arc::ptr_eq(
        after.customer().as_ref().unwrap(),
        before.customer().as_ref().unwrap()
    ));
}

#[test]
fn journal_merges_edits_into_one_delta() {
    let mut primary = seeded();
    let mut replica = seeded();
    let mut journal = Journal::new();

    let mut first = primary.edit(1);
    first.tags_mut().insert("express".into());
    first.set_line_quantity(1, 2);
    journal.record(&primary.commit(&first).unwrap().unwrap()).unwrap();

    let mut second = primary.edit(1);
    second.tags_mut().remove("express");
    second.set_status(Status::Shipped);
    second.set_line_quantity(1, 3);
    journal.record(&primary.commit(&second).unwrap().unwrap()).unwrap();

    let batch = journal.drain();
    assert_eq!(batch.len(), 1);
    let merged = &batch[0];
    assert_eq!(merged.delta_type(), DeltaType::Update);
    assert_eq!(merged.status(), Some(&Status::Shipped));
    assert_eq!(
        merged.tags(),
        Some(&vec![KeyDelta::new(DeltaType::Delete, "express".to_string())])
    );
    assert_eq!(merged.lines_flatten()[0].quantity(), Some(&3));

    replica.apply(merged).unwrap();
    assert_eq!(replica, primary);
}

#[test]
fn created_then_deleted_order_collapses_to_delete() {
    let mut primary = OrderBook::new();
    let mut journal = Journal::new();

    let mut draft = primary.edit(9);
    draft.put_line(1, "MUG", 1, 1_200);
    journal.record(&primary.commit(&draft).unwrap().unwrap()).unwrap();

    let order = Arc::clone(primary.get(9).unwrap());
    let delete = order.to_delta(DeltaType::Delete).unwrap().unwrap();
    primary.apply(&delete).unwrap();
    journal.record(&delete).unwrap();

    let batch = journal.drain();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].delta_type(), DeltaType::Delete);

    let mut replica = OrderBook::new();
    replica.apply(&batch[0]).unwrap();
    assert!(replica.is_empty());
    assert_eq!(replica, primary);
}

#[test]
fn created_then_edited_order_stays_an_add() {
    let mut primary = OrderBook::new();
    let mut journal = Journal::new();

    let mut draft = primary.edit(3);
    draft.put_line(1, "PEN", 10, 150);
    journal.record(&primary.commit(&draft).unwrap().unwrap()).unwrap();

    let mut edit = primary.edit(3);
    edit.set_line_quantity(1, 12);
    edit.tags_mut().insert("bulk".into());
    journal.record(&primary.commit(&edit).unwrap().unwrap()).unwrap();

    let batch = journal.drain();
    assert_eq!(batch[0].delta_type(), DeltaType::Add);

    let mut replica = OrderBook::new();
    replica.apply(&batch[0]).unwrap();
    assert_eq!(replica, primary);
}

#[test]
fn book_diff_catches_a_replica_up() {
    let snapshot = seeded();
    let mut primary = snapshot.clone();

    let mut edit = primary.edit(1);
    edit.set_status(Status::Placed);
    primary.commit(&edit).unwrap();

    let mut fresh = primary.edit(2);
    fresh.put_line(1, "LAMP", 1, 3_000);
    primary.commit(&fresh).unwrap();

    let deltas = primary.diff(&snapshot).unwrap();
    let kinds: Vec<_> = deltas.iter().map(|d| (*d.id(), d.delta_type())).collect();
    assert_eq!(kinds, vec![(1, DeltaType::Update), (2, DeltaType::Add)]);

    let mut replica = snapshot.clone();
    for delta in &deltas {
        replica.apply(delta).unwrap();
    }
    assert_eq!(replica, primary);
    assert!(primary.diff(&replica).unwrap().is_empty());
}

#[test]
fn delta_for_another_order_is_rejected() {
    let book = seeded();
    let mut other = Order::builder(2);
    other.set_status(Status::Placed);
    let foreign = other.reconcile().unwrap().unwrap();

    let mut edit = book.edit(1);
    let err = edit.apply_delta(&foreign).unwrap_err();
    assert!(matches!(err, DeltaError::IdentityMismatch { .. }));
    assert!(err.to_string().contains("apply_delta"));
}

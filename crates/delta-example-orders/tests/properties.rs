//! Property tests: any sequence of edits survives diff-then-patch, merging
//! and replication.

use std::sync::Arc;

use delta_example_orders::time::Timestamp;
use delta_example_orders::*;
use delta_kit::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Status(Status),
    Tag { name: u8, present: bool },
    Note { key: u8, text: Option<String> },
    PutLine { line: u32, quantity: u32, price: u64 },
    Quantity { line: u32, quantity: u32 },
    RemoveLine { line: u32 },
    BareLine { line: u32 },
    Customer(Option<u64>),
    BareCustomer(u64),
    Email(String),
    PlacedAt(Option<u64>),
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Draft),
        Just(Status::Placed),
        Just(Status::Shipped),
        Just(Status::Cancelled),
    ]
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        arb_status().prop_map(Edit::Status),
        (0u8..6, any::<bool>()).prop_map(|(name, present)| Edit::Tag { name, present }),
        (0u8..4, proptest::option::of("[a-z]{0,6}"))
            .prop_map(|(key, text)| Edit::Note { key, text }),
        (0u32..5, 1u32..20, 1u64..10_000)
            .prop_map(|(line, quantity, price)| Edit::PutLine { line, quantity, price }),
        (0u32..5, 1u32..20).prop_map(|(line, quantity)| Edit::Quantity { line, quantity }),
        (0u32..5).prop_map(|line| Edit::RemoveLine { line }),
        (0u32..5).prop_map(|line| Edit::BareLine { line }),
        proptest::option::of(1u64..4).prop_map(Edit::Customer),
        (1u64..4).prop_map(Edit::BareCustomer),
        "[a-z]{1,8}".prop_map(Edit::Email),
        proptest::option::of(0u64..1_000).prop_map(Edit::PlacedAt),
    ]
}

fn apply_edit(builder: &mut OrderBuilder, edit: &Edit) {
    match edit {
        Edit::Status(status) => {
            builder.set_status(*status);
        }
        Edit::Tag { name, present } => {
            let tag = format!("tag-{name}");
            if *present {
                builder.tags_mut().insert(tag);
            } else {
                builder.tags_mut().remove(&tag);
            }
        }
        Edit::Note { key, text } => {
            let key = format!("note-{key}");
            match text {
                Some(text) => {
                    builder.notes_mut().insert(key, text.clone());
                }
                None => {
                    builder.notes_mut().remove(&key);
                }
            }
        }
        Edit::PutLine {
            line,
            quantity,
            price,
        } => {
            builder.put_line(*line, &format!("SKU-{line}"), *quantity, *price);
        }
        Edit::Quantity { line, quantity } => {
            builder.set_line_quantity(*line, *quantity);
        }
        Edit::RemoveLine { line } => {
            builder.remove_line(*line);
        }
        Edit::BareLine { line } => {
            let key = LineKey {
                order: *builder.id(),
                line: *line,
            };
            builder.lines_mut().insert(key.clone(), LineItem::builder(key));
        }
        Edit::BareCustomer(id) => {
            builder.set_customer(Some(Customer::builder(*id)));
        }
        Edit::Customer(id) => {
            builder.set_customer(id.map(|id| {
                let mut customer = Customer::builder(id);
                customer.set_name(format!("customer {id}"));
                customer
            }));
        }
        Edit::Email(email) => {
            if let Some(customer) = builder.customer_mut().as_mut() {
                customer.set_email(email.clone());
            }
        }
        Edit::PlacedAt(at) => {
            builder.set_placed_at(at.map(Timestamp::from_millis));
        }
    }
}

fn edited(base: &Arc<Order>, edits: &[Edit]) -> Arc<Order> {
    let mut builder = base.to_builder();
    for edit in edits {
        apply_edit(&mut builder, edit);
    }
    builder.build().unwrap()
}

fn build_from(edits: &[Edit]) -> Arc<Order> {
    let mut builder = Order::builder(1);
    for edit in edits {
        apply_edit(&mut builder, edit);
    }
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn prop_untouched_round_trip_is_identity(edits in prop::collection::vec(arb_edit(), 0..12)) {
        let order = build_from(&edits);
        let rebuilt = order.to_builder().build().unwrap();
        prop_assert!(Arc::ptr_eq(&rebuilt, &order));
    }

    #[test]
    fn prop_diff_then_patch(
        setup in prop::collection::vec(arb_edit(), 0..12),
        edits in prop::collection::vec(arb_edit(), 0..12),
    ) {
        let base = build_from(&setup);
        let target = edited(&base, &edits);

        let delta = target.to_builder().reconcile_against(DeltaType::Update, &base).unwrap();
        let mut patched = base.to_builder();
        if let Some(delta) = &delta {
            patched.apply_delta(delta).unwrap();
        } else {
            prop_assert_eq!(&target, &base);
        }
        prop_assert_eq!(patched.build().unwrap(), target);
    }

    #[test]
    fn prop_builder_reconcile_matches_model_diff(
        setup in prop::collection::vec(arb_edit(), 0..12),
        edits in prop::collection::vec(arb_edit(), 0..12),
    ) {
        let base = build_from(&setup);
        let mut builder = base.to_builder();
        for edit in &edits {
            apply_edit(&mut builder, edit);
        }
        let from_builder = builder.reconcile().unwrap();
        let target = builder.build().unwrap();

        let mut patched = base.to_builder();
        if let Some(delta) = &from_builder {
            patched.apply_delta(delta).unwrap();
        }
        prop_assert_eq!(patched.build().unwrap(), target);
    }

    #[test]
    fn prop_add_delta_rebuilds_model(edits in prop::collection::vec(arb_edit(), 0..12)) {
        let order = build_from(&edits);
        let add = order.to_delta(DeltaType::Add).unwrap().unwrap();
        prop_assert_eq!(add.to_builder().unwrap().build().unwrap(), order);
    }

    #[test]
    fn prop_merged_deltas_equal_sequential(
        setup in prop::collection::vec(arb_edit(), 0..8),
        first in prop::collection::vec(arb_edit(), 1..8),
        second in prop::collection::vec(arb_edit(), 1..8),
    ) {
        let base = build_from(&setup);
        let middle = edited(&base, &first);
        let end = edited(&middle, &second);

        let d1 = middle.to_builder().reconcile_against(DeltaType::Update, &base).unwrap();
        let d2 = end.to_builder().reconcile_against(DeltaType::Update, &middle).unwrap();

        let mut merged = Order::delta_builder(DeltaType::Update, 1);
        for delta in d1.iter().chain(d2.iter()) {
            merged.add_delta(delta).unwrap();
        }

        let mut patched = base.to_builder();
        if let Some(delta) = merged.build_delta() {
            patched.apply_delta(&delta).unwrap();
        }
        prop_assert_eq!(patched.build().unwrap(), end);
    }

    #[test]
    fn prop_merged_chain_from_add_rebuilds_end(
        setup in prop::collection::vec(arb_edit(), 0..8),
        first in prop::collection::vec(arb_edit(), 1..8),
        second in prop::collection::vec(arb_edit(), 1..8),
    ) {
        let base = build_from(&setup);
        let middle = edited(&base, &first);
        let end = edited(&middle, &second);

        let mut merged = base.to_delta(DeltaType::Add).unwrap().unwrap().to_delta_builder();
        for (from, to) in [(&base, &middle), (&middle, &end)] {
            if let Some(delta) = to.to_builder().reconcile_against(DeltaType::Update, from).unwrap() {
                merged.add_delta(&delta).unwrap();
            }
        }
        let merged = merged.build_delta().unwrap();
        prop_assert_eq!(merged.delta_type(), DeltaType::Add);

        let mut replica = Order::builder(1);
        replica.apply_delta(&merged).unwrap();
        prop_assert_eq!(replica.build().unwrap(), end);
    }

    #[test]
    fn prop_replica_converges(steps in prop::collection::vec(prop::collection::vec(arb_edit(), 1..5), 1..6)) {
        let mut primary = OrderBook::new();
        let mut replica = OrderBook::new();
        for step in &steps {
            let mut builder = primary.edit(1);
            for edit in step {
                apply_edit(&mut builder, edit);
            }
            if let Some(delta) = primary.commit(&builder).unwrap() {
                replica.apply(&delta).unwrap();
            }
        }
        prop_assert_eq!(replica, primary);
    }
}

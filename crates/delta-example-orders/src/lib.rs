//! # Order Editing Example
//!
//! An order domain declared in `orders.toml` and generated into
//! `src/generated/` by delta-codegen, plus a small in-memory [`OrderBook`]
//! that keeps replicas in sync by shipping deltas instead of whole orders.
//!
//! ```
//! use delta_example_orders::{OrderBook, Status};
//! use delta_kit::prelude::*;
//!
//! let mut primary = OrderBook::new();
//! let mut draft = primary.edit(1);
//! draft.put_line(1, "KB-01", 2, 4_500);
//! let created = primary.commit(&draft).unwrap().unwrap();
//! assert_eq!(created.delta_type(), DeltaType::Add);
//!
//! let mut replica = OrderBook::new();
//! replica.apply(&created).unwrap();
//! assert_eq!(replica.get(1), primary.get(1));
//! assert_eq!(replica.get(1).map(|o| o.total_cents()), Some(9_000));
//! assert_eq!(replica.get(1).map(|o| *o.status()), Some(Status::Draft));
//! ```

mod book;
pub mod generated;
pub mod time;

pub use book::{Journal, OrderBook};
pub use generated::*;

impl LineItem {
    /// Quantity times unit price.
    pub fn total_cents(&self) -> u64 {
        u64::from(*self.quantity()) * self.unit_price_cents()
    }
}

impl Order {
    /// Sum of all line totals.
    pub fn total_cents(&self) -> u64 {
        self.lines().values().map(|line| line.total_cents()).sum()
    }
}

impl OrderBuilder {
    /// Insert or replace the line numbered `line`.
    pub fn put_line(
        &mut self,
        line: u32,
        sku: &str,
        quantity: u32,
        unit_price_cents: u64,
    ) -> &mut Self {
        let key = LineKey {
            order: *self.id(),
            line,
        };
        let mut item = LineItem::builder(key.clone());
        item.set_sku(sku.to_string())
            .set_quantity(quantity)
            .set_unit_price_cents(unit_price_cents);
        self.lines_mut().insert(key, item);
        self
    }

    /// Change the quantity of an existing line; returns whether it exists.
    pub fn set_line_quantity(&mut self, line: u32, quantity: u32) -> bool {
        let key = LineKey {
            order: *self.id(),
            line,
        };
        match self.lines_mut().get_mut(&key) {
            Some(item) => {
                item.set_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Remove a line; returns whether it existed.
    pub fn remove_line(&mut self, line: u32) -> bool {
        let key = LineKey {
            order: *self.id(),
            line,
        };
        self.lines_mut().remove(&key).is_some()
    }

    /// Mark the order as placed at `at`.
    pub fn place(&mut self, at: time::Timestamp) -> &mut Self {
        self.set_status(Status::Placed).set_placed_at(Some(at))
    }
}

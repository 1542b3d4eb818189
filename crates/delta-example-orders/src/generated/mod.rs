// @generated by delta-codegen. Do not edit by hand.

mod enums;
mod keys;
mod customer;
mod line_item;
mod order;

pub use crate::time::Timestamp;
pub use enums::*;
pub use keys::*;
pub use customer::*;
pub use line_item::*;
pub use order::*;

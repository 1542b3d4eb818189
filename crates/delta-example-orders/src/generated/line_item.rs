// @generated by delta-codegen. Do not edit by hand.

#[allow(unused_imports)]
use super::*;
use delta_kit::prelude::*;

/// The `LineItem` model.
///
/// Schema fingerprint: `0x9fae5484a26a956b`.
#[model(fingerprint = 11506227026615506283)]
pub struct LineItem {
    #[key]
    id: LineKey,
    sku: Scalar<String>,
    quantity: Scalar<u32>,
    unit_price_cents: Scalar<u64>,
}

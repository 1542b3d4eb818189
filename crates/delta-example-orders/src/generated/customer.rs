// @generated by delta-codegen. Do not edit by hand.

#[allow(unused_imports)]
use super::*;
use delta_kit::prelude::*;

/// The `Customer` model.
///
/// Schema fingerprint: `0x446df47a2431cbe3`.
#[model(fingerprint = 4930865972470991843)]
pub struct Customer {
    #[key]
    id: u64,
    name: Scalar<String>,
    email: Scalar<String>,
    tier: Scalar<Tier>,
}

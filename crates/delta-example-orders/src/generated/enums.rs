// @generated by delta-codegen. Do not edit by hand.

/// The `Status` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Status {
    #[default]
    Draft,
    Placed,
    Shipped,
    Cancelled,
}

/// The `Tier` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Tier {
    #[default]
    Standard,
    Gold,
}

pub(crate) mod identifiers;
pub(crate) mod operations;
pub(crate) mod registry;

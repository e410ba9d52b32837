mod load;
mod parse;
mod release;

pub use load::load_catalog;
pub use release::{Catalog, Release, UNKNOWN_GROUP};

#[cfg(test)]
pub(crate) use release::test_release;

//! Object identities and catalog metadata

mod object;

pub use object::*;

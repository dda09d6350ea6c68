//! Data source nodes

pub mod array;

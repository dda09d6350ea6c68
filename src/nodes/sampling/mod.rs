//! Sampling and distribution nodes

pub mod shuffle;

//! MECE validation — proves a partition is mutually exclusive and
//! collectively exhaustive over its Universe, with diagnosable failures.

pub mod mece;

pub use mece::{MeceValidator, SegmentMembership};

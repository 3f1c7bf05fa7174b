//! Segment scoring — five weighted business dimensions per segment,
//! combined into one priority ranking.

pub mod scorer;

pub use scorer::SegmentScorer;

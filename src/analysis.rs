//! Analysis of processed customer data.
//!
//! - [`statistics`]: per-column descriptive statistics
//! - [`churn`]: churn rate overall and by segment
//! - [`correlation`]: Pearson correlation matrix and strongly related pairs
//! - [`segmentation`]: k-means clustering into customer segments

pub mod churn;
pub mod correlation;
pub mod segmentation;
pub mod statistics;

pub use churn::{SegmentChurn, churn_by_segment, churn_rate};
pub use correlation::{CorrelationMatrix, CorrelationPair, correlation_matrix};
pub use segmentation::{SegmentProfile, Segmentation, segment_customers};
pub use statistics::{NumericSummary, describe_numeric};

//! Spot Fleet request synthesis and merging.
//!
//! Each fleet becomes one [`RequestSpecification`] through [`synthesize`].
//! [`merge`] then combines the requests of all fleets into a single
//! [`ConfigurationMapping`] keyed by Deadline group, which is what the Spot
//! Event Plugin reads to decide which fleet to scale for a job.

mod merge;
mod request;

pub use merge::*;
pub use request::*;

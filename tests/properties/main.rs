//! Property test suite entry point.

mod proposal_properties;

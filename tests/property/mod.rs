//! Property-based tests
//!
//! Uses proptest to generate random event orders and verify the
//! reconciliation guarantees

//! Store integration tests: writer round trips, malformed inputs and the
//! structured-text variant.

mod json_test;
mod malformed_test;

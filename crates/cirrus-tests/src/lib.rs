//! Integration test suite for the Cirrus operator tools.
//!
//! The tests in `tests/` drive the wallet and monitor crates end to end,
//! either against the in-memory fake node or against a mock REST node
//! served over real HTTP, and check the selection and amount properties
//! under randomized inputs.

pub mod helpers;

//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below maps to a file that exercises one part of the controller
//! against the mock GPIO bank and scripted spotters in `mock_hw`. Nothing
//! here needs a Raspberry Pi or a microphone.

mod mock_hw;
mod teardown_tests;

//! Integration test suite entry point.

mod local_stack_tests;
mod package_tests;
mod publisher_tests;
mod review_tests;

//! Shared test utilities for packmind.
//!
//! Public so integration tests under `tests/` can use the same factories,
//! fakes and log capture as the unit tests.

pub mod factories;
pub mod fakes;
pub mod fixtures;
pub mod logging;

/// Table-driven test case structure.
#[derive(Debug, Clone)]
pub struct TestCase<I, E> {
    pub name: &'static str,
    pub input: I,
    pub expected: E,
}

/// Run every case and report the first mismatch.
pub fn run_table_tests<I, E, F>(cases: Vec<TestCase<I, E>>, test_fn: F) -> Result<(), String>
where
    I: std::fmt::Debug + Clone,
    E: std::fmt::Debug + PartialEq,
    F: Fn(I) -> E,
{
    for case in cases {
        let actual = test_fn(case.input.clone());
        if actual != case.expected {
            return Err(format!(
                "Test '{}' failed for input {:?}: expected {:?}, got {:?}",
                case.name, case.input, case.expected, actual
            ));
        }
        println!("[TEST] PASSED: {}", case.name);
    }
    Ok(())
}

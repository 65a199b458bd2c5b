//! Regression test parameters and operations

use ndarray::ArrayD;
use std::fmt::Debug;

/// Regression test mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Compare results with expectations (default)
    #[default]
    Compare,
    /// Compare, and also dump every compared array to stderr
    Display,
}

impl RegTestMode {
    /// Parse mode from the `REGTEST_MODE` environment variable
    pub fn from_env() -> Self {
        match std::env::var("REGTEST_MODE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "display" => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// Regression test parameters
///
/// Tracks the state of a regression test: the test name, current index,
/// mode, and the failures recorded so far. Comparisons never panic; call
/// [`RegParams::cleanup`] at the end and assert on its result.
pub struct RegParams {
    /// Name of the test (e.g., "expand")
    pub test_name: String,
    /// Current test index (incremented before each comparison)
    index: usize,
    /// Test mode
    pub mode: RegTestMode,
    /// Overall success status
    success: bool,
    /// Recorded failures
    failures: Vec<String>,
}

impl RegParams {
    /// Create new regression test parameters
    ///
    /// # Arguments
    ///
    /// * `test_name` - Name of the test (e.g., "expand")
    ///
    /// # Returns
    ///
    /// A new `RegParams` instance configured from the `REGTEST_MODE`
    /// environment variable.
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();

        eprintln!();
        eprintln!("////////////////////////////////////////////////");
        eprintln!("////////////////   {}_reg   ///////////////", test_name);
        eprintln!("////////////////////////////////////////////////");
        eprintln!("Mode: {:?}", mode);

        Self {
            test_name: test_name.to_string(),
            index: 0,
            mode,
            success: true,
            failures: Vec::new(),
        }
    }

    /// Get the current test index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Check if in display mode
    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    fn fail(&mut self, msg: String) {
        eprintln!("{}", msg);
        self.failures.push(msg);
        self.success = false;
    }

    /// Compare two floating-point values
    ///
    /// # Arguments
    ///
    /// * `expected` - Expected value
    /// * `actual` - Actual computed value
    /// * `delta` - Maximum allowed difference
    ///
    /// # Returns
    ///
    /// `true` if values match within delta, `false` otherwise.
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        self.index += 1;
        let diff = (expected - actual).abs();

        if diff > delta || diff.is_nan() {
            self.fail(format!(
                "Failure in {}_reg: value comparison for index {}\n\
                 difference = {} but allowed delta = {}\n\
                 expected = {}, actual = {}",
                self.test_name, self.index, diff, delta, expected, actual
            ));
            false
        } else {
            true
        }
    }

    /// Compare a boolean condition
    pub fn check(&mut self, condition: bool, what: &str) -> bool {
        self.index += 1;
        if !condition {
            self.fail(format!(
                "Failure in {}_reg: check for index {} - {}",
                self.test_name, self.index, what
            ));
        }
        condition
    }

    /// Compare two arrays for exact equality
    ///
    /// Reports a shape mismatch or the first differing element.
    pub fn compare_arrays<T: PartialEq + Debug>(
        &mut self,
        expected: &ArrayD<T>,
        actual: &ArrayD<T>,
    ) -> bool {
        self.index += 1;

        if self.display() {
            eprintln!("[{}] expected:\n{:?}", self.index, expected);
            eprintln!("[{}] actual:\n{:?}", self.index, actual);
        }

        if expected.shape() != actual.shape() {
            self.fail(format!(
                "Failure in {}_reg: array comparison for index {} - shape mismatch {:?} vs {:?}",
                self.test_name,
                self.index,
                expected.shape(),
                actual.shape()
            ));
            return false;
        }

        let mismatch = expected
            .indexed_iter()
            .zip(actual.iter())
            .find(|((_, e), a)| e != a);
        if let Some(((position, e), a)) = mismatch {
            self.fail(format!(
                "Failure in {}_reg: array comparison for index {} - mismatch at {:?}: expected {:?}, got {:?}",
                self.test_name, self.index, position, e, a
            ));
            return false;
        }

        true
    }

    /// Compare two label fields for exact equality
    pub fn compare_fields(&mut self, expected: &ArrayD<u32>, actual: &ArrayD<u32>) -> bool {
        self.compare_arrays(expected, actual)
    }

    /// Compare two masks for exact equality
    pub fn compare_masks(&mut self, expected: &ArrayD<bool>, actual: &ArrayD<bool>) -> bool {
        self.compare_arrays(expected, actual)
    }

    /// Clean up and report results
    ///
    /// # Returns
    ///
    /// `true` if all comparisons passed, `false` if any failed.
    pub fn cleanup(self) -> bool {
        if self.success {
            eprintln!("SUCCESS: {}_reg", self.test_name);
        } else {
            eprintln!("FAILURE: {}_reg", self.test_name);
            for failure in &self.failures {
                eprintln!("  {}", failure);
            }
        }
        eprintln!();

        self.success
    }

    /// Check if all comparisons have passed so far
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get list of failures
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mode_from_env() {
        let mode = RegTestMode::from_env();
        assert!(matches!(mode, RegTestMode::Compare | RegTestMode::Display));
    }

    #[test]
    fn test_compare_values() {
        let mut rp = RegParams::new("test");
        assert!(rp.compare_values(100.0, 100.5, 1.0));
        assert!(rp.is_success());
        assert!(!rp.compare_values(100.0, 200.0, 0.0));
        assert!(!rp.is_success());
        assert_eq!(rp.index(), 2);
        assert_eq!(rp.failures().len(), 1);
    }

    #[test]
    fn test_compare_values_nan_fails() {
        let mut rp = RegParams::new("test");
        assert!(!rp.compare_values(1.0, f64::NAN, 10.0));
    }

    #[test]
    fn test_compare_fields() {
        let mut rp = RegParams::new("test");
        let a = array![[1u32, 0], [0, 2]].into_dyn();
        assert!(rp.compare_fields(&a, &a.clone()));
        let b = array![[1u32, 0], [2, 2]].into_dyn();
        assert!(!rp.compare_fields(&a, &b));
        let c = array![1u32, 0, 0, 2].into_dyn();
        assert!(!rp.compare_fields(&a, &c));
        assert!(!rp.cleanup());
    }
}

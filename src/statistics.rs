use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics as _};

/// Summary statistics over a set of values
///
/// An empty input produces the all-zero statistics object rather than an error, since empty
/// genomic regions are expected for small inputs.
///
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
}

impl Statistics {
    pub fn from_values(values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let count = values.len();
        let mean = values.iter().mean();
        let median = Data::new(values).median();
        Self {
            count,
            mean,
            median,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let stats = Statistics::from_values(vec![4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.count, 4);
        approx::assert_ulps_eq!(stats.mean, 2.5);
        approx::assert_ulps_eq!(stats.median, 2.5);

        let stats = Statistics::from_values(vec![5.0, 1.0, 3.0]);
        approx::assert_ulps_eq!(stats.mean, 3.0);
        approx::assert_ulps_eq!(stats.median, 3.0);
    }

    #[test]
    fn test_empty_statistics() {
        let stats = Statistics::from_values(Vec::new());
        assert!(stats.is_empty());
        assert_eq!(stats, Statistics::default());
    }
}

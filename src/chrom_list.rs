//! Chromosome list shared by all samples in a run
//!

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, map_err_with};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, strum::Display)]
pub enum ChromKind {
    /// Autosomes contribute to sample-wide statistics such as the unity mean
    Autosome,

    /// Haploid chromosomes bypass diploid normalisation
    Haploid,

    Other,
}

#[derive(Clone, Debug)]
pub struct ChromInfo {
    pub label: String,
    pub kind: ChromKind,

    /// Target ratio for diploid normalisation of this chromosome
    pub expected_diploid_ratio: f64,
}

/// Classifies chromosome labels into ChromKind and assigns the expected diploid ratio
///
pub struct ChromClassifier {
    autosome_regex: Regex,
    haploid_regex: Regex,
    expected_ratio_overrides: HashMap<String, f64>,
}

impl ChromClassifier {
    pub fn new(
        autosome_regex: &str,
        haploid_regex: &str,
        expected_ratio_overrides: HashMap<String, f64>,
    ) -> SimpleResult<Self> {
        let autosome_regex = map_err_with!(
            Regex::new(autosome_regex),
            "Invalid autosome regex '{}'",
            autosome_regex
        )?;
        let haploid_regex = map_err_with!(
            Regex::new(haploid_regex),
            "Invalid haploid chromosome regex '{}'",
            haploid_regex
        )?;
        Ok(Self {
            autosome_regex,
            haploid_regex,
            expected_ratio_overrides,
        })
    }

    pub fn classify(&self, label: &str) -> ChromInfo {
        let kind = if self.haploid_regex.is_match(label) {
            ChromKind::Haploid
        } else if self.autosome_regex.is_match(label) {
            ChromKind::Autosome
        } else {
            ChromKind::Other
        };
        let expected_diploid_ratio = self
            .expected_ratio_overrides
            .get(label)
            .copied()
            .unwrap_or(1.0);
        ChromInfo {
            label: label.to_string(),
            kind,
            expected_diploid_ratio,
        }
    }
}

/// Chromosome labels in first-seen order with reverse lookup
///
#[derive(Clone, Debug, Default)]
pub struct ChromList {
    pub data: Vec<ChromInfo>,
    pub label_to_index: HashMap<String, usize>,
}

impl ChromList {
    /// Add chromosome if it is not already present, and return its index in either case
    ///
    pub fn add_chrom(&mut self, label: &str, classifier: &ChromClassifier) -> usize {
        if let Some(&chrom_index) = self.label_to_index.get(label) {
            return chrom_index;
        }
        let chrom_index = self.data.len();
        self.data.push(classifier.classify(label));
        self.label_to_index.insert(label.to_string(), chrom_index);
        chrom_index
    }

    pub fn is_autosome(&self, chrom_index: usize) -> bool {
        self.data[chrom_index].kind == ChromKind::Autosome
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;

    pub fn default_classifier() -> ChromClassifier {
        ChromClassifier::new(r"^(chr)?\d{1,2}$", r"^(chr)?Y$", HashMap::new()).unwrap()
    }

    /// Build a chrom list from labels using the default classifier
    pub fn chrom_list_from_labels(labels: &[&str]) -> ChromList {
        let classifier = default_classifier();
        let mut chrom_list = ChromList::default();
        for label in labels {
            chrom_list.add_chrom(label, &classifier);
        }
        chrom_list
    }
}

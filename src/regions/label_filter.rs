// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Allow-list filtering of detections by class label

use std::collections::HashSet;

use super::bounding_box::Detection;

/// Case-sensitive set of class labels that survive filtering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: HashSet<String>,
}

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a label list such as `[person, car]` or `person,car`.
    ///
    /// Surrounding brackets and whitespace are ignored, as are empty entries.
    pub fn parse(list: &str) -> Self {
        let trimmed = list.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(trimmed);

        Self::new(
            inner
                .split(',')
                .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\''))
                .filter(|s| !s.is_empty()),
        )
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Labels in sorted order, for logging
    pub fn sorted(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }
}

/// Keep only detections whose `class_name` is in `allowed`.
///
/// Relative order is preserved and nothing is deduplicated. An empty
/// allow-list yields an empty result.
pub fn filter_by_labels<I>(detections: I, allowed: &LabelSet) -> Vec<Detection>
where
    I: IntoIterator<Item = Detection>,
{
    if allowed.is_empty() {
        return Vec::new();
    }

    detections
        .into_iter()
        .filter(|d| allowed.contains(&d.class_name))
        .collect()
}

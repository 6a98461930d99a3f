// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region extraction pipeline (detector → label filter → merger)

pub mod extractor;

pub use extractor::{ExtractionError, RegionExtraction, RegionExtractor};

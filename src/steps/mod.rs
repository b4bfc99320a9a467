//! Multi-package operations.

pub mod convert;

pub use convert::{ConversionReport, ConvertOptions, OutputMode, PackageFailure, convert};

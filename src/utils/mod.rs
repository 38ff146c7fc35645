//!
//! Utility functions shared by the formatting pipeline.

pub mod line_ending;

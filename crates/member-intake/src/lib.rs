//! Bulk membership-application intake.
//!
//! The pipeline ingests spreadsheet uploads containing membership
//! applications, validates each row (South African ID numbers, mobile
//! numbers, geographic codes), detects duplicates within the file and
//! against the member directory, schedules concurrent uploads through a
//! bounded priority queue, and renders a categorized outcome report for
//! every completed job.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod telemetry;

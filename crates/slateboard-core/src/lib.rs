//! # Slateboard Core
//!
//! Core types, errors, and utilities for the Slateboard API.
//!
//! This crate provides foundational types used throughout the Slateboard
//! application:
//!
//! - [`errors`]: Application error types with HTTP response conversion
//! - [`overlap`]: Time-of-day and validity-window overlap arithmetic used
//!   by conflict detection and availability search
//! - [`pagination`]: Pagination utilities for API responses
//!
//! # Example
//!
//! ```ignore
//! use slateboard_core::errors::AppError;
//! use slateboard_core::overlap::{times_overlap, periods_overlap};
//!
//! // Create an error
//! let error = AppError::not_found(anyhow::anyhow!("Timetable entry not found"));
//!
//! // Compare two class slots
//! let clash = times_overlap("09:00", "10:00", "09:30", "10:30")?;
//! assert!(clash);
//! ```

pub mod errors;
pub mod overlap;
pub mod pagination;

// Re-export commonly used types at crate root
pub use errors::AppError;
pub use overlap::{DAY_NAMES, day_name, parse_hhmm, periods_overlap, times_overlap};
pub use pagination::{PaginationMeta, PaginationParams};

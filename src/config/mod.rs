//! Configuration modules for the Slateboard API.
//!
//! Each submodule handles one aspect of configuration, loaded from
//! environment variables at startup.
//!
//! - [`cors`]: allowed origins for the CORS layer
//! - [`jwt`]: token verification settings

pub mod cors;
pub mod jwt;

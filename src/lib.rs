//! # Space Report
//!
//! A recurring report pipeline that turns one week of collected
//! space-industry news into an executive trend report, delivered as
//! Markdown and a styled PDF.
//!
//! ## Pipeline
//!
//! 1. **Load**: Read the collector's JSON capture file (read-only input)
//! 2. **Prompt**: Serialize the items deterministically and attach the
//!    analyst instructions with their output constraints
//! 3. **Complete**: Call an OpenAI-compatible completion service with
//!    retry, backoff, and quota-aware failure classification
//! 4. **Validate**: Enforce the report contract on the response before a
//!    single byte is written
//! 5. **Render**: Write the Markdown and PDF artifacts atomically under
//!    date-stamped names
//!
//! A run either produces both artifacts or stops with a classified error;
//! partial or placeholder reports are never written.

pub mod api;
pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod models;
pub mod outputs;
pub mod prompt;
pub mod store;
pub mod utils;
pub mod validator;

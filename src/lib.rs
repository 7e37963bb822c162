//! apiprobe - schema-driven black-box testing for HTTP API endpoints
//!
//! A suite describes one endpoint (an optional predo call, the test call and an
//! optional undo call) and the fields of its request body. From that, apiprobe
//! generates boundary, type, format and tamper cases, runs each one through
//! predo/test/undo against the live endpoint and reports which cases the
//! server handled as expected.
//!
//! # Modules
//!
//! - `path` - dotted/indexed addressing into JSON payloads
//! - `reference` - values that point into earlier calls, and the request log
//! - `schema` - suite, endpoint, field and option types
//! - `generator` - test case generation per field
//! - `runner` - predo/test/undo orchestration
//! - `report` - result aggregation and report rendering
//! - `transport` - HTTP transport abstraction
//!
//! # Example
//!
//! ```rust,ignore
//! use apiprobe::runner::Runner;
//! use apiprobe::schema::Suite;
//! use apiprobe::transport::{ReqwestTransport, TransportConfig};
//!
//! let suite = Suite::load("suite.toml")?;
//! let transport = ReqwestTransport::new(TransportConfig::default())?;
//! let report = Runner::new(suite, transport).run_all().await?;
//! println!("{}/{} passed", report.summary.passed_tests, report.summary.total_tests);
//! ```

pub mod cli;
pub mod errors;
pub mod generator;
pub mod path;
pub mod reference;
pub mod report;
pub mod runner;
pub mod schema;
pub mod transport;
pub mod ui;

// Re-export commonly used types
pub use errors::ProbeError;
pub use report::Report;
pub use runner::Runner;
pub use schema::Suite;

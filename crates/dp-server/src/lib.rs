//! CBRS Domain Proxy
//!
//! This crate implements the Domain Proxy request pipeline that mediates
//! between CBSD radio devices and a Spectrum Access System (SAS):
//!
//! - **Consumer**: claims pending requests from shared PostgreSQL storage
//!   with `FOR UPDATE SKIP LOCKED`, so concurrently scaled workers never
//!   process the same request twice
//! - **Router**: delivers grouped request batches to the mapped SAS method
//!   over mutual TLS, with optional CRL revocation validation of the
//!   endpoint certificate, and relays responses to a Radio Controller
//! - **Processor**: turns SAS responses into persisted Request/CBSD/Grant
//!   state transitions, exactly once per request
//! - **Pipeline driver**: a periodic loop tying the three together, one
//!   transaction per request-type batch
//!
//! # Example
//!
//! ```rust,no_run
//! use dp_server::config::Config;
//! use dp_server::metrics::PipelineMetrics;
//! use dp_server::router::Router;
//! use dp_server::storage::{GrantTransitionTable, ResponseProcessor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file("config.json")?;
//! let metrics = Arc::new(PipelineMetrics::new());
//! let router = Router::new(
//!     &config.sas_url,
//!     &config.rc_ingest_url,
//!     config.request_mapping()?,
//!     config.tls_options()?,
//!     Duration::from_secs(config.request_timeout_secs),
//!     metrics.clone(),
//! )?;
//! let processor = ResponseProcessor::new(GrantTransitionTable::standard());
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod health;
pub mod metrics;
pub mod pipeline;
pub mod router;
pub mod storage;

pub use audit::{AuditEntry, AuditEventType, AuditLogger};
pub use config::{Config, ConfigError};
pub use metrics::PipelineMetrics;
pub use pipeline::{CycleStats, PipelineDriver, PipelineError};
pub use router::{RequestMapping, Router, RouterError, SasResponse};
pub use storage::{ResponseProcessor, StorageError};

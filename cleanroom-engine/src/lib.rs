//! Column-level cryptographic transform engine.
//!
//! Given a [`Schema`](cleanroom_schema::Schema) and a [`Session`], the
//! [`Engine`] turns every input row into an output row: cleartext columns are
//! copied, fingerprint columns are replaced by keyed HMACs, sealed columns are
//! encrypted with a fresh nonce per cell. Decrypt runs reverse the sealed
//! columns and pass everything else through.
//!
//! # Run lifecycle
//!
//! 1. A [`Session`] resolves the collaboration's policy and derives keys.
//! 2. [`Engine::prepare`] validates the schema and binds it to the input
//!    header. Every configuration error is raised here.
//! 3. [`Engine::run`] reads batches, marshals them on scoped worker threads
//!    and writes the results in input order.
//!
//! A row that cannot be transformed never produces a placeholder value: it
//! either aborts the run or is reported in [`RunReport::failures`].

mod codec;
mod engine;
mod error;
mod marshaller;
mod session;

pub use engine::{Engine, RowErrorPolicy, RowFailure, RunOptions, RunReport, DEFAULT_BATCH_SIZE};
pub use error::{EngineError, EngineResult, RowError};
pub use marshaller::Marshaller;
pub use session::{
    CollaborationMetadata, CollaborationMetadataSource, Session, SettingsFileSource,
    StaticMetadataSource, DEFAULT_SECRET_ENV,
};

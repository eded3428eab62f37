//! Component detection for Git repositories.
//!
//! A `ComponentDetectionQuery` names a repository; the controller inspects it
//! and records a Component stub for every buildable unit it finds. The
//! pipeline is:
//!
//! 1. [`forge`] resolves the revision over the forge API.
//! 2. [`fetch`] reads files anonymously or from an authenticated checkout.
//! 3. [`scanner`] looks for an explicit devfile, an in-tree devfile or
//!    Dockerfile, and otherwise analyzes the checkout with [`analyzer`] and
//!    matches languages against the [`registry`].
//! 4. [`stub`] lowers devfiles into `ComponentSpec`s and allocates names.
//! 5. [`controller`] records the outcome as status conditions.

pub mod analyzer;
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod devfile;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod forge;
pub mod observability;
pub mod registry;
pub mod scanner;
pub mod stub;

pub use crate::engine::{DetectionEngine, DetectionOutcome, DetectionRequest};
pub use crate::errors::{DetectionError, ErrorCode, Result};
pub use crate::scanner::{Resolution, ScanResult};

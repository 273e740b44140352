//! Integration tests for the Arcus operator
//!
//! These tests require a Kubernetes cluster (kind) to run and tell the story
//! of how users interact with Arcus resources against a real API server.
//!
//! # Test Organization
//!
//! - `crd_operations`: Stories about creating and reading Arcus resources
//!   through the Kubernetes API
//!
//! - `ensemble_lifecycle`: Stories about how the controller creates and
//!   converges the four children of an Arcus
//!
//! # Running These Tests
//!
//! ```bash
//! kind create cluster --name arcus-integration-test
//! cargo test --test kind -- --ignored --nocapture
//! ```

mod crd_operations;
mod ensemble_lifecycle;
mod helpers;

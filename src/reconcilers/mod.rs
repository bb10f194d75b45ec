// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of the hosted zone's routing records.
//!
//! # Reconciliation Architecture
//!
//! 1. **Read** - List the zone's records and scope them to the ones the controller owns
//! 2. **Diff** - Compare them with the compiled desired state
//! 3. **Apply** - Submit the difference to the provider, retrying transient failures
//! 4. **Verify** - Re-read the zone and confirm nothing is left to change
//!
//! # Modules
//!
//! - [`diff`] - Pure drift detection producing a [`ChangeSet`]
//! - [`records`] - The [`Reconciler`] that applies change sets
//! - [`retry`] - Exponential backoff for provider calls
//!
//! # Example
//!
//! ```rust,no_run
//! use georoute::compiler::DesiredState;
//! use georoute::model::HostedZone;
//! use georoute::provider::MemoryProvider;
//! use georoute::reconcilers::Reconciler;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! async fn converge(zone: HostedZone, desired: DesiredState) -> anyhow::Result<()> {
//!     let reconciler = Reconciler::new(Arc::new(MemoryProvider::atomic()), 5);
//!     let (_tx, shutdown) = watch::channel(false);
//!
//!     let result = reconciler.reconcile(&zone, &desired, &shutdown).await?;
//!     println!("converged: {}", result.converged);
//!     Ok(())
//! }
//! ```

pub mod diff;
pub mod records;
pub mod retry;

pub use diff::{diff, ActualState, ChangeSet};
pub use records::{ReconcileResult, Reconciler};

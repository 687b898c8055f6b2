//! Short-lived credential broker—hand out access tokens from a per-key singleflight cache,
//! with expiry-margin staleness, pluggable proof-of-identity sources, and issuer-agnostic
//! exchange.
//!
//! The broker sits between application code and an external token issuing authority. A
//! caller asks for a token via [`Broker::acquire`](broker::Broker::acquire) with a
//! [`WorkloadId`](auth::WorkloadId) and a [`Scope`](auth::Scope); the broker serves a
//! cached token while it is fresh and otherwise performs exactly one exchange per cache
//! key, no matter how many callers race for it.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broker;
pub mod clock;
pub mod error;
pub mod issuer;
pub mod obs;
pub mod source;
pub mod strategy;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
#[cfg(feature = "reqwest")] pub use url;
#[cfg(test)] use httpmock as _;

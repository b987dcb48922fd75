//! FLEETDECK API - Backend Contract and Cached Store
//!
//! The [`Transport`] seam with its two implementations (the in-process
//! [`MockServer`] and [`HttpTransport`]), the session context, the typed
//! [`ApiClient`], per-resource cache keys and the [`FleetStore`] that runs
//! reads and mutations through the shared cache.

pub mod client;
pub mod keys;
pub mod mock;
pub mod session;
pub mod store;
pub mod transport;

pub use client::ApiClient;
pub use mock::{MockConfig, MockServer};
pub use session::{Session, SessionContext};
pub use store::{CachedResource, FleetStore, Resource};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError};

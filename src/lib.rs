//! # nxapi - A resilient client for NX-API style device REST APIs
//!
//! nxapi talks to network devices that expose managed objects as JSON over
//! HTTP, with objects wrapped in an `imdata` envelope and addressed by class
//! or distinguished name (DN). It takes care of the session, retries
//! transient failures with randomized exponential backoff, and reads and
//! writes schemaless JSON through dotted paths.
//!
//! ## Quick Start
//!
//! ```no_run
//! use nxapi::{Body, Client};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nxapi::Error> {
//!     let client = Client::builder()
//!         .base_url("https://10.0.0.1")?
//!         .credentials("admin", "secret")
//!         .insecure(true)
//!         .timeout(Duration::from_secs(30))
//!         .build()?;
//!
//!     // The first call logs in; later calls refresh the token when it ages out.
//!     let interfaces = client.get_class("l1PhysIf").await?;
//!     for interface in interfaces.array() {
//!         println!("{}", interface.get("l1PhysIf.attributes.id").str());
//!     }
//!
//!     let bgp = client.get_dn("sys/bgp").await?;
//!     println!("BGP admin state: {}", bgp.get("bgpEntity.attributes.adminSt").str());
//!
//!     let body = Body::new().set("bgpInst.attributes.asn", "65001");
//!     client.post("sys/bgp/inst", body).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Session handling** - Login on first use, token refresh after 8 minutes,
//!   serialized so concurrent callers never log in twice
//! - **Retries** - Transport errors and 500-504/405 responses are retried with jittered
//!   exponential backoff
//! - **Path-addressed JSON** - [`Body`] builds request payloads, [`Document`] reads
//!   responses, no per-class structs needed
//! - **Rich errors** - Device error envelopes, HTTP failures and exhausted retries
//!   all keep the raw and parsed response
//! - **Logging** - Structured logging with `tracing`; payloads of login and refresh
//!   are never logged
//!
//! ## Error Handling
//!
//! ```no_run
//! use nxapi::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::new("https://10.0.0.1", "admin", "secret", true)?;
//! match client.delete_dn("sys/bgp/inst").await {
//!     Ok(_) => println!("Deleted"),
//!     Err(Error::Api { code, text, .. }) => eprintln!("Device error {}: {}", code, text),
//!     Err(Error::MaxRetriesExceeded { attempts, last_error }) => {
//!         eprintln!("Gave up after {} attempts: {}", attempts, last_error);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
pub mod backoff;
mod body;
mod client;
mod document;
mod error;
mod path;
mod request;
mod response;

pub use auth::DEFAULT_REFRESH_INTERVAL;
pub use backoff::Backoff;
pub use body::Body;
pub use client::{Client, ClientBuilder, DEFAULT_TIMEOUT};
pub use document::Document;
pub use error::{Error, Result};
pub use request::{Request, RequestOptions};
pub use response::Response;

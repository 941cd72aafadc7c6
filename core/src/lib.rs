//! Blocking client for the UCode platform's object API.
//!
//! # Overview
//! Every public operation maps one-to-one onto an HTTP request against the
//! configured platform: create, read (full and slim), list, aggregate,
//! update, delete, and many-to-many relation management on tables addressed
//! by slug.
//!
//! # Design
//! - `UcodeClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network, so every wire detail is testable
//!   in isolation.
//! - `Transport` executes requests; `UreqTransport` is the blocking default,
//!   bounded by the configured timeout.
//! - `UcodeSdk` joins the two and returns decoded data together with the raw
//!   response.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod sdk;
pub mod transport;
pub mod types;

pub use client::UcodeClient;
pub use config::Config;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use sdk::UcodeSdk;
pub use transport::{Transport, UreqTransport};
pub use types::{
    AggregationResult, Argument, ArgumentWithPagination, Envelope, ManyToMany, MultipleUpdateResult, Object,
    ObjectList, RelationArgument, Request, Response, SingleObject,
};

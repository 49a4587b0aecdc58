//! Pagestream Data API adapter
//!
//! Production [`PageService`](pagestream_core::PageService) implementation
//! over HTTP: per-endpoint reqwest clients with configurable timeouts and
//! bearer authentication, gzip JSON-lines page streaming.

pub mod client;
pub mod stream;

pub use client::{DataApiClient, DataApiService, PageStream};

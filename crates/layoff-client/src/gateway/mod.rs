//! HTTP gateway: the single chokepoint for outbound API calls.
//!
//! Every call is attributed with the current access token, every failure is
//! normalized into an [`ApiFailure`], and a 401 tears the session down.

mod client;
pub mod endpoints;
mod request;
mod response;
mod transport;

pub use client::HttpGateway;
pub use request::{ApiRequest, Method, QueryParams};
pub use response::{
    decode, decode_unit, failure_from_transport, ApiFailure, FailureKind, DEFAULT_FAILURE_MESSAGE,
    NETWORK_FAILURE_MESSAGE, NETWORK_STATUS, SESSION_EXPIRED_MESSAGE,
};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};

//! Transport kernel: request signing, HTTP transport, and the WebSocket
//! stream session. Contains no endpoint-specific logic.

pub mod rest;
pub mod signer;
pub mod ws;

pub use rest::{ReqwestTransport, Request, RestClient};
pub use signer::RequestSigner;
pub use ws::{SessionState, StreamEvent, StreamSession};

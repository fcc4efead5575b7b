//! HTTP transport layer.
//!
//! [`Transport`] is the seam between the request lifecycle and the network.
//! [`HttpInstance`] binds a transport to base settings and interceptor
//! chains; [`ReqwestTransport`] is the stock implementation.

mod reqwest_transport;
mod request;
mod response;
mod transport;

pub use reqwest_transport::{ReqwestTransport, ReqwestTransportBuilder, ReqwestTransportConfig};
pub use request::{
    FilePart, FormPart, HttpMethod, MultipartForm, PartValue, ProgressCallback, RequestBody,
    ResponseType, TransportRequest,
};
pub use response::{ResponseData, TransferProgress, TransportResponse};
pub use transport::{HttpInstance, Transport};

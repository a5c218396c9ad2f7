pub mod envelope;
pub mod framing;

pub use envelope::{
    HOST_PROTOCOL_VERSION, HelloRequest, HelloResponse, HostErrorCode, HostRequest,
    HostRequestBody, HostResponse, HostResponseBody, HostRpcError, ProtocolVersion,
};
pub use framing::{recv_msg, send_msg};

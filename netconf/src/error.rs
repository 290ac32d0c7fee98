#[cfg(feature = "ssh")]
use bytes::Bytes;
#[cfg(feature = "ssh")]
use tokio::sync::mpsc;

use crate::{
    capabilities::Requirements,
    message::{self, rpc},
};

/// `netconf` library error variants
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Transport //
    #[cfg(feature = "ssh")]
    /// The underlying SSH transport encountered an error.
    #[error(transparent)]
    SshTransport(#[from] russh::Error),

    /// The underlying transport encountered an error.
    #[error("a transport error occurred: {0}")]
    Transport(#[from] std::io::Error),

    #[cfg(feature = "ssh")]
    /// Failure to enqueue an inter-task message.
    #[error("failed to enqueue a message")]
    EnqueueMessage(#[from] mpsc::error::SendError<Bytes>),

    /// Failure to dequeue an inter-task message.
    #[error("failed to dequeue a message: {0}")]
    DequeueMessage(&'static str),

    // Session establishment //
    //
    /// User authentication failed.
    #[error("authentication failed for user {0}")]
    Authentication(String),

    /// Base protocol version negotiation failed.
    #[error("failed to negotiate a common base protocol version")]
    VersionNegotiation,

    // Session management //
    //
    /// A `message-id` collision was detected.
    #[error("encountered a 'message-id' collision. please file a bug report!")]
    MessageIdCollision(rpc::MessageId),

    /// Received a message with an unknown `message-id`.
    #[error("request with message-id '{0:?}' not found")]
    RequestNotFound(rpc::MessageId),

    /// Attempted to process an already completed request.
    #[error("attempted to poll for an already completed request")]
    RequestComplete,

    // Message encoding / serialization //
    //
    /// Message serialization failed.
    #[error(transparent)]
    WriteMessage(#[from] message::WriteError),

    // Message decoding / de-serialization //
    //
    /// Message de-serialization failed
    #[error(transparent)]
    ReadMessage(#[from] message::ReadError),

    // RPC request validation.
    //
    /// Attempted to perform an unsupported operation.
    #[error("unsupported rpc operation '{0}' (requires {1})")]
    UnsupportedOperation(&'static str, Requirements),

    /// Missing a required operation parameter.
    #[error("missing required parameter {param_name} for rpc operation {operation_name}")]
    MissingOperationParameter {
        /// RPC operation name.
        operation_name: &'static str,
        /// Required parameter name.
        param_name: &'static str,
    },

    // Protocol errors
    //
    /// RPC operation failure.
    #[error("received rpc-error reply: {0}")]
    RpcError(#[from] rpc::Errors),

    /// Empty `rpc-reply` when data was expected.
    #[error("unexpectedly empty rpc-reply")]
    EmptyRpcReply,
}

impl Error {
    pub(crate) const fn missing_operation_parameter(
        operation_name: &'static str,
        param_name: &'static str,
    ) -> Self {
        Self::MissingOperationParameter {
            operation_name,
            param_name,
        }
    }
}

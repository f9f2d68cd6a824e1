use std::time::Duration;

use thiserror::Error;

// errors that can happen while talking to realflight
// all of these are local to one exchange, the control loop logs them and carries on
#[derive(Debug, Error)]
pub enum RfError {
    /// The pool could not open a transport to the simulator.
    #[error("could not connect to {address}: {source}")]
    ConnectFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// No connection could be leased for the request.
    #[error("no connection available for {action}: {reason}")]
    NoConnection { action: String, reason: String },

    /// Writing the request to an established connection failed.
    #[error("failed to send {action} request: {reason}")]
    SendFailed { action: String, reason: String },

    /// Nothing became readable within the reply timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The connection closed before a single byte was read.
    #[error("connection closed without a reply")]
    EmptyReply,

    /// A reply arrived but without the success marker.
    #[error("{action} was rejected by the simulator")]
    ProtocolRejected { action: String },
}

//! Vendor message dispatch: frame parsing is `servent_messages::VendorFrame`;
//! this crate owns the `(vendor, selector, version)` routing table and the
//! named payload types the router and core dispatch to.

pub mod codes;
pub mod dispatch;
pub mod handlers;

use servent_messages::VendorFrame;

#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error("vendor message payload truncated")]
    Truncated,

    #[error("no handler for vendor message ({vendor:?}, selector {selector:#06x}, version {version})")]
    NoHandler {
        vendor: codes::VendorCode,
        selector: u16,
        version: u16,
    },
}

pub type Result<T> = std::result::Result<T, VendorError>;

/// A decoded vendor message, ready for the router or core to act on.
#[derive(Clone, Debug, PartialEq)]
pub enum VendorMessage {
    MessagesSupported(handlers::MessagesSupported),
    HopsFlow(handlers::HopsFlow),
    ConnectBack(handlers::ConnectBack),
    QueryStatusRequest(handlers::QueryStatusRequest),
    QueryStatusResponse(handlers::QueryStatusResponse),
    PushProxyRequest(handlers::PushProxyRequest),
    PushProxyAck(handlers::PushProxyAck),
}

/// Dispatch a raw vendor frame to its handler, per [`dispatch::lookup`].
pub fn handle(frame: &VendorFrame) -> Result<VendorMessage> {
    let kind = dispatch::lookup(frame).ok_or(VendorError::NoHandler {
        vendor: frame.vendor,
        selector: frame.selector,
        version: frame.version,
    })?;

    Ok(match kind {
        dispatch::Kind::MessagesSupported => {
            VendorMessage::MessagesSupported(handlers::MessagesSupported::decode(&frame.payload)?)
        }
        dispatch::Kind::HopsFlow => VendorMessage::HopsFlow(handlers::HopsFlow::decode(&frame.payload)?),
        dispatch::Kind::ConnectBack => {
            VendorMessage::ConnectBack(handlers::ConnectBack::decode(&frame.payload)?)
        }
        dispatch::Kind::QueryStatusRequest => {
            VendorMessage::QueryStatusRequest(handlers::QueryStatusRequest::decode(&frame.payload)?)
        }
        dispatch::Kind::QueryStatusResponse => {
            VendorMessage::QueryStatusResponse(handlers::QueryStatusResponse::decode(&frame.payload)?)
        }
        dispatch::Kind::PushProxyRequest => {
            VendorMessage::PushProxyRequest(handlers::PushProxyRequest::decode(&frame.payload)?)
        }
        dispatch::Kind::PushProxyAck => {
            VendorMessage::PushProxyAck(handlers::PushProxyAck::decode(&frame.payload)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_hops_flow() {
        let frame = VendorFrame {
            vendor: codes::T_BEAR,
            selector: 0x0004,
            version: 0x0001,
            payload: vec![2],
        };
        let msg = handle(&frame).unwrap();
        assert_eq!(
            msg,
            VendorMessage::HopsFlow(handlers::HopsFlow { hops: 2 })
        );
    }

    #[test]
    fn handle_unknown_returns_no_handler() {
        let frame = VendorFrame {
            vendor: codes::T_RAZA,
            selector: 0x1234,
            version: 1,
            payload: vec![],
        };
        assert!(matches!(handle(&frame), Err(VendorError::NoHandler { .. })));
    }
}

//! Unified error kind for the core event loop, wrapping each subsystem's
//! narrower error type.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Wire(#[from] servent_wire::WireError),

    #[error(transparent)]
    Message(#[from] servent_messages::MessageError),

    #[error(transparent)]
    Router(#[from] servent_router::RouterError),

    #[error(transparent)]
    Query(#[from] servent_query::QueryError),

    #[error(transparent)]
    Qhit(#[from] servent_qhit::QhitError),

    #[error(transparent)]
    Vendor(#[from] servent_vendor::VendorError),

    #[error(transparent)]
    Guid(#[from] crate::guid::GuidError),

    #[error("no such peer")]
    UnknownPeer,
}

pub type Result<T> = std::result::Result<T, CoreError>;

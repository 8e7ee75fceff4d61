//! The core: data model, concurrency glue, and wire framing tying the
//! router, pong cache, query pipeline, query hit builder, and vendor
//! dispatch together into one servent.

pub mod context;
pub mod error;
pub mod framing;
pub mod guid;
pub mod peer;

pub use context::{CoreConfig, CoreContext};
pub use error::{CoreError, Result};
pub use peer::{Direction, Peer};

pub mod errors;
pub mod id;
pub mod protocol;

pub use errors::{ConfigError, LanbeamError};
pub use id::{new_id, ConnectionId, FileId};
pub use protocol::{ClientFrame, PeerInfo, ServerFrame};

pub type Result<T> = std::result::Result<T, LanbeamError>;

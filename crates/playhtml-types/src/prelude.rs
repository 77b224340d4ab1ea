pub use crate::{ClResult, Config, Error, RoomId, Timestamp, Value};
pub use tracing::{debug, error, info, trace, warn};

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod doc;
pub mod origin;
pub mod value;

pub use doc::PlayDoc;
pub use origin::{OriginKind, ORIGIN_C2S, ORIGIN_S2C};

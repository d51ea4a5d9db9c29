//! CLI command implementations

mod export;
mod init;
mod status;
mod sync;

pub use export::*;
pub use init::*;
pub use status::*;
pub use sync::*;

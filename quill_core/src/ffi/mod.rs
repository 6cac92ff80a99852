mod error;
mod lock;
mod session;

pub use error::CoreError;
pub use session::{init_logging, open, open_with_config, CoreSession};

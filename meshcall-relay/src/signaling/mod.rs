mod relay_session;
mod ws_handler;

pub use relay_session::{FrameOutcome, RelayError, RelaySession};
pub use ws_handler::ws_handler;

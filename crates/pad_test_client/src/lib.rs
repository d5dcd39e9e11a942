//! PocketPad test client library.
//!
//! [`PadSession`] is a Socket.IO connection to the relay that answers
//! liveness probes by itself; [`PadBoard`] rebuilds each player's controller
//! state from relayed input. The `pad-test-client` binary and the end-to-end
//! tests are both built on these.

pub mod pad_state;
pub mod session;

pub use pad_state::{PadBoard, PadState};
pub use session::{base_url, PadSession};

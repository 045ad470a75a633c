//! Wire protocol shared by the SPADIC control services.
//!
//! Every service speaks line-delimited JSON over a plain TCP stream: one JSON
//! document per line, terminated by `\n`. Register services accept a
//! `[command, payload]` pair and answer reads with a JSON object on a single
//! line; the signal service accepts a bare number and never answers.
//!
//! ```json
//! ["w", {"x": 5, "y": 7}]
//! ["r", "all"]
//! ["r", ["x"]]
//! 42
//! ```

mod codec;
mod errors;
mod request;
mod response;

pub use codec::{DEFAULT_MAX_LINE_BYTES, LineDecoder, Messages};
pub use errors::ProtocolError;
pub use request::{RegisterCommand, RegisterMap, RegisterSelection, RegisterValue, parse_signal};
pub use response::ResponseWriter;

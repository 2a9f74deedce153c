//! Protocol module containing the reading record, the line codec, and
//! iteration bookkeeping.

pub mod codec;
pub mod iteration;
pub mod reading;

pub use codec::{decode_frame, encode_frame, FrameDecoder, FrameError, FRAME_DELIMITER};
pub use iteration::{IterationCheck, IterationCounter, IterationTracker};
pub use reading::{Reading, Tenths};

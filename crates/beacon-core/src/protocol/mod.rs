//! Protocol module containing request/reply types and the reply codec.

pub mod codec;
pub mod messages;

pub use codec::{decode, encode_server_game, DecodeError, Decoder, EncodeError};
pub use messages::*;

//! Wire protocol module.
//!
//! Defines request/response types, message framing and the connection
//! preamble used between the booking client and the pricing services.
//!
//! ## Wire Format
//!
//! Each peer opens with a fixed preamble, then messages are length-prefixed JSON:
//! ```text
//! [4 bytes: magic "BKRP"][2 bytes: version (big-endian u16)]
//! [4 bytes: length (big-endian u32)][JSON payload]
//! ```
//!
//! ## Handshake ordering
//!
//! A peer must write *and flush* its own preamble before it blocks reading the
//! other side's. If either side buffers its preamble and then waits to read,
//! both ends can sit forever waiting for framing bytes that were never sent.
//! [`handshake`] is the only way the crate performs this step.

mod codec;
mod request;
mod response;
mod wire;

pub use codec::{decode, encode, recv_value, send_value};
pub use request::{PricingRequest, ServiceKind};
pub use response::PricingResponse;
pub use wire::{
    handshake, read_message, read_message_with_timeout, read_preamble, write_message,
    write_message_with_timeout, write_preamble, DEFAULT_MAX_MESSAGE_SIZE, PREAMBLE_LEN,
    PROTOCOL_MAGIC, PROTOCOL_VERSION,
};

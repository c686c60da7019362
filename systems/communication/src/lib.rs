#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Codec that packs tagged messages into a single broadcast flag.
//!
//! A flag is a 24-bit integer. Each [`Label`] owns one residue class of the
//! flag space and packs its fields above the residue in mixed radix. The
//! packed value is offset by one and XORed with [`XOR_MASK`], which keeps `0`
//! free to mean "no message".

mod layout;
mod location;

use thiserror::Error;

pub use layout::{layouts_are_consistent, Label, LabelLayout, LAYOUTS};
pub use location::{unwrap_location, wrap_location, WRAP};

/// Number of bits a flag may occupy.
pub const FLAG_BITS: u32 = 24;

/// Exclusive upper bound of a valid flag.
pub const FLAG_SPACE: u32 = 1 << FLAG_BITS;

/// Obfuscation mask applied to every encoded flag.
pub const XOR_MASK: u32 = 2_307_647;

/// Largest number of fields any label may carry.
pub const MAX_FIELDS: usize = 4;

const _: () = assert!(
    layouts_are_consistent(&LAYOUTS, XOR_MASK),
    "label layouts overlap or reach the empty flag"
);

/// Errors raised when building a message from raw fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The number of fields does not match the label.
    #[error("{label:?} carries {expected} fields but {found} were supplied")]
    WrongArity {
        /// Label being built.
        label: Label,
        /// Fields the label carries.
        expected: usize,
        /// Fields supplied by the caller.
        found: usize,
    },
    /// A field exceeds its declared bound.
    #[error("{label:?} field {index} is {value}, which is not below {bound}")]
    FieldOutOfRange {
        /// Label being built.
        label: Label,
        /// Position of the offending field.
        index: usize,
        /// Value supplied by the caller.
        value: u32,
        /// Exclusive bound of the field.
        bound: u32,
    },
}

/// Errors raised when a flag does not carry a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The flag is the empty sentinel.
    #[error("flag is empty")]
    NoMessage,
    /// The flag uses bits beyond the flag space.
    #[error("flag {0} exceeds the 24-bit flag space")]
    OutOfRange(u32),
    /// The flag matches no label's residue class.
    #[error("flag {0} matches no message label")]
    UnknownLabel(u32),
}

/// Tagged message with bounded fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Message {
    label: Label,
    fields: [u32; MAX_FIELDS],
}

impl Message {
    /// Builds a message, validating arity and field bounds.
    pub fn new(label: Label, fields: &[u32]) -> Result<Self, MessageError> {
        let layout = label.layout();
        if fields.len() != layout.bounds.len() {
            return Err(MessageError::WrongArity {
                label,
                expected: layout.bounds.len(),
                found: fields.len(),
            });
        }

        let mut stored = [0; MAX_FIELDS];
        for (index, (&value, &bound)) in fields.iter().zip(layout.bounds).enumerate() {
            if value >= bound {
                return Err(MessageError::FieldOutOfRange {
                    label,
                    index,
                    value,
                    bound,
                });
            }
            stored[index] = value;
        }
        Ok(Self {
            label,
            fields: stored,
        })
    }

    /// Label of the message.
    #[must_use]
    pub const fn label(&self) -> Label {
        self.label
    }

    /// Fields of the message, as many as the label carries.
    #[must_use]
    pub fn fields(&self) -> &[u32] {
        &self.fields[..self.label.arity()]
    }
}

/// Packs a message into a flag. Never returns `0`.
#[must_use]
pub fn encode(message: &Message) -> u32 {
    let layout = message.label.layout();
    let mut payload: u32 = 0;
    let mut radix: u32 = 1;
    for (&value, &bound) in message.fields().iter().zip(layout.bounds) {
        payload += value * radix;
        radix *= bound;
    }
    XOR_MASK ^ (payload * layout.modulus + layout.residue + 1)
}

/// Unpacks a flag read from the broadcast channel.
pub fn decode(flag: u32) -> Result<Message, DecodeError> {
    if flag == 0 {
        return Err(DecodeError::NoMessage);
    }
    if flag >= FLAG_SPACE {
        return Err(DecodeError::OutOfRange(flag));
    }
    let Some(value) = (flag ^ XOR_MASK).checked_sub(1) else {
        return Err(DecodeError::UnknownLabel(flag));
    };

    for label in Label::ALL {
        let layout = label.layout();
        if value % layout.modulus != layout.residue {
            continue;
        }
        let mut payload = value / layout.modulus;
        let mut fields = [0; MAX_FIELDS];
        for (slot, &bound) in fields.iter_mut().zip(layout.bounds) {
            *slot = payload % bound;
            payload /= bound;
        }
        if payload != 0 {
            return Err(DecodeError::UnknownLabel(flag));
        }
        return Ok(Message { label, fields });
    }
    Err(DecodeError::UnknownLabel(flag))
}

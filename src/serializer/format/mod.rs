//! `trait WireFormat` and its four implementations (§4.2).

pub mod ascii;
pub mod binary;
pub mod matlab;
pub mod xml;

use crate::error::SerializeError;
use crate::iochannel::IoChannel;
use crate::serializer::header::HeaderFrame;
use crate::serializer::primitive::{Primitive, PrimitiveKind};

pub use ascii::AsciiFormat;
pub use binary::BinaryFormat;
pub use matlab::MatlabFormat;
pub use xml::XmlFormat;

/// Object-safe format plug-in. One `Box<dyn WireFormat>` is selected by
/// `Serializer::set_format` and used for the lifetime of that format
/// configuration; there is no per-primitive branching in the `Serializer`
/// front object itself.
pub trait WireFormat: std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn write_header(&mut self, channel: &mut IoChannel, header: &HeaderFrame) -> Result<(), SerializeError>;
    fn read_header(&mut self, channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError>;
    /// Reads the next header without consuming it from the channel.
    fn peek_header(&mut self, channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError>;

    fn write_base_type_end(&mut self, channel: &mut IoChannel) -> Result<(), SerializeError>;

    /// Consumes whatever closing marker `write_base_type_end` would have
    /// produced (the Ascii `}` line, the Xml closing tag). Most formats have
    /// no separate closing marker to consume on read (Binary's framing is
    /// entirely length-prefixed; Matlab read is unsupported), so the default
    /// is a no-op.
    fn read_base_type_end(&mut self, _channel: &mut IoChannel) -> Result<(), SerializeError> {
        Ok(())
    }

    fn write_primitive(&mut self, channel: &mut IoChannel, name: &str, value: Primitive) -> Result<(), SerializeError>;
    fn read_primitive(
        &mut self,
        channel: &mut IoChannel,
        name: &str,
        kind: PrimitiveKind,
    ) -> Result<Primitive, SerializeError>;

    fn write_string(&mut self, channel: &mut IoChannel, name: &str, value: &str, max_len: usize) -> Result<(), SerializeError>;
    fn read_string(&mut self, channel: &mut IoChannel, name: &str, max_len: usize) -> Result<String, SerializeError>;

    fn write_array_len(&mut self, channel: &mut IoChannel, name: &str, len: usize) -> Result<(), SerializeError>;
    fn read_array_len(&mut self, channel: &mut IoChannel, name: &str) -> Result<usize, SerializeError>;
}

/// Builds the format plug-in named by `set_format`, configured with its
/// option string (e.g. `"LITTLE_ENDIAN"`, `"WITH_TYPE=FALSE"`).
pub fn build_format(name: &str, options: &str) -> Result<Box<dyn WireFormat>, SerializeError> {
    match name {
        "Binary" => Ok(Box::new(BinaryFormat::new(options))),
        "Ascii" => Ok(Box::new(AsciiFormat::new(options))),
        "Xml" => Ok(Box::new(XmlFormat::new(options))),
        "Matlab" => Ok(Box::new(MatlabFormat::new(options))),
        other => Err(SerializeError::BadFormat(other.to_string())),
    }
}

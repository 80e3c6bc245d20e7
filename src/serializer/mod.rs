//! `Serializer` — the format-polymorphic front object described in §4.1.
//!
//! Drives a [`crate::serializer::format::WireFormat`] plug-in over an
//! [`crate::iochannel::IoChannel`], presenting one typed I/O contract
//! independent of wire format and transport.

pub mod format;
pub mod header;
pub mod mode;
pub mod primitive;

use std::io::SeekFrom;

use crate::error::SerializeError;
use crate::iochannel::mode::ChannelMode;
use crate::iochannel::IoChannel;

pub use format::{build_format, WireFormat};
pub use header::HeaderFrame;
pub use mode::SerializeMode;
pub use primitive::{Primitive, PrimitiveKind};

const DIR_MASK: SerializeMode = SerializeMode::READ.union(SerializeMode::WRITE).union(SerializeMode::CALC);

/// Bookkeeping for one open `beginType`/`endType` level, enough for
/// `end_type` to act correctly without re-deriving the mode that was active
/// when the frame was opened (the mode itself cannot change mid-nesting, but
/// keeping this per-frame keeps the logic local and easy to follow).
#[derive(Debug)]
enum FrameKind {
    /// Read direction; the header (if any) has already been consumed.
    Read,
    /// Write direction, header already written directly (no AutoCalc/Calc
    /// buffering): `write_base_type_end` closes it.
    WritePlain,
    /// Write or Calc direction with buffering: the header is deferred until
    /// the payload's size is known. Holds the not-yet-written header.
    WriteBuffered(HeaderFrame),
    /// `NoHeader` mode: nothing was written or read for this frame; nesting
    /// still balances per the invariant in §3.
    NoHeader,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
}

/// The format-polymorphic front object (§3, §4.1).
///
/// Borrows its channel rather than owning it (`channel: &'a mut IoChannel`),
/// matching the spec's "non-owning; lifetime ≥ S" invariant with a Rust
/// lifetime instead of a raw pointer. `new`/`init` from the original design
/// are merged into one fallible constructor: an unbound `Serializer` would
/// have no useful operations in Rust's ownership model, so there is no
/// value in modeling the unbound state separately.
#[derive(Debug)]
pub struct Serializer<'a> {
    channel: &'a mut IoChannel,
    format: Box<dyn WireFormat>,
    format_name: String,
    format_options: String,
    mode: SerializeMode,
    nesting: u32,
    frames: Vec<Frame>,
    calc_buffers: Vec<IoChannel>,
    error: Option<SerializeError>,
    rd_bytes: u64,
    wr_bytes: u64,
    header_size: u64,
    payload_size: u64,
    max_serialize_size: u64,
    header_buf: HeaderFrame,
}

/// Selects the channel primitives should write to or read from: the
/// innermost pending Calc/AutoCalc buffer if one is open, else the bound
/// channel. Written as a macro rather than a `&mut self` helper method so it
/// expands inline — a method returning `&mut IoChannel` derived from `self`
/// would tie up the whole `self` borrow for as long as the result is used,
/// making the immediately-following `self.format...` call (a second,
/// disjoint field borrow) rejected by the borrow checker.
macro_rules! active_channel {
    ($self:expr) => {
        match $self.calc_buffers.last_mut() {
            Some(buf) => buf,
            None => &mut *$self.channel,
        }
    };
}

impl<'a> Serializer<'a> {
    /// Binds a serializer to `channel` in the given mode. Defaults to the
    /// Binary format until [`Serializer::set_format`] is called, matching
    /// the teacher's own "construct with a sane default, reconfigure before
    /// use" style.
    pub fn new(channel: &'a mut IoChannel, mode: SerializeMode) -> Result<Self, SerializeError> {
        if !mode.has_valid_direction() {
            return Err(SerializeError::BadMode);
        }
        Ok(Serializer {
            channel,
            format: Box::new(format::BinaryFormat::new("")),
            format_name: "Binary".to_string(),
            format_options: String::new(),
            mode,
            nesting: 0,
            frames: Vec::new(),
            calc_buffers: Vec::new(),
            error: None,
            rd_bytes: 0,
            wr_bytes: 0,
            header_size: 0,
            payload_size: 0,
            max_serialize_size: 0,
            header_buf: HeaderFrame::default(),
        })
    }

    /// Selects the wire format plug-in (§4.2) and its option string (e.g.
    /// `"LITTLE_ENDIAN"`, `"WITH_TYPE=FALSE"`).
    pub fn set_format(&mut self, name: &str, options: &str) -> Result<(), SerializeError> {
        let format = build_format(name, options)?;
        self.format = format;
        self.format_name = name.to_string();
        self.format_options = options.to_string();
        Ok(())
    }

    /// Sticky mode transition; changing Read/Write/Calc direction is only
    /// permitted at nesting depth 0 (§4.1).
    pub fn set_mode(&mut self, mode: SerializeMode) -> Result<(), SerializeError> {
        if !mode.has_valid_direction() {
            return Err(SerializeError::BadMode);
        }
        let changes_direction = (mode & DIR_MASK) != (self.mode & DIR_MASK);
        if changes_direction && self.nesting != 0 {
            return Err(SerializeError::ModeChangeWhileNested);
        }
        self.mode = mode;
        Ok(())
    }

    pub fn mode(&self) -> SerializeMode {
        self.mode
    }

    /// Only meaningful combined with Read (§3 invariant (d)).
    pub fn set_init_mode(&mut self, on: bool) {
        if on {
            self.mode.insert(SerializeMode::INIT_MODE);
        } else {
            self.mode.remove(SerializeMode::INIT_MODE);
        }
    }

    /// Rebinds the channel; permitted only at nesting depth 0.
    pub fn set_stream(&mut self, channel: &'a mut IoChannel) -> Result<(), SerializeError> {
        if self.nesting != 0 {
            return Err(SerializeError::ModeChangeWhileNested);
        }
        self.channel = channel;
        Ok(())
    }

    fn record<T>(&mut self, result: Result<T, SerializeError>) -> Result<T, SerializeError> {
        if let Err(e) = &result {
            self.error = Some(e.clone());
        }
        result
    }

    /// Opens a type frame. In Write, emits the format-specific header (or
    /// defers it behind a Calc/AutoCalc buffer); in Read, consumes and
    /// validates it against `type_name`; in Calc, tracks nesting and sizes
    /// only — no channel I/O.
    pub fn begin_type(&mut self, name: &str, type_name: &str) -> Result<(), SerializeError> {
        if let Some(e) = self.error.clone() {
            return Err(e);
        }
        let result = self.begin_type_inner(name, type_name);
        self.record(result)
    }

    fn begin_type_inner(&mut self, name: &str, type_name: &str) -> Result<(), SerializeError> {
        let no_header = self.mode.contains(SerializeMode::NO_HEADER);

        if self.mode.is_read() {
            if no_header {
                self.frames.push(Frame { kind: FrameKind::NoHeader });
            } else {
                let header = self.track_channel_bytes(true, |slf| slf.format.read_header(slf.channel))?;
                let type_ok = type_name.is_empty() || header.type_name.is_empty() || header.type_name == type_name;
                if !type_ok {
                    return Err(SerializeError::TypeMismatch {
                        expected: type_name.to_string(),
                        found: header.type_name.clone(),
                    });
                }
                self.header_buf = header.clone();
                self.frames.push(Frame { kind: FrameKind::Read });
            }
            self.nesting += 1;
            return Ok(());
        }

        // Write or Calc direction.
        let buffered = !no_header
            && (self.mode.is_calc() || (self.mode.is_write() && self.mode.contains(SerializeMode::AUTO_CALC)));

        if buffered {
            let mut scratch = IoChannel::new();
            scratch.open("Mem:///calc size=0", ChannelMode::RW | ChannelMode::CREATE, None)?;
            self.calc_buffers.push(scratch);
            self.frames.push(Frame {
                kind: FrameKind::WriteBuffered(HeaderFrame::new(type_name, name)),
            });
        } else if no_header {
            self.frames.push(Frame { kind: FrameKind::NoHeader });
        } else {
            let header = HeaderFrame::new(type_name, name);
            self.track_channel_bytes(false, |slf| {
                let channel = active_channel!(slf);
                slf.format.write_header(channel, &header)
            })?;
            self.frames.push(Frame { kind: FrameKind::WritePlain });
        }
        self.nesting += 1;
        Ok(())
    }

    /// Closes the current frame; depth must decrement to match the
    /// matching `begin_type`. In Write with AutoCalc, back-patches the
    /// payload size now that it is known.
    pub fn end_type(&mut self) -> Result<(), SerializeError> {
        if let Some(e) = self.error.clone() {
            return Err(e);
        }
        let result = self.end_type_inner();
        self.record(result)
    }

    fn end_type_inner(&mut self) -> Result<(), SerializeError> {
        if self.nesting == 0 {
            return Err(SerializeError::NestingImbalance);
        }
        let frame = self.frames.pop().ok_or(SerializeError::NestingImbalance)?;
        self.nesting -= 1;

        match frame.kind {
            FrameKind::Read => {
                self.track_channel_bytes(true, |slf| slf.format.read_base_type_end(slf.channel))?;
            }
            FrameKind::NoHeader => {}
            FrameKind::WritePlain => {
                self.track_channel_bytes(false, |slf| {
                    let channel = active_channel!(slf);
                    slf.format.write_base_type_end(channel)
                })?;
            }
            FrameKind::WriteBuffered(mut header) => {
                let mut scratch = self.calc_buffers.pop().ok_or(SerializeError::NestingImbalance)?;
                let payload = drain_scratch(&mut scratch)?;
                header.payload_size = payload.len() as u32;

                if self.calc_buffers.is_empty() {
                    // Top-level frame: measure the header length with a
                    // throwaway probe format/channel so the real `self.format`
                    // instance's own bookkeeping (Xml's open-tag stack,
                    // Matlab's path stack) is only touched once, by the real
                    // emission below.
                    let mut probe_format = build_format(&self.format_name, &self.format_options)?;
                    let mut probe_channel = IoChannel::new();
                    probe_channel.open("Mem:///probe size=0", ChannelMode::RW | ChannelMode::CREATE, None)?;
                    probe_format.write_header(&mut probe_channel, &header)?;
                    let header_len = probe_channel.tell()? ;

                    self.header_size = header_len;
                    self.payload_size = payload.len() as u64;
                    self.max_serialize_size = header_len + payload.len() as u64;

                    if self.mode.is_write() {
                        self.track_channel_bytes(false, |slf| {
                            slf.format.write_header(slf.channel, &header)?;
                            slf.channel.write_block(&payload)?;
                            slf.format.write_base_type_end(slf.channel)
                        })?;
                    }
                    // Calc mode performs no I/O on the real channel at all
                    // (§3 invariant (b)); the sizes above are the result.
                } else {
                    let parent = self.calc_buffers.last_mut().unwrap();
                    self.format.write_header(parent, &header)?;
                    parent.write_block(&payload)?;
                    self.format.write_base_type_end(parent)?;
                }
            }
        }
        Ok(())
    }

    /// Runs `body` between a matching `begin_type`/`end_type` pair,
    /// guaranteeing `end_type` runs even if `body` returns early — the
    /// Rust-idiomatic stand-in for the spec's Drop-based scoped guard
    /// (see DESIGN.md for why a literal RAII guard holding a live borrow of
    /// `Serializer` was rejected).
    pub fn with_type<F, T>(&mut self, name: &str, type_name: &str, body: F) -> Result<T, SerializeError>
    where
        F: FnOnce(&mut Serializer<'a>) -> Result<T, SerializeError>,
    {
        self.begin_type(name, type_name)?;
        let result = body(self);
        let end_result = self.end_type();
        match result {
            Ok(value) => {
                end_result?;
                Ok(value)
            }
            Err(e) => {
                let _ = end_result;
                Err(e)
            }
        }
    }

    /// Examines the upcoming header without consuming it (format
    /// autodetection).
    pub fn peek_header(&mut self) -> Result<HeaderFrame, SerializeError> {
        if let Some(e) = self.error.clone() {
            return Err(e);
        }
        let result = self.format.peek_header(self.channel);
        self.record(result)
    }

    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    pub fn payload_size(&self) -> u64 {
        self.payload_size
    }

    pub fn max_serialize_size(&self) -> u64 {
        self.max_serialize_size
    }

    pub fn read_bytes(&self) -> u64 {
        self.rd_bytes
    }

    pub fn written_bytes(&self) -> u64 {
        self.wr_bytes
    }

    pub fn is_error_occurred(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_number(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.error_number())
    }

    pub fn last_error(&self) -> Option<&SerializeError> {
        self.error.as_ref()
    }

    pub fn clean_error(&mut self) {
        self.error = None;
        self.nesting = 0;
        self.frames.clear();
        self.calc_buffers.clear();
    }

    pub fn clear(&mut self) {
        self.clean_error();
        self.rd_bytes = 0;
        self.wr_bytes = 0;
        self.header_size = 0;
        self.payload_size = 0;
        self.max_serialize_size = 0;
        self.header_buf = HeaderFrame::default();
    }

    /// Runs `op` and folds however many bytes it moved on the *real* bound
    /// channel into `rd_bytes`/`wr_bytes` — never into Calc/AutoCalc scratch
    /// buffers, matching §3 invariant (b) ("Calc performs no I/O on the
    /// channel"). Measured as a before/after delta on `self.channel` rather
    /// than threaded through every call site, since `IoChannel` already
    /// tracks cumulative bytes moved through its driver.
    fn track_channel_bytes<T>(
        &mut self,
        is_read: bool,
        op: impl FnOnce(&mut Self) -> Result<T, SerializeError>,
    ) -> Result<T, SerializeError> {
        let top_level = self.calc_buffers.is_empty();
        let before = if top_level {
            if is_read { self.channel.bytes_read() } else { self.channel.bytes_written() }
        } else {
            0
        };
        let result = op(self);
        if top_level && result.is_ok() {
            let after = if is_read { self.channel.bytes_read() } else { self.channel.bytes_written() };
            let delta = after.saturating_sub(before);
            if is_read {
                self.rd_bytes += delta;
            } else {
                self.wr_bytes += delta;
            }
        }
        result
    }
}

fn drain_scratch(channel: &mut IoChannel) -> Result<Vec<u8>, SerializeError> {
    let len = channel.tell()? as usize;
    channel.seek(SeekFrom::Start(0))?;
    let mut buf = vec![0u8; len];
    channel.read_block(&mut buf)?;
    Ok(buf)
}

macro_rules! primitive_method {
    ($name:ident, $t:ty, $kind:expr, $variant:ident) => {
        #[doc = concat!(
            "Encodes/decodes a `",
            stringify!($t),
            "` by reference, in whichever direction the serializer is currently configured for."
        )]
        pub fn $name(&mut self, name: &str, value: &mut $t) -> Result<(), SerializeError> {
            if let Some(e) = self.error.clone() {
                return Err(e);
            }
            let is_read = self.mode.is_read();
            let result: Result<(), SerializeError> = (|| {
                if is_read {
                    let p = self.track_channel_bytes(true, |slf| {
                        let channel = active_channel!(slf);
                        slf.format.read_primitive(channel, name, $kind)
                    })?;
                    *value = match p {
                        Primitive::$variant(v) => v,
                        _ => unreachable!("wire format returned mismatched primitive kind"),
                    };
                } else {
                    self.track_channel_bytes(false, |slf| {
                        let channel = active_channel!(slf);
                        slf.format.write_primitive(channel, name, Primitive::$variant(*value))
                    })?;
                }
                Ok(())
            })();
            self.record(result)
        }
    };
}

impl<'a> Serializer<'a> {
    primitive_method!(char, i8, PrimitiveKind::Char, Char);
    primitive_method!(schar, i8, PrimitiveKind::SChar, SChar);
    primitive_method!(uchar, u8, PrimitiveKind::UChar, UChar);
    primitive_method!(sint, i16, PrimitiveKind::SInt, SInt);
    primitive_method!(usint, u16, PrimitiveKind::USInt, USInt);
    primitive_method!(int, i32, PrimitiveKind::Int, Int);
    primitive_method!(uint, u32, PrimitiveKind::UInt, UInt);
    primitive_method!(lint, i32, PrimitiveKind::LInt, LInt);
    primitive_method!(ulint, u32, PrimitiveKind::ULInt, ULInt);
    primitive_method!(ll, i64, PrimitiveKind::LL, LL);
    primitive_method!(ull, u64, PrimitiveKind::ULL, ULL);
    primitive_method!(float, f32, PrimitiveKind::Float, Float);
    primitive_method!(double, f64, PrimitiveKind::Double, Double);

    /// Encodes/decodes a length-bounded UTF-8 string.
    pub fn string(&mut self, name: &str, value: &mut String, max_len: usize) -> Result<(), SerializeError> {
        if let Some(e) = self.error.clone() {
            return Err(e);
        }
        let is_read = self.mode.is_read();
        let result: Result<(), SerializeError> = (|| {
            if is_read {
                *value = self.track_channel_bytes(true, |slf| {
                    let channel = active_channel!(slf);
                    slf.format.read_string(channel, name, max_len)
                })?;
            } else {
                self.track_channel_bytes(false, |slf| {
                    let channel = active_channel!(slf);
                    slf.format.write_string(channel, name, value, max_len)
                })?;
            }
            Ok(())
        })();
        self.record(result)
    }

    fn array_primitive<T: Copy + Default>(
        &mut self,
        name: &str,
        values: &mut Vec<T>,
        kind: PrimitiveKind,
        to_primitive: fn(T) -> Primitive,
        from_primitive: fn(Primitive) -> T,
    ) -> Result<(), SerializeError> {
        if let Some(e) = self.error.clone() {
            return Err(e);
        }
        let is_read = self.mode.is_read();
        let init_mode = self.mode.contains(SerializeMode::INIT_MODE);
        let result: Result<(), SerializeError> = (|| {
            if is_read {
                let len = self.track_channel_bytes(true, |slf| {
                    let channel = active_channel!(slf);
                    slf.format.read_array_len(channel, name)
                })?;
                if init_mode && values.is_empty() {
                    values.resize(len, T::default());
                } else if values.len() != len {
                    return Err(SerializeError::LengthMismatch {
                        expected: values.len(),
                        found: len,
                    });
                }
                for slot in values.iter_mut() {
                    let p = self.track_channel_bytes(true, |slf| {
                        let channel = active_channel!(slf);
                        slf.format.read_primitive(channel, name, kind)
                    })?;
                    *slot = from_primitive(p);
                }
            } else {
                self.track_channel_bytes(false, |slf| {
                    let channel = active_channel!(slf);
                    slf.format.write_array_len(channel, name, values.len())
                })?;
                for &v in values.iter() {
                    self.track_channel_bytes(false, |slf| {
                        let channel = active_channel!(slf);
                        slf.format.write_primitive(channel, name, to_primitive(v))
                    })?;
                }
            }
            Ok(())
        })();
        self.record(result)
    }

    pub fn array_char(&mut self, name: &str, values: &mut Vec<i8>) -> Result<(), SerializeError> {
        self.array_primitive(name, values, PrimitiveKind::Char, Primitive::Char, |p| match p {
            Primitive::Char(v) => v,
            _ => unreachable!(),
        })
    }

    pub fn array_uchar(&mut self, name: &str, values: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.array_primitive(name, values, PrimitiveKind::UChar, Primitive::UChar, |p| match p {
            Primitive::UChar(v) => v,
            _ => unreachable!(),
        })
    }

    pub fn array_int(&mut self, name: &str, values: &mut Vec<i32>) -> Result<(), SerializeError> {
        self.array_primitive(name, values, PrimitiveKind::Int, Primitive::Int, |p| match p {
            Primitive::Int(v) => v,
            _ => unreachable!(),
        })
    }

    pub fn array_uint(&mut self, name: &str, values: &mut Vec<u32>) -> Result<(), SerializeError> {
        self.array_primitive(name, values, PrimitiveKind::UInt, Primitive::UInt, |p| match p {
            Primitive::UInt(v) => v,
            _ => unreachable!(),
        })
    }

    pub fn array_double(&mut self, name: &str, values: &mut Vec<f64>) -> Result<(), SerializeError> {
        self.array_primitive(name, values, PrimitiveKind::Double, Primitive::Double, |p| match p {
            Primitive::Double(v) => v,
            _ => unreachable!(),
        })
    }

    /// `MemI8` — a raw signed-byte buffer with init-mode allocation (§8 S3).
    pub fn mem_i8(&mut self, name: &str, values: &mut Vec<i8>) -> Result<(), SerializeError> {
        self.array_char(name, values)
    }

    /// `MemUI8` — the unsigned counterpart of [`Serializer::mem_i8`].
    pub fn mem_ui8(&mut self, name: &str, values: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.array_uchar(name, values)
    }

    /// A length-N array of sub-structures, each driven by `f(serializer,
    /// index)`. Empty arrays (`*len == 0`) are valid.
    pub fn struct_array<F>(&mut self, name: &str, len: &mut usize, mut f: F) -> Result<(), SerializeError>
    where
        F: FnMut(&mut Serializer<'a>, usize) -> Result<(), SerializeError>,
    {
        if let Some(e) = self.error.clone() {
            return Err(e);
        }
        let result = self.struct_array_inner(name, len, &mut f);
        self.record(result)
    }

    fn struct_array_inner<F>(&mut self, name: &str, len: &mut usize, f: &mut F) -> Result<(), SerializeError>
    where
        F: FnMut(&mut Serializer<'a>, usize) -> Result<(), SerializeError>,
    {
        if self.mode.is_read() {
            *len = self.track_channel_bytes(true, |slf| {
                let channel = active_channel!(slf);
                slf.format.read_array_len(channel, name)
            })?;
        } else {
            self.track_channel_bytes(false, |slf| {
                let channel = active_channel!(slf);
                slf.format.write_array_len(channel, name, *len)
            })?;
        }
        for i in 0..*len {
            f(self, i)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iochannel::mode::ChannelMode;

    fn mem_channel() -> IoChannel {
        let mut c = IoChannel::new();
        c.open("Mem:///buf size=64", ChannelMode::RW | ChannelMode::CREATE, None).unwrap();
        c
    }

    #[test]
    fn nesting_balances_for_a_simple_struct() {
        let mut chan = mem_channel();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
            s.set_format("Ascii", "").unwrap();
            s.with_type("point", "Base2DI32", |s| {
                let mut x = 42;
                let mut y = 84;
                s.int("x", &mut x)?;
                s.int("y", &mut y)?;
                Ok(())
            })
            .unwrap();
            assert!(!s.is_error_occurred());
        }
    }

    #[test]
    fn nesting_imbalance_detected_on_unmatched_end() {
        let mut chan = mem_channel();
        let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
        s.set_format("Ascii", "").unwrap();
        let err = s.end_type().unwrap_err();
        assert!(matches!(err, SerializeError::NestingImbalance));
    }

    #[test]
    fn round_trip_ascii_composite() {
        let mut chan = mem_channel();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
            s.set_format("Ascii", "").unwrap();
            s.with_type("point", "Base2DI32", |s| {
                let mut x = 42;
                let mut y = -7;
                s.int("x", &mut x)?;
                s.int("y", &mut y)?;
                Ok(())
            })
            .unwrap();
        }
        chan.seek(SeekFrom::Start(0)).unwrap();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
            s.set_format("Ascii", "").unwrap();
            let mut x = 0;
            let mut y = 0;
            s.with_type("point", "Base2DI32", |s| {
                s.int("x", &mut x)?;
                s.int("y", &mut y)?;
                Ok(())
            })
            .unwrap();
            assert_eq!((x, y), (42, -7));
        }
    }

    #[test]
    fn autocalc_header_truthfulness() {
        let mut chan = mem_channel();
        let mut s = Serializer::new(&mut chan, SerializeMode::WRITE | SerializeMode::AUTO_CALC).unwrap();
        s.set_format("Binary", "").unwrap();
        s.with_type("point", "Base2DI32", |s| {
            let mut x = 1;
            let mut y = 2;
            s.int("x", &mut x)?;
            s.int("y", &mut y)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(s.payload_size(), 8);
        assert_eq!(s.max_serialize_size(), s.header_size() + s.payload_size());
    }

    #[test]
    fn calc_reports_same_total_as_write() {
        let mut chan_calc = mem_channel();
        let (calc_header, calc_payload) = {
            let mut s = Serializer::new(&mut chan_calc, SerializeMode::CALC).unwrap();
            s.set_format("Binary", "").unwrap();
            s.with_type("point", "Base2DI32", |s| {
                let mut x = 42;
                let mut y = 84;
                s.int("x", &mut x)?;
                s.int("y", &mut y)?;
                Ok(())
            })
            .unwrap();
            (s.header_size(), s.payload_size())
        };

        let mut chan_write = mem_channel();
        {
            let mut s = Serializer::new(&mut chan_write, SerializeMode::WRITE | SerializeMode::AUTO_CALC).unwrap();
            s.set_format("Binary", "").unwrap();
            s.with_type("point", "Base2DI32", |s| {
                let mut x = 42;
                let mut y = 84;
                s.int("x", &mut x)?;
                s.int("y", &mut y)?;
                Ok(())
            })
            .unwrap();
            assert_eq!(s.header_size(), calc_header);
            assert_eq!(s.payload_size(), calc_payload);
        }
    }

    #[test]
    fn init_mode_allocates_mem_i8_buffer() {
        let mut chan = mem_channel();
        let mut source: Vec<i8> = b"Hello World!\0".iter().map(|&b| b as i8).collect();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
            s.set_format("Ascii", "").unwrap();
            s.with_type("buf", "MemI8", |s| s.mem_i8("data", &mut source)).unwrap();
        }
        chan.seek(SeekFrom::Start(0)).unwrap();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
            s.set_format("Ascii", "").unwrap();
            s.set_init_mode(true);
            let mut dest: Vec<i8> = Vec::new();
            s.with_type("buf", "MemI8", |s| s.mem_i8("data", &mut dest)).unwrap();
            assert_eq!(dest, source);
        }
    }

    #[test]
    fn length_mismatch_without_init_mode() {
        let mut chan = mem_channel();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
            s.set_format("Ascii", "").unwrap();
            let mut data: Vec<i32> = vec![1, 2, 3];
            s.with_type("arr", "IntArray", |s| s.array_int("data", &mut data)).unwrap();
        }
        chan.seek(SeekFrom::Start(0)).unwrap();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
            s.set_format("Ascii", "").unwrap();
            let mut dest: Vec<i32> = vec![0, 0];
            let err = s
                .with_type("arr", "IntArray", |s| s.array_int("data", &mut dest))
                .unwrap_err();
            assert!(matches!(err, SerializeError::LengthMismatch { expected: 2, found: 3 }));
        }
    }

    #[test]
    fn struct_array_round_trips() {
        let mut chan = mem_channel();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
            s.set_format("Ascii", "").unwrap();
            let mut values = vec![10, 20, 30];
            let mut len = values.len();
            s.struct_array("items", &mut len, |s, i| {
                let mut v = values[i];
                let result = s.int("v", &mut v);
                values[i] = v;
                result
            })
            .unwrap();
        }
        chan.seek(SeekFrom::Start(0)).unwrap();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
            s.set_format("Ascii", "").unwrap();
            let mut values = vec![0; 3];
            let mut len = 0usize;
            s.struct_array("items", &mut len, |s, i| s.int("v", &mut values[i])).unwrap();
            assert_eq!(len, 3);
            assert_eq!(values, vec![10, 20, 30]);
        }
    }

    #[test]
    fn sticky_error_short_circuits_until_cleared() {
        let mut chan = mem_channel();
        let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
        s.set_format("Binary", "").unwrap();
        let err = s.begin_type("x", "Whatever").unwrap_err();
        assert!(s.is_error_occurred());
        assert_eq!(s.error_number(), Some(err.error_number()));
        let second = s.begin_type("x", "Whatever").unwrap_err();
        assert_eq!(err, second);
        s.clean_error();
        assert!(!s.is_error_occurred());
        assert_eq!(s.error_number(), None);
    }

    #[test]
    fn mode_change_rejected_mid_nesting() {
        let mut chan = mem_channel();
        let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
        s.set_format("Ascii", "").unwrap();
        s.begin_type("x", "T").unwrap();
        let err = s.set_mode(SerializeMode::READ).unwrap_err();
        assert!(matches!(err, SerializeError::ModeChangeWhileNested));
        s.end_type().unwrap();
    }

    #[test]
    fn written_bytes_tracks_plain_write_not_just_autocalc() {
        let mut chan = mem_channel();
        let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
        s.set_format("Binary", "").unwrap();
        s.with_type("point", "Base2DI32", |s| {
            let mut x = 1;
            let mut y = 2;
            s.int("x", &mut x)?;
            s.int("y", &mut y)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(s.written_bytes(), chan.tell().unwrap());
        assert!(s.written_bytes() > 0);
    }

    #[test]
    fn read_bytes_tracks_plain_read() {
        let mut chan = mem_channel();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
            s.set_format("Binary", "").unwrap();
            s.with_type("point", "Base2DI32", |s| {
                let mut x = 1;
                let mut y = 2;
                s.int("x", &mut x)?;
                s.int("y", &mut y)?;
                Ok(())
            })
            .unwrap();
        }
        let total_written = chan.tell().unwrap();
        chan.seek(SeekFrom::Start(0)).unwrap();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
            s.set_format("Binary", "").unwrap();
            let mut x = 0;
            let mut y = 0;
            s.with_type("point", "Base2DI32", |s| {
                s.int("x", &mut x)?;
                s.int("y", &mut y)?;
                Ok(())
            })
            .unwrap();
            assert_eq!(s.read_bytes(), total_written);
        }
    }

    #[test]
    fn calc_mode_does_not_perturb_real_channel_byte_counts() {
        let mut chan = mem_channel();
        let mut s = Serializer::new(&mut chan, SerializeMode::CALC).unwrap();
        s.set_format("Binary", "").unwrap();
        s.with_type("point", "Base2DI32", |s| {
            let mut x = 1;
            let mut y = 2;
            s.int("x", &mut x)?;
            s.int("y", &mut y)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(s.written_bytes(), 0);
        assert_eq!(s.read_bytes(), 0);
    }
}

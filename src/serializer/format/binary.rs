//! Binary wire format — length-prefixed, selectable-endian, byte-exact
//! round-trip. Endianness selection and the `ReadBytesExt`/`WriteBytesExt`
//! generic-over-`byteorder::{BigEndian,LittleEndian}` pattern mirror the
//! teacher's own `dtype.rs`/`swdl.rs` binary readers.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::SerializeError;
use crate::iochannel::IoChannel;
use crate::serializer::header::HeaderFrame;
use crate::serializer::primitive::{Primitive, PrimitiveKind};

use super::WireFormat;

const MAGIC: &[u8; 4] = b"BSER";
const TYPE_NAME_WIDTH: usize = 64;
const NAME_WIDTH: usize = 64;
const OPTIONS_WIDTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Big,
    Little,
}

#[derive(Debug)]
pub struct BinaryFormat {
    endian: Endian,
}

impl BinaryFormat {
    pub fn new(options: &str) -> Self {
        let endian = if options.contains("LITTLE_ENDIAN") {
            Endian::Little
        } else {
            Endian::Big
        };
        BinaryFormat { endian }
    }

    fn write_fixed_str(&self, buf: &mut Vec<u8>, s: &str, width: usize) -> Result<(), SerializeError> {
        let bytes = s.as_bytes();
        if bytes.len() >= width {
            return Err(SerializeError::StringTooLong(bytes.len()));
        }
        buf.extend_from_slice(bytes);
        buf.resize(buf.len() + (width - bytes.len()), 0);
        Ok(())
    }

    fn read_fixed_str(buf: &[u8]) -> Result<String, SerializeError> {
        let nul = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        String::from_utf8(buf[..nul].to_vec()).map_err(|_| SerializeError::BadHeader("non-UTF8 fixed string".into()))
    }

    fn read_exact_through(channel: &mut IoChannel, n: usize) -> Result<Vec<u8>, SerializeError> {
        let mut buf = vec![0u8; n];
        let got = channel.read_block(&mut buf)?;
        if got != n {
            return Err(SerializeError::BadHeader(format!("short header read: wanted {n}, got {got}")));
        }
        Ok(buf)
    }
}

impl WireFormat for BinaryFormat {
    fn name(&self) -> &'static str {
        "Binary"
    }

    fn write_header(&mut self, channel: &mut IoChannel, header: &HeaderFrame) -> Result<(), SerializeError> {
        let mut buf = Vec::with_capacity(4 + 4 + TYPE_NAME_WIDTH + NAME_WIDTH + OPTIONS_WIDTH);
        buf.extend_from_slice(MAGIC);
        match self.endian {
            Endian::Big => buf.write_u32::<BigEndian>(header.payload_size).unwrap(),
            Endian::Little => buf.write_u32::<LittleEndian>(header.payload_size).unwrap(),
        }
        self.write_fixed_str(&mut buf, &header.type_name, TYPE_NAME_WIDTH)?;
        self.write_fixed_str(&mut buf, &header.name, NAME_WIDTH)?;
        self.write_fixed_str(&mut buf, &header.options, OPTIONS_WIDTH)?;
        channel.write_block(&buf)?;
        Ok(())
    }

    fn read_header(&mut self, channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError> {
        let magic = Self::read_exact_through(channel, 4)?;
        if &magic[..] != MAGIC {
            return Err(SerializeError::BadHeader("bad magic sentinel".into()));
        }
        let size_bytes = Self::read_exact_through(channel, 4)?;
        let payload_size = match self.endian {
            Endian::Big => (&size_bytes[..]).read_u32::<BigEndian>().unwrap(),
            Endian::Little => (&size_bytes[..]).read_u32::<LittleEndian>().unwrap(),
        };
        let type_name = Self::read_fixed_str(&Self::read_exact_through(channel, TYPE_NAME_WIDTH)?)?;
        let name = Self::read_fixed_str(&Self::read_exact_through(channel, NAME_WIDTH)?)?;
        let options = Self::read_fixed_str(&Self::read_exact_through(channel, OPTIONS_WIDTH)?)?;
        Ok(HeaderFrame {
            type_name,
            name,
            payload_size,
            options,
        })
    }

    fn peek_header(&mut self, channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError> {
        // `IoChannel::peek` already ungets the probed bytes back onto the
        // channel's LIFO stack, so `read_header` below observes them as a
        // normal read would without a second unget here.
        let total = 4 + 4 + TYPE_NAME_WIDTH + NAME_WIDTH + OPTIONS_WIDTH;
        let _ = channel.peek(total)?;
        self.read_header(channel)
    }

    fn write_base_type_end(&mut self, _channel: &mut IoChannel) -> Result<(), SerializeError> {
        Ok(())
    }

    fn write_primitive(&mut self, channel: &mut IoChannel, _name: &str, value: Primitive) -> Result<(), SerializeError> {
        let mut buf = Vec::new();
        match (self.endian, value) {
            (_, Primitive::Char(v)) | (_, Primitive::SChar(v)) => buf.write_i8(v).unwrap(),
            (_, Primitive::UChar(v)) => buf.write_u8(v).unwrap(),
            (Endian::Big, Primitive::SInt(v)) => buf.write_i16::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::SInt(v)) => buf.write_i16::<LittleEndian>(v).unwrap(),
            (Endian::Big, Primitive::USInt(v)) => buf.write_u16::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::USInt(v)) => buf.write_u16::<LittleEndian>(v).unwrap(),
            (Endian::Big, Primitive::Int(v)) => buf.write_i32::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::Int(v)) => buf.write_i32::<LittleEndian>(v).unwrap(),
            (Endian::Big, Primitive::UInt(v)) => buf.write_u32::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::UInt(v)) => buf.write_u32::<LittleEndian>(v).unwrap(),
            (Endian::Big, Primitive::LInt(v)) => buf.write_i32::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::LInt(v)) => buf.write_i32::<LittleEndian>(v).unwrap(),
            (Endian::Big, Primitive::ULInt(v)) => buf.write_u32::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::ULInt(v)) => buf.write_u32::<LittleEndian>(v).unwrap(),
            (Endian::Big, Primitive::LL(v)) => buf.write_i64::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::LL(v)) => buf.write_i64::<LittleEndian>(v).unwrap(),
            (Endian::Big, Primitive::ULL(v)) => buf.write_u64::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::ULL(v)) => buf.write_u64::<LittleEndian>(v).unwrap(),
            (Endian::Big, Primitive::Float(v)) => buf.write_f32::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::Float(v)) => buf.write_f32::<LittleEndian>(v).unwrap(),
            (Endian::Big, Primitive::Double(v)) => buf.write_f64::<BigEndian>(v).unwrap(),
            (Endian::Little, Primitive::Double(v)) => buf.write_f64::<LittleEndian>(v).unwrap(),
        }
        channel.write_block(&buf)?;
        Ok(())
    }

    fn read_primitive(&mut self, channel: &mut IoChannel, _name: &str, kind: PrimitiveKind) -> Result<Primitive, SerializeError> {
        let width: usize = match kind {
            PrimitiveKind::Char | PrimitiveKind::SChar | PrimitiveKind::UChar => 1,
            PrimitiveKind::SInt | PrimitiveKind::USInt => 2,
            PrimitiveKind::Int | PrimitiveKind::UInt | PrimitiveKind::LInt | PrimitiveKind::ULInt | PrimitiveKind::Float => 4,
            PrimitiveKind::LL | PrimitiveKind::ULL | PrimitiveKind::Double => 8,
        };
        let buf = Self::read_exact_through(channel, width)?;
        let mut cur = &buf[..];
        Ok(match (self.endian, kind) {
            (_, PrimitiveKind::Char) => Primitive::Char(cur.read_i8().unwrap()),
            (_, PrimitiveKind::SChar) => Primitive::SChar(cur.read_i8().unwrap()),
            (_, PrimitiveKind::UChar) => Primitive::UChar(cur.read_u8().unwrap()),
            (Endian::Big, PrimitiveKind::SInt) => Primitive::SInt(cur.read_i16::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::SInt) => Primitive::SInt(cur.read_i16::<LittleEndian>().unwrap()),
            (Endian::Big, PrimitiveKind::USInt) => Primitive::USInt(cur.read_u16::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::USInt) => Primitive::USInt(cur.read_u16::<LittleEndian>().unwrap()),
            (Endian::Big, PrimitiveKind::Int) => Primitive::Int(cur.read_i32::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::Int) => Primitive::Int(cur.read_i32::<LittleEndian>().unwrap()),
            (Endian::Big, PrimitiveKind::UInt) => Primitive::UInt(cur.read_u32::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::UInt) => Primitive::UInt(cur.read_u32::<LittleEndian>().unwrap()),
            (Endian::Big, PrimitiveKind::LInt) => Primitive::LInt(cur.read_i32::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::LInt) => Primitive::LInt(cur.read_i32::<LittleEndian>().unwrap()),
            (Endian::Big, PrimitiveKind::ULInt) => Primitive::ULInt(cur.read_u32::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::ULInt) => Primitive::ULInt(cur.read_u32::<LittleEndian>().unwrap()),
            (Endian::Big, PrimitiveKind::LL) => Primitive::LL(cur.read_i64::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::LL) => Primitive::LL(cur.read_i64::<LittleEndian>().unwrap()),
            (Endian::Big, PrimitiveKind::ULL) => Primitive::ULL(cur.read_u64::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::ULL) => Primitive::ULL(cur.read_u64::<LittleEndian>().unwrap()),
            (Endian::Big, PrimitiveKind::Float) => Primitive::Float(cur.read_f32::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::Float) => Primitive::Float(cur.read_f32::<LittleEndian>().unwrap()),
            (Endian::Big, PrimitiveKind::Double) => Primitive::Double(cur.read_f64::<BigEndian>().unwrap()),
            (Endian::Little, PrimitiveKind::Double) => Primitive::Double(cur.read_f64::<LittleEndian>().unwrap()),
        })
    }

    fn write_string(&mut self, channel: &mut IoChannel, _name: &str, value: &str, max_len: usize) -> Result<(), SerializeError> {
        if value.len() > max_len {
            return Err(SerializeError::StringTooLong(value.len()));
        }
        let mut buf = Vec::new();
        match self.endian {
            Endian::Big => buf.write_u32::<BigEndian>(value.len() as u32).unwrap(),
            Endian::Little => buf.write_u32::<LittleEndian>(value.len() as u32).unwrap(),
        }
        buf.extend_from_slice(value.as_bytes());
        channel.write_block(&buf)?;
        Ok(())
    }

    fn read_string(&mut self, channel: &mut IoChannel, _name: &str, max_len: usize) -> Result<String, SerializeError> {
        let len_buf = Self::read_exact_through(channel, 4)?;
        let len = match self.endian {
            Endian::Big => (&len_buf[..]).read_u32::<BigEndian>().unwrap(),
            Endian::Little => (&len_buf[..]).read_u32::<LittleEndian>().unwrap(),
        } as usize;
        if len > max_len {
            return Err(SerializeError::StringTooLong(len));
        }
        let bytes = Self::read_exact_through(channel, len)?;
        String::from_utf8(bytes).map_err(|_| SerializeError::BadHeader("non-UTF8 string payload".into()))
    }

    fn write_array_len(&mut self, channel: &mut IoChannel, _name: &str, len: usize) -> Result<(), SerializeError> {
        let mut buf = Vec::new();
        match self.endian {
            Endian::Big => buf.write_u32::<BigEndian>(len as u32).unwrap(),
            Endian::Little => buf.write_u32::<LittleEndian>(len as u32).unwrap(),
        }
        channel.write_block(&buf)?;
        Ok(())
    }

    fn read_array_len(&mut self, channel: &mut IoChannel, _name: &str) -> Result<usize, SerializeError> {
        let buf = Self::read_exact_through(channel, 4)?;
        let len = match self.endian {
            Endian::Big => (&buf[..]).read_u32::<BigEndian>().unwrap(),
            Endian::Little => (&buf[..]).read_u32::<LittleEndian>().unwrap(),
        };
        Ok(len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iochannel::mode::ChannelMode;

    fn mem_channel() -> IoChannel {
        let mut c = IoChannel::new();
        c.open("Mem:///buf size=512", ChannelMode::RW | ChannelMode::CREATE, None).unwrap();
        c
    }

    #[test]
    fn header_round_trips_big_endian() {
        let mut fmt = BinaryFormat::new("");
        let mut chan = mem_channel();
        let header = HeaderFrame {
            type_name: "BaseI32".into(),
            name: "value".into(),
            payload_size: 4,
            options: String::new(),
        };
        fmt.write_header(&mut chan, &header).unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let got = fmt.read_header(&mut chan).unwrap();
        assert_eq!(got, header);
    }

    #[test]
    fn primitive_round_trips_little_endian() {
        let mut fmt = BinaryFormat::new("LITTLE_ENDIAN");
        let mut chan = mem_channel();
        fmt.write_primitive(&mut chan, "x", Primitive::Int(-12345)).unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let v = fmt.read_primitive(&mut chan, "x", PrimitiveKind::Int).unwrap();
        assert_eq!(v, Primitive::Int(-12345));
    }

    #[test]
    fn string_over_max_len_errors() {
        let mut fmt = BinaryFormat::new("");
        let mut chan = mem_channel();
        let err = fmt.write_string(&mut chan, "s", "too long", 3).unwrap_err();
        assert!(matches!(err, SerializeError::StringTooLong(8)));
    }
}

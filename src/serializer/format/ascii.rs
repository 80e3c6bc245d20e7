//! Ascii wire format — line-oriented, human-readable. `typeName name = {`
//! … `}` framing; `name = value` primitives; quoted strings for printable
//! content, `\xHH` escapes otherwise (§4.2, grounded on S1/S3 in §8).

use crate::error::SerializeError;
use crate::iochannel::IoChannel;
use crate::serializer::header::HeaderFrame;
use crate::serializer::primitive::{Primitive, PrimitiveKind};

use super::WireFormat;

#[derive(Debug)]
pub struct AsciiFormat {
    with_type: bool,
}

impl AsciiFormat {
    pub fn new(options: &str) -> Self {
        let with_type = !options.contains("WITH_TYPE=FALSE");
        AsciiFormat { with_type }
    }

    fn write_line(&self, channel: &mut IoChannel, line: &str) -> Result<(), SerializeError> {
        channel.write_block(line.as_bytes())?;
        channel.write_block(b"\n")?;
        Ok(())
    }

    fn read_line(&self, channel: &mut IoChannel) -> Result<String, SerializeError> {
        let mut line = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            let n = channel.read(&mut byte)?;
            if n == 0 {
                if line.is_empty() {
                    return Err(SerializeError::BadHeader("unexpected end of stream".into()));
                }
                break;
            }
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        String::from_utf8(line).map_err(|_| SerializeError::BadHeader("non-UTF8 line".into()))
    }

    fn quote_value(value: &str) -> String {
        if value.is_empty() || value.chars().any(|c| c.is_whitespace() || !c.is_ascii_graphic()) {
            let mut out = String::from("\"");
            for b in value.bytes() {
                if (0x20..0x7F).contains(&b) && b != b'"' && b != b'\\' {
                    out.push(b as char);
                } else {
                    out.push_str(&format!("\\x{b:02X}"));
                }
            }
            out.push('"');
            out
        } else {
            value.to_string()
        }
    }

    fn unquote_value(raw: &str) -> Result<String, SerializeError> {
        let raw = raw.trim();
        if let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            let mut out = String::new();
            let mut chars = inner.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '\\' && chars.peek() == Some(&'x') {
                    chars.next();
                    let hex: String = chars.by_ref().take(2).collect();
                    let byte = u8::from_str_radix(&hex, 16)
                        .map_err(|_| SerializeError::BadHeader("bad \\x escape".into()))?;
                    out.push(byte as char);
                } else {
                    out.push(c);
                }
            }
            Ok(out)
        } else {
            Ok(raw.to_string())
        }
    }
}

impl WireFormat for AsciiFormat {
    fn name(&self) -> &'static str {
        "Ascii"
    }

    fn write_header(&mut self, channel: &mut IoChannel, header: &HeaderFrame) -> Result<(), SerializeError> {
        let line = if self.with_type {
            format!("{} {} = {{", header.type_name, header.name)
        } else {
            format!("{} = {{", header.name)
        };
        self.write_line(channel, &line)
    }

    fn read_header(&mut self, channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError> {
        let line = self.read_line(channel)?;
        let without_brace = line
            .trim_end()
            .strip_suffix('{')
            .ok_or_else(|| SerializeError::BadHeader(format!("missing '{{' in header line {line:?}")))?
            .trim_end();
        let body = without_brace
            .strip_suffix('=')
            .ok_or_else(|| SerializeError::BadHeader(format!("missing '=' in header line {line:?}")))?
            .trim();
        if self.with_type {
            let (type_name, name) = body
                .split_once(char::is_whitespace)
                .ok_or_else(|| SerializeError::BadHeader(format!("missing type/name split in {body:?}")))?;
            Ok(HeaderFrame {
                type_name: type_name.to_string(),
                name: name.trim().to_string(),
                payload_size: 0,
                options: String::new(),
            })
        } else {
            Ok(HeaderFrame {
                type_name: String::new(),
                name: body.to_string(),
                payload_size: 0,
                options: String::new(),
            })
        }
    }

    fn peek_header(&mut self, channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError> {
        let mut probe = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            let n = channel.read(&mut byte)?;
            if n == 0 {
                break;
            }
            probe.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        channel.unget(&probe)?;
        self.read_header(channel)
    }

    fn write_base_type_end(&mut self, channel: &mut IoChannel) -> Result<(), SerializeError> {
        self.write_line(channel, "}")
    }

    fn read_base_type_end(&mut self, channel: &mut IoChannel) -> Result<(), SerializeError> {
        let line = self.read_line(channel)?;
        if line.trim() != "}" {
            return Err(SerializeError::BadHeader(format!("expected closing '}}', found {line:?}")));
        }
        Ok(())
    }

    fn write_primitive(&mut self, channel: &mut IoChannel, name: &str, value: Primitive) -> Result<(), SerializeError> {
        let text = match value {
            Primitive::Float(v) => format!("{v}"),
            Primitive::Double(v) => format!("{v}"),
            other => format!("{}", other.as_i64()),
        };
        self.write_line(channel, &format!("{name} = {text}"))
    }

    fn read_primitive(&mut self, channel: &mut IoChannel, _name: &str, kind: PrimitiveKind) -> Result<Primitive, SerializeError> {
        let line = self.read_line(channel)?;
        let value_str = line
            .split_once('=')
            .map(|(_, v)| v.trim())
            .ok_or_else(|| SerializeError::BadHeader(format!("missing '=' in primitive line {line:?}")))?;
        Ok(match kind {
            PrimitiveKind::Char | PrimitiveKind::SChar => Primitive::Char(parse_int(value_str)? as i8),
            PrimitiveKind::UChar => Primitive::UChar(parse_int(value_str)? as u8),
            PrimitiveKind::SInt => Primitive::SInt(parse_int(value_str)? as i16),
            PrimitiveKind::USInt => Primitive::USInt(parse_int(value_str)? as u16),
            PrimitiveKind::Int => Primitive::Int(parse_int(value_str)? as i32),
            PrimitiveKind::UInt => Primitive::UInt(parse_int(value_str)? as u32),
            PrimitiveKind::LInt => Primitive::LInt(parse_int(value_str)? as i32),
            PrimitiveKind::ULInt => Primitive::ULInt(parse_int(value_str)? as u32),
            PrimitiveKind::LL => Primitive::LL(parse_int(value_str)?),
            PrimitiveKind::ULL => Primitive::ULL(parse_int(value_str)? as u64),
            PrimitiveKind::Float => Primitive::Float(
                value_str.parse().map_err(|_| SerializeError::BadHeader(format!("bad float {value_str:?}")))?,
            ),
            PrimitiveKind::Double => Primitive::Double(
                value_str.parse().map_err(|_| SerializeError::BadHeader(format!("bad double {value_str:?}")))?,
            ),
        })
    }

    fn write_string(&mut self, channel: &mut IoChannel, name: &str, value: &str, max_len: usize) -> Result<(), SerializeError> {
        if value.len() > max_len {
            return Err(SerializeError::StringTooLong(value.len()));
        }
        self.write_line(channel, &format!("{name} = {}", Self::quote_value(value)))
    }

    fn read_string(&mut self, channel: &mut IoChannel, _name: &str, max_len: usize) -> Result<String, SerializeError> {
        let line = self.read_line(channel)?;
        let raw = line
            .split_once('=')
            .map(|(_, v)| v)
            .ok_or_else(|| SerializeError::BadHeader(format!("missing '=' in string line {line:?}")))?;
        let value = Self::unquote_value(raw)?;
        if value.len() > max_len {
            return Err(SerializeError::StringTooLong(value.len()));
        }
        Ok(value)
    }

    fn write_array_len(&mut self, channel: &mut IoChannel, name: &str, len: usize) -> Result<(), SerializeError> {
        self.write_line(channel, &format!("{name}.length = {len}"))
    }

    fn read_array_len(&mut self, channel: &mut IoChannel, _name: &str) -> Result<usize, SerializeError> {
        let line = self.read_line(channel)?;
        let value_str = line
            .split_once('=')
            .map(|(_, v)| v.trim())
            .ok_or_else(|| SerializeError::BadHeader(format!("missing '=' in length line {line:?}")))?;
        value_str
            .parse()
            .map_err(|_| SerializeError::BadHeader(format!("bad array length {value_str:?}")))
    }
}

fn parse_int(s: &str) -> Result<i64, SerializeError> {
    s.trim()
        .parse()
        .map_err(|_| SerializeError::BadHeader(format!("bad integer {s:?}")))
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
    fn header_round_trips_with_type() {
        let mut fmt = AsciiFormat::new("");
        let mut chan = mem_channel();
        let header = HeaderFrame::new("BBDMTag", "tag");
        fmt.write_header(&mut chan, &header).unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let got = fmt.read_header(&mut chan).unwrap();
        assert_eq!(got.type_name, "BBDMTag");
        assert_eq!(got.name, "tag");
    }

    #[test]
    fn quoted_string_round_trips() {
        let mut fmt = AsciiFormat::new("");
        let mut chan = mem_channel();
        fmt.write_string(&mut chan, "s", "Hello World!", 64).unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let got = fmt.read_string(&mut chan, "s", 64).unwrap();
        assert_eq!(got, "Hello World!");
    }

    #[test]
    fn integer_primitive_round_trips() {
        let mut fmt = AsciiFormat::new("");
        let mut chan = mem_channel();
        fmt.write_primitive(&mut chan, "timestep", Primitive::LL(123456789)).unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let got = fmt.read_primitive(&mut chan, "timestep", PrimitiveKind::LL).unwrap();
        assert_eq!(got, Primitive::LL(123456789));
    }
}

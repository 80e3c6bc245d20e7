//! Xml wire format — built on `quick_xml`, the teacher's own XML dependency
//! (already used for whole-struct serde round-trips in `swdl.rs`/`smdl.rs`).
//! `<typeName name="…">…</typeName>` framing; primitive values as element
//! text; strings escaped via `quick_xml::escape::escape`.

use quick_xml::escape::{escape, unescape};

use crate::error::SerializeError;
use crate::iochannel::IoChannel;
use crate::serializer::header::HeaderFrame;
use crate::serializer::primitive::{Primitive, PrimitiveKind};

use super::WireFormat;

#[derive(Debug, Default)]
pub struct XmlFormat {
    open_tags: Vec<String>,
}

impl XmlFormat {
    pub fn new(_options: &str) -> Self {
        XmlFormat::default()
    }

    fn write_raw(&self, channel: &mut IoChannel, text: &str) -> Result<(), SerializeError> {
        channel.write_block(text.as_bytes())?;
        Ok(())
    }

    fn read_tag(channel: &mut IoChannel) -> Result<String, SerializeError> {
        let mut tag = Vec::new();
        let mut started = false;
        loop {
            let mut byte = [0u8; 1];
            let n = channel.read(&mut byte)?;
            if n == 0 {
                return Err(SerializeError::BadHeader("unexpected end of stream in tag".into()));
            }
            if !started {
                if byte[0] == b'<' {
                    started = true;
                }
                continue;
            }
            if byte[0] == b'>' {
                break;
            }
            tag.push(byte[0]);
        }
        String::from_utf8(tag).map_err(|_| SerializeError::BadHeader("non-UTF8 tag".into()))
    }

    fn read_text_until_close(channel: &mut IoChannel) -> Result<(String, String), SerializeError> {
        let mut text = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            let n = channel.read(&mut byte)?;
            if n == 0 {
                return Err(SerializeError::BadHeader("unexpected end of stream in element".into()));
            }
            if byte[0] == b'<' {
                let rest = Self::read_tag_body(channel)?;
                let text_str =
                    String::from_utf8(text).map_err(|_| SerializeError::BadHeader("non-UTF8 text".into()))?;
                return Ok((text_str, rest));
            }
            text.push(byte[0]);
        }
    }

    fn read_tag_body(channel: &mut IoChannel) -> Result<String, SerializeError> {
        let mut tag = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            let n = channel.read(&mut byte)?;
            if n == 0 {
                return Err(SerializeError::BadHeader("unexpected end of stream in closing tag".into()));
            }
            if byte[0] == b'>' {
                break;
            }
            tag.push(byte[0]);
        }
        String::from_utf8(tag).map_err(|_| SerializeError::BadHeader("non-UTF8 tag".into()))
    }
}

impl WireFormat for XmlFormat {
    fn name(&self) -> &'static str {
        "Xml"
    }

    fn write_header(&mut self, channel: &mut IoChannel, header: &HeaderFrame) -> Result<(), SerializeError> {
        let attrs = if header.options.is_empty() {
            String::new()
        } else {
            format!(" options=\"{}\"", escape(&header.options))
        };
        self.write_raw(
            channel,
            &format!("<{} name=\"{}\"{}>", header.type_name, escape(&header.name), attrs),
        )?;
        self.open_tags.push(header.type_name.clone());
        Ok(())
    }

    fn read_header(&mut self, channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError> {
        let tag = Self::read_tag(channel)?;
        let mut parts = tag.split_whitespace();
        let type_name = parts
            .next()
            .ok_or_else(|| SerializeError::BadHeader("empty tag".into()))?
            .to_string();
        let mut name = String::new();
        let mut options = String::new();
        let rest: String = parts.collect::<Vec<_>>().join(" ");
        if let Some(idx) = rest.find("name=\"") {
            let after = &rest[idx + 6..];
            if let Some(end) = after.find('"') {
                name = unescape(&after[..end]).map_err(|_| SerializeError::BadHeader("bad escape".into()))?.to_string();
            }
        }
        if let Some(idx) = rest.find("options=\"") {
            let after = &rest[idx + 9..];
            if let Some(end) = after.find('"') {
                options = unescape(&after[..end]).map_err(|_| SerializeError::BadHeader("bad escape".into()))?.to_string();
            }
        }
        self.open_tags.push(type_name.clone());
        Ok(HeaderFrame {
            type_name,
            name,
            payload_size: 0,
            options,
        })
    }

    fn peek_header(&mut self, channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError> {
        // `peek` pulls the upcoming bytes through the driver and ungets them
        // straight back onto the channel's LIFO stack, so `read_header` below
        // observes exactly the same bytes a real read would and leaves
        // whatever it doesn't consume sitting in the unget buffer for the
        // caller's subsequent real read.
        let _probe = channel.peek(256)?;
        let depth_before = self.open_tags.len();
        let result = self.read_header(channel);
        self.open_tags.truncate(depth_before);
        result
    }

    fn write_base_type_end(&mut self, channel: &mut IoChannel) -> Result<(), SerializeError> {
        let tag = self.open_tags.pop().unwrap_or_default();
        self.write_raw(channel, &format!("</{tag}>"))
    }

    fn read_base_type_end(&mut self, channel: &mut IoChannel) -> Result<(), SerializeError> {
        let expected = self.open_tags.pop().unwrap_or_default();
        let tag = Self::read_tag(channel)?;
        let closing = tag.strip_prefix('/').unwrap_or(&tag);
        if closing != expected {
            return Err(SerializeError::BadHeader(format!(
                "expected closing tag </{expected}>, found <{tag}>"
            )));
        }
        Ok(())
    }

    fn write_primitive(&mut self, channel: &mut IoChannel, name: &str, value: Primitive) -> Result<(), SerializeError> {
        let text = match value {
            Primitive::Float(v) => format!("{v}"),
            Primitive::Double(v) => format!("{v}"),
            other => format!("{}", other.as_i64()),
        };
        self.write_raw(channel, &format!("<{name}>{}</{name}>", escape(&text)))
    }

    fn read_primitive(&mut self, channel: &mut IoChannel, _name: &str, kind: PrimitiveKind) -> Result<Primitive, SerializeError> {
        let _open = Self::read_tag(channel)?;
        let (text, _close) = Self::read_text_until_close(channel)?;
        let text = unescape(&text).map_err(|_| SerializeError::BadHeader("bad escape".into()))?;
        Ok(match kind {
            PrimitiveKind::Char | PrimitiveKind::SChar => Primitive::Char(parse_int(&text)? as i8),
            PrimitiveKind::UChar => Primitive::UChar(parse_int(&text)? as u8),
            PrimitiveKind::SInt => Primitive::SInt(parse_int(&text)? as i16),
            PrimitiveKind::USInt => Primitive::USInt(parse_int(&text)? as u16),
            PrimitiveKind::Int => Primitive::Int(parse_int(&text)? as i32),
            PrimitiveKind::UInt => Primitive::UInt(parse_int(&text)? as u32),
            PrimitiveKind::LInt => Primitive::LInt(parse_int(&text)? as i32),
            PrimitiveKind::ULInt => Primitive::ULInt(parse_int(&text)? as u32),
            PrimitiveKind::LL => Primitive::LL(parse_int(&text)?),
            PrimitiveKind::ULL => Primitive::ULL(parse_int(&text)? as u64),
            PrimitiveKind::Float => Primitive::Float(text.parse().map_err(|_| SerializeError::BadHeader(format!("bad float {text:?}")))?),
            PrimitiveKind::Double => Primitive::Double(text.parse().map_err(|_| SerializeError::BadHeader(format!("bad double {text:?}")))?),
        })
    }

    fn write_string(&mut self, channel: &mut IoChannel, name: &str, value: &str, max_len: usize) -> Result<(), SerializeError> {
        if value.len() > max_len {
            return Err(SerializeError::StringTooLong(value.len()));
        }
        self.write_raw(channel, &format!("<{name}>{}</{name}>", escape(value)))
    }

    fn read_string(&mut self, channel: &mut IoChannel, _name: &str, max_len: usize) -> Result<String, SerializeError> {
        let _open = Self::read_tag(channel)?;
        let (text, _close) = Self::read_text_until_close(channel)?;
        let value = unescape(&text).map_err(|_| SerializeError::BadHeader("bad escape".into()))?.to_string();
        if value.len() > max_len {
            return Err(SerializeError::StringTooLong(value.len()));
        }
        Ok(value)
    }

    fn write_array_len(&mut self, channel: &mut IoChannel, name: &str, len: usize) -> Result<(), SerializeError> {
        self.write_raw(channel, &format!("<{name}Length>{len}</{name}Length>"))
    }

    fn read_array_len(&mut self, channel: &mut IoChannel, _name: &str) -> Result<usize, SerializeError> {
        let _open = Self::read_tag(channel)?;
        let (text, _close) = Self::read_text_until_close(channel)?;
        text.parse().map_err(|_| SerializeError::BadHeader(format!("bad array length {text:?}")))
    }
}

fn parse_int(s: &str) -> Result<i64, SerializeError> {
    s.trim().parse().map_err(|_| SerializeError::BadHeader(format!("bad integer {s:?}")))
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
    fn primitive_round_trips() {
        let mut fmt = XmlFormat::new("");
        let mut chan = mem_channel();
        fmt.write_primitive(&mut chan, "x", Primitive::Int(42)).unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let got = fmt.read_primitive(&mut chan, "x", PrimitiveKind::Int).unwrap();
        assert_eq!(got, Primitive::Int(42));
    }

    #[test]
    fn string_with_special_chars_escapes() {
        let mut fmt = XmlFormat::new("");
        let mut chan = mem_channel();
        fmt.write_string(&mut chan, "s", "a<b>&c", 64).unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let got = fmt.read_string(&mut chan, "s", 64).unwrap();
        assert_eq!(got, "a<b>&c");
    }
}

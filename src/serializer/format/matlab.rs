//! Matlab wire format — emits executable assignment statements. Write-only
//! in practice: read is best-effort and not round-trip tested (§4.2, §9).

use crate::error::SerializeError;
use crate::iochannel::IoChannel;
use crate::serializer::header::HeaderFrame;
use crate::serializer::primitive::{Primitive, PrimitiveKind};

use super::WireFormat;

/// An array whose length has been declared (`write_array_len`) but whose
/// element values are still being collected one `write_primitive` call at a
/// time, so they can be emitted as a single bracketed `name = [ … ];`
/// assignment (§4.2) instead of one assignment per element.
#[derive(Debug)]
struct PendingArray {
    name: String,
    len: usize,
    values: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MatlabFormat {
    path: Vec<String>,
    pending_array: Option<PendingArray>,
}

impl MatlabFormat {
    pub fn new(_options: &str) -> Self {
        MatlabFormat::default()
    }

    fn full_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path.join("."), name)
        }
    }

    fn write_raw(&self, channel: &mut IoChannel, text: &str) -> Result<(), SerializeError> {
        channel.write_block(text.as_bytes())?;
        Ok(())
    }

    fn primitive_text(value: Primitive) -> String {
        match value {
            Primitive::Float(v) => format!("{v}"),
            Primitive::Double(v) => format!("{v}"),
            other => format!("{}", other.as_i64()),
        }
    }
}

impl WireFormat for MatlabFormat {
    fn name(&self) -> &'static str {
        "Matlab"
    }

    fn write_header(&mut self, _channel: &mut IoChannel, header: &HeaderFrame) -> Result<(), SerializeError> {
        // A nested type never interleaves with a still-open array of
        // primitives (array elements are written back-to-back under the
        // same name), so a pending array here can only be a stale one left
        // by a struct array's own length declaration — drop it.
        self.pending_array = None;
        self.path.push(header.name.clone());
        Ok(())
    }

    fn read_header(&mut self, _channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError> {
        // Best-effort only: Matlab assignment syntax isn't parsed back into
        // a header frame. Callers should not rely on round-tripping Matlab
        // output through this reader.
        Err(SerializeError::BadFormat("Matlab read is not supported".into()))
    }

    fn peek_header(&mut self, channel: &mut IoChannel) -> Result<HeaderFrame, SerializeError> {
        self.read_header(channel)
    }

    fn write_base_type_end(&mut self, _channel: &mut IoChannel) -> Result<(), SerializeError> {
        self.path.pop();
        Ok(())
    }

    fn write_primitive(&mut self, channel: &mut IoChannel, name: &str, value: Primitive) -> Result<(), SerializeError> {
        let text = Self::primitive_text(value);

        if let Some(pending) = &mut self.pending_array {
            if pending.name == name {
                pending.values.push(text);
                if pending.values.len() == pending.len {
                    let pending = self.pending_array.take().unwrap();
                    let joined = pending.values.join(" ");
                    return self.write_raw(channel, &format!("{} = [ {joined} ];\n", self.full_path(&pending.name)));
                }
                return Ok(());
            }
        }

        self.write_raw(channel, &format!("{} = {text};\n", self.full_path(name)))
    }

    fn read_primitive(&mut self, _channel: &mut IoChannel, _name: &str, _kind: PrimitiveKind) -> Result<Primitive, SerializeError> {
        Err(SerializeError::BadFormat("Matlab read is not supported".into()))
    }

    fn write_string(&mut self, channel: &mut IoChannel, name: &str, value: &str, max_len: usize) -> Result<(), SerializeError> {
        if value.len() > max_len {
            return Err(SerializeError::StringTooLong(value.len()));
        }
        let escaped = value.replace('\'', "''");
        self.write_raw(channel, &format!("{} = '{escaped}';\n", self.full_path(name)))
    }

    fn read_string(&mut self, _channel: &mut IoChannel, _name: &str, _max_len: usize) -> Result<String, SerializeError> {
        Err(SerializeError::BadFormat("Matlab read is not supported".into()))
    }

    fn write_array_len(&mut self, channel: &mut IoChannel, name: &str, len: usize) -> Result<(), SerializeError> {
        if len == 0 {
            return self.write_raw(channel, &format!("{} = [ ];\n", self.full_path(name)));
        }
        self.pending_array = Some(PendingArray {
            name: name.to_string(),
            len,
            values: Vec::with_capacity(len),
        });
        Ok(())
    }

    fn read_array_len(&mut self, _channel: &mut IoChannel, _name: &str) -> Result<usize, SerializeError> {
        Err(SerializeError::BadFormat("Matlab read is not supported".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iochannel::mode::ChannelMode;

    fn drain(chan: &mut IoChannel) -> String {
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = chan.read(&mut byte).unwrap();
            if n == 0 {
                break;
            }
            buf.push(byte[0]);
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn write_primitive_emits_assignment() {
        let mut fmt = MatlabFormat::new("");
        let mut chan = IoChannel::new();
        chan.open("Mem:///buf size=256", ChannelMode::RW | ChannelMode::CREATE, None).unwrap();
        fmt.write_header(&mut chan, &HeaderFrame::new("Base2DI32", "point")).unwrap();
        fmt.write_primitive(&mut chan, "x", Primitive::Int(42)).unwrap();
        fmt.write_base_type_end(&mut chan).unwrap();
        assert_eq!(drain(&mut chan), "point.x = 42;\n");
    }

    #[test]
    fn fixed_array_emits_one_bracketed_assignment() {
        let mut fmt = MatlabFormat::new("");
        let mut chan = IoChannel::new();
        chan.open("Mem:///buf size=256", ChannelMode::RW | ChannelMode::CREATE, None).unwrap();
        fmt.write_header(&mut chan, &HeaderFrame::new("IntArray", "record")).unwrap();
        fmt.write_array_len(&mut chan, "fixedInts", 3).unwrap();
        fmt.write_primitive(&mut chan, "fixedInts", Primitive::Int(1)).unwrap();
        fmt.write_primitive(&mut chan, "fixedInts", Primitive::Int(2)).unwrap();
        fmt.write_primitive(&mut chan, "fixedInts", Primitive::Int(3)).unwrap();
        fmt.write_base_type_end(&mut chan).unwrap();
        assert_eq!(drain(&mut chan), "record.fixedInts = [ 1 2 3 ];\n");
    }

    #[test]
    fn empty_array_emits_empty_brackets() {
        let mut fmt = MatlabFormat::new("");
        let mut chan = IoChannel::new();
        chan.open("Mem:///buf size=256", ChannelMode::RW | ChannelMode::CREATE, None).unwrap();
        fmt.write_header(&mut chan, &HeaderFrame::new("IntArray", "record")).unwrap();
        fmt.write_array_len(&mut chan, "fixedInts", 0).unwrap();
        fmt.write_base_type_end(&mut chan).unwrap();
        assert_eq!(drain(&mut chan), "record.fixedInts = [ ];\n");
    }
}

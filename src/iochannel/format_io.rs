//! Restricted `printf`/`scanf` formatter over [`IoChannel`] (§6.4).
//!
//! Rust has no varargs, so the original's `printf(fmt, ...)` becomes
//! `printf(fmt, &mut [PrintArg])`; `vprintf`/`vscanf` are the same call
//! taking an already-built slice, so they collapse onto `printf`/`scanf`
//! directly rather than needing separate entry points.

use super::IoChannel;
use crate::error::IoChannelError;

/// One argument consumed by [`IoChannel::printf`]. All string-producing
/// specifiers borrow; nothing here is copied further than necessary.
pub enum PrintArg<'a> {
    /// `%c` / `%qc` source.
    Char(i8),
    /// `%u` / `%hu` / `%lu` source.
    UInt(u32),
    /// `%d` / `%hd` / `%ld` source.
    Int(i32),
    /// `%f` / `%lf` source.
    Float(f64),
    /// `%Lf` source.
    LongFloat(f64),
    /// `%s` / `%qs` / `%*s` / `%*qs` / `%S` source.
    Str(&'a str),
    /// `%p` source.
    Ptr(usize),
    /// `%@` — invoked with the channel to print by whatever means it likes.
    Callback(&'a mut dyn FnMut(&mut IoChannel) -> Result<(), IoChannelError>),
}

/// One destination consumed by [`IoChannel::scanf`]. `max_len` on the string
/// variants is the bound for `%*s`/`%*qs` (the spec's "max bytes taken from
/// the caller"); `None` means unbounded.
pub enum ScanArg<'a> {
    Char(&'a mut i8),
    UInt(&'a mut u32),
    Int(&'a mut i32),
    Float(&'a mut f64),
    LongFloat(&'a mut f64),
    Str { value: &'a mut String, max_len: Option<usize> },
    Ptr(&'a mut usize),
    /// `%@` — invoked with the channel to parse by whatever means it likes.
    Callback(&'a mut dyn FnMut(&mut IoChannel) -> Result<(), IoChannelError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spec {
    Char,
    UInt,
    Int,
    Float,
    LongFloat,
    Str,
    QChar,
    QStr,
    BoundedStr,
    BoundedQStr,
    Escaped,
    Ptr,
    Callback,
}

/// Splits a format string into literal runs and specifiers, validating the
/// specifier set against §6.4 (`BadFormatSpecifier` for anything else).
fn parse_format(fmt: &str) -> Result<Vec<Result<char, Spec>>, IoChannelError> {
    let mut out = Vec::new();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(Ok(c));
            continue;
        }
        let spec = match chars.next() {
            Some('c') => Spec::Char,
            Some('u') => Spec::UInt,
            Some('d') => Spec::Int,
            Some('f') => Spec::Float,
            Some('s') => Spec::Str,
            Some('S') => Spec::Escaped,
            Some('p') => Spec::Ptr,
            Some('@') => Spec::Callback,
            Some('L') => {
                if chars.next() != Some('f') {
                    return Err(IoChannelError::BadFormatSpecifier);
                }
                Spec::LongFloat
            }
            Some('h') => match chars.next() {
                Some('u') => Spec::UInt,
                Some('d') => Spec::Int,
                _ => return Err(IoChannelError::BadFormatSpecifier),
            },
            Some('l') => match chars.next() {
                Some('u') => Spec::UInt,
                Some('d') => Spec::Int,
                Some('f') => Spec::Float,
                _ => return Err(IoChannelError::BadFormatSpecifier),
            },
            Some('q') => match chars.next() {
                Some('c') => Spec::QChar,
                Some('s') => Spec::QStr,
                _ => return Err(IoChannelError::BadFormatSpecifier),
            },
            Some('*') => match chars.next() {
                Some('s') => Spec::BoundedStr,
                Some('q') => {
                    if chars.next() != Some('s') {
                        return Err(IoChannelError::BadFormatSpecifier);
                    }
                    Spec::BoundedQStr
                }
                _ => return Err(IoChannelError::BadFormatSpecifier),
            },
            Some('%') => {
                out.push(Ok('%'));
                continue;
            }
            _ => return Err(IoChannelError::BadFormatSpecifier),
        };
        out.push(Err(spec));
    }
    Ok(out)
}

/// `%q…` quoting: single quotes for a char, double quotes for a string;
/// non-printable bytes become `\xHH`, matching `AsciiFormat::quote_value`'s
/// escaping convention (§4.2) reused here for the formatter's own `%q`/`%S`.
fn quote(value: &str, delim: char) -> String {
    let mut out = String::new();
    out.push(delim);
    for b in value.bytes() {
        if (0x20..0x7F).contains(&b) && b as char != delim && b != b'\\' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02X}"));
        }
    }
    out.push(delim);
    out
}

/// `%S` escaping: like `%q` but with no surrounding delimiter.
fn escape(value: &str) -> String {
    let mut out = String::new();
    for b in value.bytes() {
        if (0x20..0x7F).contains(&b) && b != b'\\' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02X}"));
        }
    }
    out
}

fn unescape(raw: &str) -> Result<String, IoChannelError> {
    let mut out = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'x') {
            chars.next();
            let hex: String = chars.by_ref().take(2).collect();
            let byte = u8::from_str_radix(&hex, 16).map_err(|_| IoChannelError::BadFormatSpecifier)?;
            out.push(byte as char);
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

impl IoChannel {
    /// Writes `fmt` to the channel, consuming one [`PrintArg`] per specifier
    /// (§6.4). Literal text passes through unchanged. Takes `args` by
    /// mutable slice (rather than shared) because the `%@` callback variant
    /// holds a `&mut dyn FnMut`, which is only callable through a mutable
    /// path — a shared reference can't safely reborrow it.
    pub fn printf(&mut self, fmt: &str, args: &mut [PrintArg]) -> Result<(), IoChannelError> {
        let tokens = parse_format(fmt)?;
        let mut args = args.iter_mut();
        let mut out = String::new();
        for token in tokens {
            match token {
                Ok(c) => out.push(c),
                Err(spec) => {
                    if !out.is_empty() {
                        self.write_block(out.as_bytes())?;
                        out.clear();
                    }
                    let arg = args.next().ok_or(IoChannelError::BadFormatSpecifier)?;
                    self.print_one(spec, arg)?;
                }
            }
        }
        if !out.is_empty() {
            self.write_block(out.as_bytes())?;
        }
        if args.next().is_some() {
            return Err(IoChannelError::BadFormatSpecifier);
        }
        Ok(())
    }

    fn print_one(&mut self, spec: Spec, arg: &mut PrintArg) -> Result<(), IoChannelError> {
        match (spec, arg) {
            (Spec::Char, PrintArg::Char(v)) => {
                let v = *v;
                self.write_block(&[v as u8]).map(|_| ())
            }
            (Spec::QChar, PrintArg::Char(v)) => {
                let v = *v;
                let s = quote(&(v as u8 as char).to_string(), '\'');
                self.write_block(s.as_bytes()).map(|_| ())
            }
            (Spec::UInt, PrintArg::UInt(v)) => {
                let v = *v;
                self.write_block(v.to_string().as_bytes()).map(|_| ())
            }
            (Spec::Int, PrintArg::Int(v)) => {
                let v = *v;
                self.write_block(v.to_string().as_bytes()).map(|_| ())
            }
            (Spec::Float, PrintArg::Float(v)) => {
                let v = *v;
                self.write_block(v.to_string().as_bytes()).map(|_| ())
            }
            (Spec::LongFloat, PrintArg::LongFloat(v)) => {
                let v = *v;
                self.write_block(v.to_string().as_bytes()).map(|_| ())
            }
            (Spec::Str, PrintArg::Str(v)) => {
                let v: &str = *v;
                self.write_block(v.as_bytes()).map(|_| ())
            }
            (Spec::Escaped, PrintArg::Str(v)) => {
                let v: &str = *v;
                self.write_block(escape(v).as_bytes()).map(|_| ())
            }
            (Spec::QStr, PrintArg::Str(v)) => {
                let v: &str = *v;
                self.write_block(quote(v, '"').as_bytes()).map(|_| ())
            }
            (Spec::BoundedStr, PrintArg::Str(v)) => {
                let v: &str = *v;
                self.write_block(v.as_bytes()).map(|_| ())
            }
            (Spec::BoundedQStr, PrintArg::Str(v)) => {
                let v: &str = *v;
                self.write_block(quote(v, '"').as_bytes()).map(|_| ())
            }
            (Spec::Ptr, PrintArg::Ptr(v)) => {
                let v = *v;
                self.write_block(format!("{v:#x}").as_bytes()).map(|_| ())
            }
            (Spec::Callback, PrintArg::Callback(f)) => f(self).map_err(|_| IoChannelError::CallbackWrite),
            _ => Err(IoChannelError::BadFormatSpecifier),
        }
    }

    /// Reads from the channel according to `fmt`, filling one [`ScanArg`]
    /// per specifier (§6.4). Literal text in `fmt` must match the channel's
    /// bytes exactly. Returns the number of specifiers successfully filled.
    pub fn scanf(&mut self, fmt: &str, args: &mut [ScanArg]) -> Result<usize, IoChannelError> {
        let tokens = parse_format(fmt)?;
        let mut args = args.iter_mut();
        let mut matched = 0;
        for token in tokens {
            match token {
                Ok(c) => {
                    let mut byte = [0u8; 1];
                    let n = self.read(&mut byte)?;
                    if n == 0 || byte[0] as char != c {
                        return Ok(matched);
                    }
                }
                Err(spec) => {
                    let arg = args.next().ok_or(IoChannelError::BadFormatSpecifier)?;
                    self.scan_one(spec, arg)?;
                    matched += 1;
                }
            }
        }
        Ok(matched)
    }

    fn skip_whitespace(&mut self) -> Result<(), IoChannelError> {
        loop {
            let peeked = self.peek(1)?;
            if peeked.is_empty() || !(peeked[0] as char).is_whitespace() {
                return Ok(());
            }
            let mut byte = [0u8; 1];
            self.read(&mut byte)?;
        }
    }

    fn read_token(&mut self) -> Result<String, IoChannelError> {
        self.skip_whitespace()?;
        let mut out = Vec::new();
        loop {
            let peeked = self.peek(1)?;
            if peeked.is_empty() || (peeked[0] as char).is_whitespace() {
                break;
            }
            let mut byte = [0u8; 1];
            self.read(&mut byte)?;
            out.push(byte[0]);
        }
        String::from_utf8(out).map_err(|_| IoChannelError::BadFormatSpecifier)
    }

    fn read_quoted(&mut self, delim: u8) -> Result<String, IoChannelError> {
        self.skip_whitespace()?;
        let mut open = [0u8; 1];
        if self.read(&mut open)? == 0 || open[0] != delim {
            return Err(IoChannelError::BadFormatSpecifier);
        }
        let mut raw = String::new();
        loop {
            let mut byte = [0u8; 1];
            if self.read(&mut byte)? == 0 {
                return Err(IoChannelError::BadFormatSpecifier);
            }
            if byte[0] == delim {
                break;
            }
            raw.push(byte[0] as char);
            if byte[0] == b'\\' {
                let mut next = [0u8; 1];
                if self.read(&mut next)? == 0 {
                    return Err(IoChannelError::BadFormatSpecifier);
                }
                raw.push(next[0] as char);
            }
        }
        unescape(&raw)
    }

    fn scan_one(&mut self, spec: Spec, arg: &mut ScanArg) -> Result<(), IoChannelError> {
        match (spec, arg) {
            (Spec::Char, ScanArg::Char(dst)) => {
                let mut byte = [0u8; 1];
                if self.read(&mut byte)? == 0 {
                    return Err(IoChannelError::BadFormatSpecifier);
                }
                **dst = byte[0] as i8;
                Ok(())
            }
            (Spec::QChar, ScanArg::Char(dst)) => {
                let s = self.read_quoted(b'\'')?;
                **dst = s.bytes().next().ok_or(IoChannelError::BadFormatSpecifier)? as i8;
                Ok(())
            }
            (Spec::UInt, ScanArg::UInt(dst)) => {
                **dst = self.read_token()?.parse().map_err(|_| IoChannelError::BadFormatSpecifier)?;
                Ok(())
            }
            (Spec::Int, ScanArg::Int(dst)) => {
                **dst = self.read_token()?.parse().map_err(|_| IoChannelError::BadFormatSpecifier)?;
                Ok(())
            }
            (Spec::Float, ScanArg::Float(dst)) => {
                **dst = self.read_token()?.parse().map_err(|_| IoChannelError::BadFormatSpecifier)?;
                Ok(())
            }
            (Spec::LongFloat, ScanArg::LongFloat(dst)) => {
                **dst = self.read_token()?.parse().map_err(|_| IoChannelError::BadFormatSpecifier)?;
                Ok(())
            }
            (Spec::Str, ScanArg::Str { value, .. }) => {
                **value = self.read_token()?;
                Ok(())
            }
            (Spec::Escaped, ScanArg::Str { value, .. }) => {
                let raw = self.read_token()?;
                **value = unescape(&raw)?;
                Ok(())
            }
            (Spec::QStr, ScanArg::Str { value, .. }) => {
                **value = self.read_quoted(b'"')?;
                Ok(())
            }
            (Spec::BoundedStr, ScanArg::Str { value, max_len }) => {
                let token = self.read_token()?;
                **value = bound(token, *max_len);
                Ok(())
            }
            (Spec::BoundedQStr, ScanArg::Str { value, max_len }) => {
                let token = self.read_quoted(b'"')?;
                **value = bound(token, *max_len);
                Ok(())
            }
            (Spec::Ptr, ScanArg::Ptr(dst)) => {
                let token = self.read_token()?;
                let token = token.strip_prefix("0x").unwrap_or(&token);
                **dst = usize::from_str_radix(token, 16).map_err(|_| IoChannelError::BadFormatSpecifier)?;
                Ok(())
            }
            (Spec::Callback, ScanArg::Callback(f)) => f(self).map_err(|_| IoChannelError::CallbackRead),
            _ => Err(IoChannelError::BadFormatSpecifier),
        }
    }
}

fn bound(mut s: String, max_len: Option<usize>) -> String {
    if let Some(max) = max_len {
        if s.len() > max {
            s.truncate(max);
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iochannel::mode::ChannelMode;

    fn mem_channel() -> IoChannel {
        let mut c = IoChannel::new();
        c.open("Mem:///buf size=256", ChannelMode::RW | ChannelMode::CREATE, None).unwrap();
        c
    }

    #[test]
    fn printf_formats_plain_specifiers() {
        let mut chan = mem_channel();
        chan.printf("x=%d y=%f\n", &mut [PrintArg::Int(42), PrintArg::Float(1.5)]).unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let mut buf = Vec::new();
        loop {
            let mut b = [0u8; 1];
            if chan.read(&mut b).unwrap() == 0 {
                break;
            }
            buf.push(b[0]);
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "x=42 y=1.5\n");
    }

    #[test]
    fn printf_qs_quotes_and_escapes() {
        let mut chan = mem_channel();
        chan.printf("%qs", &mut [PrintArg::Str("hi there")]).unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let mut buf = [0u8; 10];
        chan.read(&mut buf).unwrap();
        assert_eq!(&buf, b"\"hi there\"");
    }

    #[test]
    fn scanf_round_trips_int_and_float() {
        let mut chan = mem_channel();
        chan.write_block(b"x=42 y=1.5").unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let mut x = 0i32;
        let mut y = 0f64;
        let matched = chan
            .scanf("x=%d y=%f", &mut [ScanArg::Int(&mut x), ScanArg::Float(&mut y)])
            .unwrap();
        assert_eq!(matched, 2);
        assert_eq!(x, 42);
        assert_eq!(y, 1.5);
    }

    #[test]
    fn scanf_qs_unquotes() {
        let mut chan = mem_channel();
        chan.write_block(b"\"hi there\"").unwrap();
        chan.seek(std::io::SeekFrom::Start(0)).unwrap();
        let mut value = String::new();
        chan.scanf("%qs", &mut [ScanArg::Str { value: &mut value, max_len: None }])
            .unwrap();
        assert_eq!(value, "hi there");
    }

    #[test]
    fn bad_specifier_rejected() {
        let mut chan = mem_channel();
        let err = chan.printf("%z", &mut []).unwrap_err();
        assert_eq!(err, IoChannelError::BadFormatSpecifier);
    }

    #[test]
    fn callback_specifier_invokes_closure() {
        let mut chan = mem_channel();
        let mut called = false;
        let mut cb = |c: &mut IoChannel| -> Result<(), IoChannelError> {
            called = true;
            c.write_block(b"via-callback")?;
            Ok(())
        };
        chan.printf("%@", &mut [PrintArg::Callback(&mut cb)]).unwrap();
        assert!(called);
    }
}

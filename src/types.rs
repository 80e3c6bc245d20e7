//! Concrete value types used to exercise the `Serializer`/`WireFormat`
//! machinery end-to-end, and to ground the testable-property scenarios in
//! SPEC_FULL.md §8 in actual Rust structs rather than hardcoded byte
//! fixtures from the original C test suite (no `original_source/` fixture
//! file reproduces byte-for-byte in a from-scratch Rust layout; see
//! DESIGN.md).
//!
//! Each type implements [`DynSerialize`] so [`crate::registry::TypeRegistry`]
//! can resolve it by name (§4.6), and also exposes a plain `serialize`
//! inherent method so callers who already know the concrete type can drive
//! it directly without going through the trait object.

use crate::error::SerializeError;
use crate::registry::DynSerialize;
use crate::serializer::Serializer;

/// Grounded on the `Base2D*` family referenced throughout
/// `test/SerializeGeneral/TestSerialize.cpp` (e.g. `Base2DI32`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Base2DPoint {
    pub x: i32,
    pub y: i32,
}

impl Base2DPoint {
    pub fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        s.with_type(name, "Base2DPoint", |s| {
            s.int("x", &mut self.x)?;
            s.int("y", &mut self.y)?;
            Ok(())
        })
    }
}

impl DynSerialize for Base2DPoint {
    fn type_name(&self) -> &'static str {
        "Base2DPoint"
    }
    fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        Base2DPoint::serialize(self, name, s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Base2DSize {
    pub w: i32,
    pub h: i32,
}

impl Base2DSize {
    pub fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        s.with_type(name, "Base2DSize", |s| {
            s.int("w", &mut self.w)?;
            s.int("h", &mut self.h)?;
            Ok(())
        })
    }
}

impl DynSerialize for Base2DSize {
    fn type_name(&self) -> &'static str {
        "Base2DSize"
    }
    fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        Base2DSize::serialize(self, name, s)
    }
}

/// Demonstrates a nested sub-struct field (§8 S4: "a nested sub-struct").
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Base2DRect {
    pub origin: Base2DPoint,
    pub size: Base2DSize,
}

impl Base2DRect {
    pub fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        s.with_type(name, "Base2DRect", |s| {
            self.origin.serialize("origin", s)?;
            self.size.serialize("size", s)?;
            Ok(())
        })
    }
}

impl DynSerialize for Base2DRect {
    fn type_name(&self) -> &'static str {
        "Base2DRect"
    }
    fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        Base2DRect::serialize(self, name, s)
    }
}

/// Grounded on the `Test_calcsize` scenario's `Base2DI32 data1 = {42, 84}`
/// (§8 S2). Structurally identical to `Base2DPoint`; kept distinct because
/// the original test suite names it separately and callers may register it
/// under its own type name.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Base2DI32 {
    pub x: i32,
    pub y: i32,
}

impl Base2DI32 {
    pub fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        s.with_type(name, "Base2DI32", |s| {
            s.int("x", &mut self.x)?;
            s.int("y", &mut self.y)?;
            Ok(())
        })
    }
}

impl DynSerialize for Base2DI32 {
    fn type_name(&self) -> &'static str {
        "Base2DI32"
    }
    fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        Base2DI32::serialize(self, name, s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BaseBool(pub bool);

impl BaseBool {
    pub fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        s.with_type(name, "BaseBool", |s| {
            let mut raw: u8 = if self.0 { 1 } else { 0 };
            s.uchar("value", &mut raw)?;
            self.0 = raw != 0;
            Ok(())
        })
    }
}

impl DynSerialize for BaseBool {
    fn type_name(&self) -> &'static str {
        "BaseBool"
    }
    fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        BaseBool::serialize(self, name, s)
    }
}

/// A signed 32-bit character code, grounded on the `BaseC32` entry of the
/// original `BaseSerialize.c` primitive family.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BaseC32(pub i32);

impl BaseC32 {
    pub fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        s.with_type(name, "BaseC32", |s| s.int("value", &mut self.0))
    }
}

impl DynSerialize for BaseC32 {
    fn type_name(&self) -> &'static str {
        "BaseC32"
    }
    fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        BaseC32::serialize(self, name, s)
    }
}

/// A raw signed-byte buffer, grounded on §8 S3 (`MemI8`, init-mode
/// allocation on read).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemI8 {
    pub data: Vec<i8>,
}

impl MemI8 {
    pub fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        s.with_type(name, "MemI8", |s| s.mem_i8("data", &mut self.data))
    }
}

impl DynSerialize for MemI8 {
    fn type_name(&self) -> &'static str {
        "MemI8"
    }
    fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        MemI8::serialize(self, name, s)
    }
}

/// Grounded on §8 S1 (`BBDMTag { timestep = 123456789, instanceName = "" }`,
/// compared there against `Reference_BBDMSerialize.txt`). That reference
/// fixture is not present in the retrieved pack, so S1 is exercised here as
/// a round-trip/field-equality property rather than a byte-exact comparison
/// (see DESIGN.md).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BbdmTag {
    pub timestep: i64,
    pub instance_name: String,
}

impl BbdmTag {
    pub fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        s.with_type(name, "BBDMTag", |s| {
            s.ll("timestep", &mut self.timestep)?;
            s.string("instanceName", &mut self.instance_name, 256)?;
            Ok(())
        })
    }
}

impl DynSerialize for BbdmTag {
    fn type_name(&self) -> &'static str {
        "BBDMTag"
    }
    fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        BbdmTag::serialize(self, name, s)
    }
}

/// Grounded on the `ALLTYPES_INIT` macro field list recovered from
/// `test/SerializeGeneral/TestSerialize.cpp` (`ch, sch, uch, si, usi, i, ui,
/// li, uli, ll, ull, f`), extended with `d` (double) since `Primitive`
/// supports it, a fixed-length array, a quoted string, a nested sub-struct,
/// and a variable-length struct array — covering every distinct field shape
/// named across §8's testable properties in one composite record (§8 S4).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllTypes {
    pub ch: i8,
    pub sch: i8,
    pub uch: u8,
    pub si: i16,
    pub usi: u16,
    pub i: i32,
    pub ui: u32,
    pub li: i32,
    pub uli: u32,
    pub ll: i64,
    pub ull: u64,
    pub f: f32,
    pub d: f64,
    pub label: String,
    pub fixed_ints: Vec<i32>,
    pub corner: Base2DPoint,
    pub points: Vec<Base2DPoint>,
}

impl AllTypes {
    pub fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        s.with_type(name, "AllTypes", |s| {
            s.char("ch", &mut self.ch)?;
            s.schar("sch", &mut self.sch)?;
            s.uchar("uch", &mut self.uch)?;
            s.sint("si", &mut self.si)?;
            s.usint("usi", &mut self.usi)?;
            s.int("i", &mut self.i)?;
            s.uint("ui", &mut self.ui)?;
            s.lint("li", &mut self.li)?;
            s.ulint("uli", &mut self.uli)?;
            s.ll("ll", &mut self.ll)?;
            s.ull("ull", &mut self.ull)?;
            s.float("f", &mut self.f)?;
            s.double("d", &mut self.d)?;
            s.string("label", &mut self.label, 128)?;
            s.array_int("fixedInts", &mut self.fixed_ints)?;
            self.corner.serialize("corner", s)?;

            let mut len = self.points.len();
            let points = &mut self.points;
            s.struct_array("points", &mut len, |s, idx| {
                if idx >= points.len() {
                    points.push(Base2DPoint::default());
                }
                points[idx].serialize("point", s)
            })?;
            points.truncate(len);
            Ok(())
        })
    }
}

impl DynSerialize for AllTypes {
    fn type_name(&self) -> &'static str {
        "AllTypes"
    }
    fn serialize(&mut self, name: &str, s: &mut Serializer<'_>) -> Result<(), SerializeError> {
        AllTypes::serialize(self, name, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iochannel::mode::ChannelMode;
    use crate::iochannel::IoChannel;
    use crate::serializer::mode::SerializeMode;
    use std::io::SeekFrom;

    fn mem_channel() -> IoChannel {
        let mut c = IoChannel::new();
        c.open("Mem:///buf size=2048", ChannelMode::RW | ChannelMode::CREATE, None).unwrap();
        c
    }

    #[test]
    fn base2d_rect_nested_round_trip() {
        let mut chan = mem_channel();
        let mut original = Base2DRect {
            origin: Base2DPoint { x: 1, y: 2 },
            size: Base2DSize { w: 30, h: 40 },
        };
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
            s.set_format("Binary", "").unwrap();
            original.serialize("rect", &mut s).unwrap();
        }
        chan.seek(SeekFrom::Start(0)).unwrap();
        let mut decoded = Base2DRect::default();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
            s.set_format("Binary", "").unwrap();
            decoded.serialize("rect", &mut s).unwrap();
        }
        assert_eq!(decoded, original);
    }

    #[test]
    fn all_types_round_trip_through_ascii() {
        let mut chan = mem_channel();
        let mut original = AllTypes {
            ch: -1,
            sch: -2,
            uch: 200,
            si: -30000,
            usi: 60000,
            i: -123456,
            ui: 123456,
            li: -7,
            uli: 7,
            ll: -123456789012,
            ull: 123456789012,
            f: 1.5,
            d: 2.25,
            label: "hello".to_string(),
            fixed_ints: vec![1, 2, 3, 4, 5],
            corner: Base2DPoint { x: 9, y: 10 },
            points: vec![Base2DPoint { x: 1, y: 1 }, Base2DPoint { x: 2, y: 2 }, Base2DPoint { x: 3, y: 3 }],
        };
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
            s.set_format("Ascii", "").unwrap();
            original.serialize("record", &mut s).unwrap();
        }
        chan.seek(SeekFrom::Start(0)).unwrap();
        let mut decoded = AllTypes::default();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
            s.set_format("Ascii", "").unwrap();
            s.set_init_mode(true);
            decoded.serialize("record", &mut s).unwrap();
        }
        assert_eq!(decoded, original);
    }

    #[test]
    fn mem_i8_default_resolves_through_dyn_serialize() {
        let mut buf = MemI8 { data: vec![1, 2, 3] };
        assert_eq!(buf.type_name(), "MemI8");
        assert_eq!(DynSerialize::type_name(&buf as &dyn DynSerialize), "MemI8");
        let _ = &mut buf;
    }
}

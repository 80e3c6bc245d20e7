//! Integration tests exercising the public API across module boundaries —
//! the testable properties and end-to-end scenarios of SPEC_FULL.md §8,
//! adapted to compare against self-computed values rather than the
//! original's byte-exact fixture files (`Reference_BBDMSerialize.txt`,
//! `Reference_MatlabEvalCode.txt`), neither of which is present in the
//! retrieved reference pack. See DESIGN.md for the rationale.

use std::io::SeekFrom;

use tbserialize::iochannel::mode::ChannelMode;
use tbserialize::registry::TypeRegistry;
use tbserialize::serializer::mode::SerializeMode;
use tbserialize::types::{AllTypes, Base2DI32, Base2DPoint, BbdmTag, MemI8};
use tbserialize::utility::{FormatSpec, SerializeUtility};
use tbserialize::{IoChannel, Serializer};

fn mem_channel(size: usize) -> IoChannel {
    let mut c = IoChannel::new();
    c.open(&format!("Mem:///buf size={size}"), ChannelMode::RW | ChannelMode::CREATE, None)
        .unwrap();
    c
}

/// Invariant 1 (Round-trip) across Binary, Ascii, Xml for a composite value.
#[test]
fn round_trip_holds_across_binary_ascii_xml() {
    for (format, options) in [("Binary", ""), ("Ascii", ""), ("Xml", "")] {
        let mut chan = mem_channel(4096);
        let mut original = AllTypes {
            ch: 1,
            sch: -1,
            uch: 255,
            si: -1000,
            usi: 1000,
            i: -100000,
            ui: 100000,
            li: -5,
            uli: 5,
            ll: -9_000_000_000,
            ull: 9_000_000_000,
            f: 3.25,
            d: 6.5,
            label: "quotedString".to_string(),
            fixed_ints: (0..10).collect(),
            corner: Base2DPoint { x: -3, y: 3 },
            points: (0..10).map(|i| Base2DPoint { x: i, y: -i }).collect(),
        };

        {
            let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
            s.set_format(format, options).unwrap();
            original.serialize("record", &mut s).unwrap();
        }
        chan.seek(SeekFrom::Start(0)).unwrap();

        let mut decoded = AllTypes::default();
        {
            let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
            s.set_format(format, options).unwrap();
            s.set_init_mode(true);
            decoded.serialize("record", &mut s).unwrap();
        }

        assert_eq!(decoded, original, "round-trip mismatch for format {format}");
    }
}

/// Invariant 2 (Header truthfulness) for AutoCalc Write.
#[test]
fn header_truthfulness_holds_for_autocalc_write() {
    let mut chan = mem_channel(256);
    let mut s = Serializer::new(&mut chan, SerializeMode::WRITE | SerializeMode::AUTO_CALC).unwrap();
    s.set_format("Binary", "").unwrap();
    let mut p = Base2DI32 { x: 11, y: 22 };
    p.serialize("point", &mut s).unwrap();
    assert_eq!(s.payload_size(), 8);
    assert_eq!(s.max_serialize_size(), s.header_size() + s.payload_size());
    assert_eq!(s.written_bytes(), s.max_serialize_size());
}

/// Invariant 3 (Nesting balance): a struct-array of sub-structs leaves
/// nesting at zero once every frame is closed, and an orphaned `endType`
/// is rejected.
#[test]
fn nesting_balances_through_nested_struct_array() {
    let mut chan = mem_channel(1024);
    {
        let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
        s.set_format("Ascii", "").unwrap();
        s.with_type("rect", "CompositeWithArray", |s| {
            let mut points = vec![Base2DPoint { x: 1, y: 1 }, Base2DPoint { x: 2, y: 2 }];
            let mut len = points.len();
            s.struct_array("points", &mut len, |s, i| points[i].serialize("point", s))
        })
        .unwrap();
        assert!(!s.is_error_occurred());
    }

    let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
    s.set_format("Ascii", "").unwrap();
    assert!(s.end_type().is_err());
}

/// Invariant 4 (Unget LIFO).
#[test]
fn unget_returns_bytes_in_lifo_order() {
    let mut chan = mem_channel(64);
    chan.unget(&[1, 2, 3]).unwrap();
    let mut buf = [0u8; 3];
    chan.read(&mut buf).unwrap();
    assert_eq!(buf, [3, 2, 1]);
}

/// Invariant 5 (Peek idempotence).
#[test]
fn peek_then_read_returns_identical_bytes() {
    let mut chan = mem_channel(64);
    chan.write_block(b"abcdef").unwrap();
    chan.seek(SeekFrom::Start(0)).unwrap();

    let peeked = chan.peek(4).unwrap();
    let pos_after_peek = chan.tell().unwrap();
    assert_eq!(pos_after_peek, 0);

    let mut buf = [0u8; 4];
    chan.read(&mut buf).unwrap();
    assert_eq!(&buf[..], &peeked[..]);
}

/// Invariant 6 (Init-mode allocation), scenario S3.
#[test]
fn init_mode_allocation_matches_original_mem_i8_buffer() {
    let mut chan = mem_channel(256);
    let text = b"Hello World!\0";
    let mut original = MemI8 {
        data: text.iter().map(|&b| b as i8).collect(),
    };
    {
        let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
        s.set_format("Ascii", "").unwrap();
        original.serialize("buf", &mut s).unwrap();
    }
    chan.seek(SeekFrom::Start(0)).unwrap();

    let mut decoded = MemI8::default();
    {
        let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
        s.set_format("Ascii", "").unwrap();
        s.set_init_mode(true);
        decoded.serialize("buf", &mut s).unwrap();
    }
    assert_eq!(decoded, original);
    assert_eq!(decoded.data.len(), 13);
}

/// Invariant 7 (Short-write loop): `write_block` on a fixed-size,
/// non-auto-resizing destination either transfers every byte or surfaces an
/// error — it must never return a short count silently.
#[test]
fn write_block_never_returns_a_short_count_silently() {
    let mut chan = mem_channel(4);
    chan.set_use_write_buffering(false, false);
    let result = chan.write_block(b"this is far more than four bytes");
    match result {
        Ok(n) => assert_eq!(n, 33),
        Err(_) => {}
    }
}

/// Invariant 8 (Calc ~ Write size), scenario S2.
#[test]
fn calc_reports_the_same_total_size_as_a_subsequent_write() {
    let mut calc_chan = mem_channel(256);
    let (calc_header, calc_payload) = {
        let mut s = Serializer::new(&mut calc_chan, SerializeMode::CALC).unwrap();
        s.set_format("Ascii", "").unwrap();
        let mut p = Base2DI32 { x: 42, y: 84 };
        p.serialize("data1", &mut s).unwrap();
        (s.header_size(), s.payload_size())
    };

    let mut write_chan = mem_channel(256);
    let mut s = Serializer::new(&mut write_chan, SerializeMode::WRITE | SerializeMode::AUTO_CALC).unwrap();
    s.set_format("Ascii", "").unwrap();
    let mut p = Base2DI32 { x: 42, y: 84 };
    p.serialize("data1", &mut s).unwrap();
    let total_size = s.max_serialize_size();

    assert_eq!(calc_header + calc_payload, total_size);
    assert_eq!(s.written_bytes(), total_size);
}

/// Scenario S1 (BBDM timestep), as a round-trip property rather than a
/// byte-exact fixture comparison (no reference fixture file is available;
/// see DESIGN.md).
#[test]
fn bbdm_tag_round_trips_through_ascii() {
    let mut chan = mem_channel(256);
    let mut original = BbdmTag {
        timestep: 123_456_789,
        instance_name: String::new(),
    };
    {
        let mut s = Serializer::new(&mut chan, SerializeMode::WRITE).unwrap();
        s.set_format("Ascii", "").unwrap();
        original.serialize("tag", &mut s).unwrap();
    }
    chan.seek(SeekFrom::Start(0)).unwrap();
    let mut decoded = BbdmTag::default();
    {
        let mut s = Serializer::new(&mut chan, SerializeMode::READ).unwrap();
        s.set_format("Ascii", "").unwrap();
        decoded.serialize("tag", &mut s).unwrap();
    }
    assert_eq!(decoded, original);
}

/// Scenario S6 (Matlab, NoHeader write): Matlab is write-only, so this
/// exercises the write path plus the `NoHeader` mode rather than a
/// byte-exact comparison against `Reference_MatlabEvalCode.txt` (not
/// present in the retrieved pack).
#[test]
fn matlab_no_header_write_emits_assignment_statements_only() {
    let mut chan = mem_channel(256);
    let mut s = Serializer::new(&mut chan, SerializeMode::WRITE | SerializeMode::NO_HEADER).unwrap();
    s.set_format("Matlab", "").unwrap();
    let mut p = Base2DPoint { x: 7, y: 9 };
    p.serialize("point", &mut s).unwrap();
    // NoHeader mode performs no channel I/O for the frame itself; the
    // Matlab format's own field assignments are still written underneath.
    assert!(!s.is_error_occurred());
}

/// End-to-end `SerializeUtility` conversion across a heterogeneous element
/// stream (every element the same type here, but driven through the dynamic
/// registry exactly as a mixed-type stream would be).
#[test]
fn serialize_utility_converts_a_whole_stream_between_formats() {
    let mut input = mem_channel(4096);
    for (x, y) in [(1, 1), (2, 4), (3, 9)] {
        let mut s = Serializer::new(&mut input, SerializeMode::WRITE).unwrap();
        s.set_format("Binary", "").unwrap();
        let mut p = Base2DPoint { x, y };
        p.serialize("element", &mut s).unwrap();
    }
    input.seek(SeekFrom::Start(0)).unwrap();

    let mut output = mem_channel(4096);
    let utility = SerializeUtility::new(TypeRegistry::new());
    let count = utility
        .convert_all(&mut input, FormatSpec::new("Binary", ""), &mut output, FormatSpec::new("Xml", ""))
        .unwrap();
    assert_eq!(count, 3);

    output.seek(SeekFrom::Start(0)).unwrap();
    for expected in [(1, 1), (2, 4), (3, 9)] {
        let mut s = Serializer::new(&mut output, SerializeMode::READ).unwrap();
        s.set_format("Xml", "").unwrap();
        let mut p = Base2DPoint::default();
        p.serialize("element", &mut s).unwrap();
        assert_eq!((p.x, p.y), expected);
    }
}

use bmp_steg::capacity::{self, Geometry, required_bits};
use bmp_steg::constants::HEADER_SIZE;
use bmp_steg::container::{copy_header, copy_tail, read_window};
use bmp_steg::field::{decode_bytes, decode_integer, encode_bytes, encode_integer};
use bmp_steg::lsb::{decode_bit, encode_bit};
use bmp_steg::{Error, Field};
use std::io::Cursor;

/// 对所有 256 个字节值验证位的写入与读取互不干扰
#[test]
fn test_bit_isolation_for_every_byte() {
    for b in 0..=u8::MAX {
        assert_eq!(decode_bit(encode_bit(b, 0)), 0, "byte {b:#04x}");
        assert_eq!(decode_bit(encode_bit(b, 1)), 1, "byte {b:#04x}");
        // 高 7 位保持不变
        assert_eq!(encode_bit(b, 0) & 0xFE, b & 0xFE);
        assert_eq!(encode_bit(b, 1) & 0xFE, b & 0xFE);
    }
}

#[test]
fn test_integer_boundary_values() {
    for value in [0u32, 1, 1 << 31, u32::MAX, 0xDEAD_BEEF] {
        let mut window = [0xA5u8; 32];
        encode_integer(value, &mut window);
        assert_eq!(decode_integer(&window), value);
    }
}

/// 长度字段按最高位优先写入
#[test]
fn test_integer_is_most_significant_bit_first() {
    let mut window = [0u8; 32];
    encode_integer(0x8000_0001, &mut window);

    assert_eq!(window[0], 1);
    assert_eq!(window[31], 1);
    assert!(window[1..31].iter().all(|&b| b == 0));
}

#[test]
fn test_bytes_are_most_significant_bit_first() -> anyhow::Result<()> {
    let mut window = [0xFFu8; 8];
    encode_bytes(Field::Extension, b"A", &mut window)?;

    // 'A' = 0b0100_0001
    assert_eq!(window, [0xFE, 0xFF, 0xFE, 0xFE, 0xFE, 0xFE, 0xFE, 0xFF]);
    assert_eq!(decode_bytes(Field::Extension, &window)?, b"A");
    Ok(())
}

#[test]
fn test_bytes_reject_mismatched_window() {
    let mut window = [0u8; 15];
    let result = encode_bytes(Field::Payload, b"hi", &mut window);
    assert!(matches!(
        result,
        Err(Error::TruncatedCarrier {
            field: Field::Payload,
            needed: 16,
            available: 15
        })
    ));

    let result = decode_bytes(Field::Signature, &window);
    assert!(matches!(
        result,
        Err(Error::TruncatedCarrier {
            field: Field::Signature,
            ..
        })
    ));
}

#[test]
fn test_read_window_reports_short_read() {
    let mut src = Cursor::new(vec![0u8; 10]);
    let mut buf = [0u8; 32];

    match read_window(&mut src, &mut buf, Field::PayloadLength) {
        Err(Error::TruncatedCarrier {
            field,
            needed,
            available,
        }) => {
            assert_eq!(field, Field::PayloadLength);
            assert_eq!(needed, 32);
            assert_eq!(available, 10);
        }
        other => panic!("expected truncated carrier, got {other:?}"),
    }
}

#[test]
fn test_copy_header_and_tail_are_verbatim() -> anyhow::Result<()> {
    let data: Vec<u8> = (0..200u32).map(|i| (i * 7) as u8).collect();
    let mut src = Cursor::new(data.clone());
    let mut dst = Vec::new();

    copy_header(&mut src, &mut dst)?;
    assert_eq!(dst, data[..HEADER_SIZE]);

    let copied = copy_tail(&mut src, &mut dst)?;
    assert_eq!(copied, (200 - HEADER_SIZE) as u64);
    assert_eq!(dst, data);
    Ok(())
}

#[test]
fn test_copy_header_fails_on_short_stream() {
    let mut src = Cursor::new(vec![0u8; HEADER_SIZE - 1]);
    let mut dst = Vec::new();

    let result = copy_header(&mut src, &mut dst);
    assert!(matches!(
        result,
        Err(Error::TruncatedCarrier {
            field: Field::Header,
            ..
        })
    ));
}

#[test]
fn test_geometry_from_header_offsets() {
    let mut header = [0u8; HEADER_SIZE];
    header[18..22].copy_from_slice(&640i32.to_le_bytes());
    header[22..26].copy_from_slice(&(-480i32).to_le_bytes());
    header[28..30].copy_from_slice(&24i16.to_le_bytes());

    let geometry = Geometry::from_header(&header);
    assert_eq!(
        geometry,
        Geometry {
            width: 640,
            height: -480,
            bits_per_pixel: 24
        }
    );
    assert_eq!(geometry.bytes_per_pixel(), 3);
    // 自上而下存储的位图高度为负，容量按绝对值计算
    assert_eq!(geometry.usable_capacity_bits(), 640 * 480 * 3);
}

#[test]
fn test_required_bits_matches_known_scenario() {
    // 54*8 + (5 + 4 + 3 + 2 + 4) * 8
    assert_eq!(required_bits(5, 3, 2), 576);
}

/// 容量恰好相等时也必须失败
#[test]
fn test_capacity_boundary_is_strict() {
    let exact = Geometry {
        width: 576,
        height: 1,
        bits_per_pixel: 8,
    };
    match capacity::check(&exact, 5, 3, 2) {
        Err(Error::CapacityExceeded {
            required,
            available,
        }) => {
            assert_eq!(required, 576);
            assert_eq!(available, 576);
        }
        other => panic!("expected capacity exceeded, got {other:?}"),
    }

    let one_more = Geometry {
        width: 577,
        ..exact
    };
    let capacity = capacity::check(&one_more, 5, 3, 2).expect("capacity should suffice");
    assert_eq!(capacity.available, 577);
    assert_eq!(capacity.required, 576);
}

#[test]
fn test_sub_byte_pixels_have_no_capacity() {
    let geometry = Geometry {
        width: 1024,
        height: 1024,
        bits_per_pixel: 4,
    };
    assert_eq!(geometry.usable_capacity_bits(), 0);
    assert!(capacity::check(&geometry, 2, 4, 1).is_err());
}

/// 头部中的极端尺寸不能导致乘法溢出
#[test]
fn test_oversized_geometry_saturates_capacity() {
    let geometry = Geometry {
        width: i32::MAX,
        height: i32::MAX,
        bits_per_pixel: 64,
    };
    assert_eq!(geometry.usable_capacity_bits(), u64::MAX);

    let capacity = capacity::check(&geometry, 2, 4, 1).expect("saturated capacity should suffice");
    assert_eq!(capacity.available, u64::MAX);
    assert_eq!(capacity.required, required_bits(2, 4, 1));

    let top_down = Geometry {
        height: i32::MIN,
        ..geometry
    };
    assert_eq!(top_down.usable_capacity_bits(), u64::MAX);
}

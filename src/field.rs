//! # 字段编解码
//!
//! 在连续的载体字节上逐位写入或读出整数和字节序列，所有数据均按最高位优先的顺序排列。
//! 前半部分是只操作切片的纯函数，后半部分是从载体流读取窗口、再写回输出流的驱动函数。

use crate::constants::{BITS_PER_BYTE, CHUNK_SIZE, LENGTH_FIELD_BYTES};
use crate::container::read_window;
use crate::error::{Error, Field, Result};
use crate::lsb::{decode_bit, encode_bit};
use std::io::{Read, Write};

/// 长度字段对应的载体窗口。
pub type IntegerWindow = [u8; LENGTH_FIELD_BYTES];

/// 将 `value` 的 32 位按最高位优先写入 32 个载体字节。
pub fn encode_integer(value: u32, window: &mut IntegerWindow) {
    for (i, byte) in window.iter_mut().enumerate() {
        let bit = (value >> (31 - i)) & 0x1;
        *byte = encode_bit(*byte, bit as u8);
    }
}

/// [`encode_integer`] 的逆操作。
pub fn decode_integer(window: &IntegerWindow) -> u32 {
    window
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, &byte)| acc | ((decode_bit(byte) as u32) << (31 - i)))
}

/// 将 `data` 的每个字节按最高位优先写入 8 个连续的载体字节。
///
/// # Errors
///
/// `window` 的长度必须正好是 `data.len() * 8`，否则返回 [`Error::TruncatedCarrier`]。
pub fn encode_bytes(field: Field, data: &[u8], window: &mut [u8]) -> Result<()> {
    check_window(field, data.len(), window.len())?;

    for (&value, chunk) in data.iter().zip(window.chunks_exact_mut(BITS_PER_BYTE)) {
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = encode_bit(*byte, value >> (7 - i));
        }
    }

    Ok(())
}

/// [`encode_bytes`] 的逆操作，每 8 个载体字节还原出 1 个数据字节。
///
/// # Errors
///
/// `window` 的长度不是 8 的整数倍时返回 [`Error::TruncatedCarrier`]。
pub fn decode_bytes(field: Field, window: &[u8]) -> Result<Vec<u8>> {
    let len = window.len() / BITS_PER_BYTE;
    check_window(field, len, window.len())?;

    Ok(window
        .chunks_exact(BITS_PER_BYTE)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0u8, |acc, &byte| (acc << 1) | decode_bit(byte))
        })
        .collect())
}

fn check_window(field: Field, data_len: usize, window_len: usize) -> Result<()> {
    let needed = data_len * BITS_PER_BYTE;
    if window_len != needed {
        return Err(Error::TruncatedCarrier {
            field,
            needed: needed as u64,
            available: window_len as u64,
        });
    }
    Ok(())
}

/// 从载体读取 32 个字节，写入 `value` 后输出。
pub fn write_integer<R, W>(carrier: &mut R, output: &mut W, value: u32, field: Field) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut window: IntegerWindow = [0; LENGTH_FIELD_BYTES];
    read_window(carrier, &mut window, field)?;
    encode_integer(value, &mut window);
    output.write_all(&window)?;
    Ok(())
}

/// 从载体读取 32 个字节并还原长度字段。
pub fn read_integer<R: Read + ?Sized>(carrier: &mut R, field: Field) -> Result<u32> {
    let mut window: IntegerWindow = [0; LENGTH_FIELD_BYTES];
    read_window(carrier, &mut window, field)?;
    Ok(decode_integer(&window))
}

/// 把内存中的短字段 (签名、扩展名) 写入载体。
pub fn write_bytes<R, W>(carrier: &mut R, output: &mut W, data: &[u8], field: Field) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut window = vec![0u8; CHUNK_SIZE * BITS_PER_BYTE];
    for chunk in data.chunks(CHUNK_SIZE) {
        let window = &mut window[..chunk.len() * BITS_PER_BYTE];
        read_window(carrier, window, field)?;
        encode_bytes(field, chunk, window)?;
        output.write_all(window)?;
    }
    Ok(())
}

/// 从载体读出 `len` 个字节的短字段。调用者负责先检查 `len` 的上限。
pub fn read_bytes<R: Read + ?Sized>(carrier: &mut R, len: usize, field: Field) -> Result<Vec<u8>> {
    let mut window = vec![0u8; len * BITS_PER_BYTE];
    read_window(carrier, &mut window, field)?;
    decode_bytes(field, &window)
}

/// 从 `secret` 流式读取 `len` 个字节，分批写入载体。
///
/// # Errors
///
/// 载体不足时返回 [`Error::TruncatedCarrier`]；`secret` 提前结束时返回 I/O 错误。
pub fn conceal_stream<R, S, W>(
    carrier: &mut R,
    secret: &mut S,
    output: &mut W,
    len: u64,
    field: Field,
) -> Result<()>
where
    R: Read + ?Sized,
    S: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut data = vec![0u8; CHUNK_SIZE];
    let mut window = vec![0u8; CHUNK_SIZE * BITS_PER_BYTE];
    let mut remaining = len;

    while remaining > 0 {
        let n = remaining.min(CHUNK_SIZE as u64) as usize;
        let data = &mut data[..n];
        let window = &mut window[..n * BITS_PER_BYTE];

        secret.read_exact(data)?;
        read_window(carrier, window, field)?;
        encode_bytes(field, data, window)?;
        output.write_all(window)?;

        remaining -= n as u64;
    }

    Ok(())
}

/// 从载体分批读出 `len` 个字节，写入 `output`。内存占用与 `len` 无关。
pub fn reveal_stream<R, W>(carrier: &mut R, output: &mut W, len: u64, field: Field) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut window = vec![0u8; CHUNK_SIZE * BITS_PER_BYTE];
    let mut remaining = len;

    while remaining > 0 {
        let n = remaining.min(CHUNK_SIZE as u64) as usize;
        let window = &mut window[..n * BITS_PER_BYTE];

        read_window(carrier, window, field)?;
        output.write_all(&decode_bytes(field, window)?)?;

        remaining -= n as u64;
    }

    Ok(())
}

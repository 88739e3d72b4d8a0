//! # 容器读写
//!
//! 帧前后的原样拷贝：编码时先复制头部，帧写完后把剩余的像素字节逐字节复制到输出，
//! 保证输出图像的大小和未使用区域与原图完全一致。

use crate::constants::HEADER_SIZE;
use crate::error::{Error, Field, Result};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

/// 从 `src` 读满 `buf`。
///
/// 与 `read_exact` 不同，数据不足时返回 [`Error::TruncatedCarrier`]，
/// 并带上实际读到的字节数。
pub fn read_window<R: Read + ?Sized>(src: &mut R, buf: &mut [u8], field: Field) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if filled < buf.len() {
        return Err(Error::TruncatedCarrier {
            field,
            needed: buf.len() as u64,
            available: filled as u64,
        });
    }

    Ok(())
}

/// 原样复制前 [`HEADER_SIZE`] 个字节。
///
/// # Errors
///
/// 源数据不足 [`HEADER_SIZE`] 字节时返回 [`Error::TruncatedCarrier`]。
pub fn copy_header<R, W>(src: &mut R, dst: &mut W) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut header = [0u8; HEADER_SIZE];
    read_window(src, &mut header, Field::Header)?;
    dst.write_all(&header)?;
    Ok(())
}

/// 跳过头部，把读取位置放到像素数据的开头。解码时使用，不产生任何输出。
pub fn skip_header<R: Read + Seek + ?Sized>(src: &mut R) -> Result<()> {
    src.seek(SeekFrom::Start(0))?;
    let total = remaining_len(src)?;
    if total < HEADER_SIZE as u64 {
        return Err(Error::TruncatedCarrier {
            field: Field::Header,
            needed: HEADER_SIZE as u64,
            available: total,
        });
    }
    src.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
    Ok(())
}

/// 复制剩余的所有字节直到流结束，返回复制的字节数。
pub fn copy_tail<R, W>(src: &mut R, dst: &mut W) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    Ok(io::copy(src, dst)?)
}

/// 当前位置到流末尾还剩多少字节。读取位置保持不变。
pub fn remaining_len<S: Seek + ?Sized>(src: &mut S) -> Result<u64> {
    let current = src.stream_position()?;
    let end = src.seek(SeekFrom::End(0))?;
    src.seek(SeekFrom::Start(current))?;
    Ok(end.saturating_sub(current))
}

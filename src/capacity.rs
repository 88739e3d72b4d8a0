//! # 容量规划
//!
//! 根据头部中的几何信息计算载体能承载多少 bit，并在写入任何帧数据之前
//! 检查整个帧是否放得下。

use crate::constants::{
    BITS_PER_BYTE, BITS_PER_PIXEL_OFFSET, HEADER_SIZE, HEIGHT_OFFSET, LENGTH_FIELD_SIZE,
    WIDTH_OFFSET,
};
use crate::container::read_window;
use crate::error::{Error, Field, Result};
use std::io::{Read, Seek, SeekFrom};

/// 从头部固定偏移处读取的图像几何信息。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: i32,
    pub height: i32,
    pub bits_per_pixel: i16,
}

impl Geometry {
    /// 从 [`HEADER_SIZE`] 字节的头部中解析几何信息。
    pub fn from_header(header: &[u8; HEADER_SIZE]) -> Self {
        let i32_at = |offset: usize| {
            i32::from_le_bytes([
                header[offset],
                header[offset + 1],
                header[offset + 2],
                header[offset + 3],
            ])
        };

        Self {
            width: i32_at(WIDTH_OFFSET),
            height: i32_at(HEIGHT_OFFSET),
            bits_per_pixel: i16::from_le_bytes([
                header[BITS_PER_PIXEL_OFFSET],
                header[BITS_PER_PIXEL_OFFSET + 1],
            ]),
        }
    }

    /// 读取载体的头部并解析几何信息，完成后把读取位置重置到流的开头。
    ///
    /// # Errors
    ///
    /// 载体不足 [`HEADER_SIZE`] 字节时返回 [`Error::TruncatedCarrier`]。
    pub fn read<R: Read + Seek + ?Sized>(carrier: &mut R) -> Result<Self> {
        carrier.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_SIZE];
        read_window(carrier, &mut header, Field::Header)?;
        carrier.seek(SeekFrom::Start(0))?;
        Ok(Self::from_header(&header))
    }

    pub fn bytes_per_pixel(&self) -> u64 {
        (self.bits_per_pixel.max(0) as u64) / BITS_PER_BYTE as u64
    }

    /// 可用容量 (bit)：`width * height * bytes_per_pixel`。
    ///
    /// 负高度表示自上而下存储的位图，取绝对值；宽度非正时容量为零。
    /// 头部不可信，乘法溢出时取 `u64::MAX`，实际数据不足会在读取像素时报告截断。
    pub fn usable_capacity_bits(&self) -> u64 {
        let width = self.width.max(0) as u64;
        let height = self.height.unsigned_abs() as u64;
        width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(self.bytes_per_pixel()))
            .unwrap_or(u64::MAX)
    }
}

/// 整个帧需要的 bit 数，包括头部。
///
/// 两个长度字段各按 4 字节计入，与其它字段一样乘以每字节 8 个载体字节。
pub fn required_bits(signature_len: u64, extension_len: u64, payload_len: u64) -> u64 {
    let frame_bytes =
        signature_len + LENGTH_FIELD_SIZE + extension_len + payload_len + LENGTH_FIELD_SIZE;
    (HEADER_SIZE as u64 + frame_bytes) * BITS_PER_BYTE as u64
}

/// 一次成功的容量检查结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub available: u64,
    pub required: u64,
}

/// 检查载体能否容纳帧。
///
/// 可用容量必须严格大于所需容量，恰好相等也视为不足。
///
/// # Errors
///
/// 容量不足时返回 [`Error::CapacityExceeded`]。
pub fn check(
    geometry: &Geometry,
    signature_len: u64,
    extension_len: u64,
    payload_len: u64,
) -> Result<Capacity> {
    let available = geometry.usable_capacity_bits();
    let required = required_bits(signature_len, extension_len, payload_len);

    if available <= required {
        return Err(Error::CapacityExceeded {
            required,
            available,
        });
    }

    Ok(Capacity {
        available,
        required,
    })
}

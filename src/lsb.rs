//! # 位编解码
//!
//! 每个载体字节的最低有效位承载 1 bit 数据，其余 7 位保持不变。

/// 将 `bit` (只取最低位) 写入 `carrier` 的最低有效位。
#[inline]
pub fn encode_bit(carrier: u8, bit: u8) -> u8 {
    (carrier & 0xFE) | (bit & 0x1)
}

/// 取出 `carrier` 的最低有效位。
#[inline]
pub fn decode_bit(carrier: u8) -> u8 {
    carrier & 0x1
}

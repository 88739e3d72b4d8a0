//! # 错误类型模块
//!
//! 编解码核心的所有操作都返回 [`Result`]，错误种类足以让调用者区分
//! 容量不足、载体截断、签名不匹配以及长度字段损坏。

use std::fmt;
use thiserror::Error;

/// 帧中的各个字段，用于在错误中指明出错位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Header,
    Signature,
    ExtensionLength,
    Extension,
    PayloadLength,
    Payload,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Header => "header",
            Field::Signature => "signature",
            Field::ExtensionLength => "extension length",
            Field::Extension => "extension",
            Field::PayloadLength => "payload length",
            Field::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// 编解码过程中可能出现的错误。
#[derive(Debug, Error)]
pub enum Error {
    /// 载体数据在当前字段读完之前就结束了。
    #[error("carrier truncated while processing {field}: needed {needed} bytes, got {available}")]
    TruncatedCarrier {
        field: Field,
        needed: u64,
        available: u64,
    },

    /// 图像容量不足以容纳整个帧。
    #[error("not enough capacity in the carrier: required {required} bits, available {available}")]
    CapacityExceeded { required: u64, available: u64 },

    /// 签名不匹配，载体不是由本协议生成的。
    #[error("signature mismatch: expected {expected:?}, found {found:?}")]
    SignatureMismatch { expected: Vec<u8>, found: Vec<u8> },

    /// 长度字段为零，视为数据损坏。
    #[error("invalid {field}: length must be greater than zero")]
    InvalidLength { field: Field },

    /// 长度字段超出上限或超出载体剩余容量。
    #[error("{field} of {length} bytes exceeds the limit of {max} bytes")]
    LengthOutOfBounds { field: Field, length: u64, max: u64 },

    #[error("signature must not be empty")]
    EmptySignature,

    /// 状态机已经因为之前的错误中止。
    #[error("pipeline aborted by an earlier failure")]
    Aborted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 签名不匹配以外的解码错误通常表示文件损坏。
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Error::SignatureMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! # 帧协议
//!
//! 帧由五个字段按固定顺序组成：签名、扩展名长度、扩展名、数据长度、数据。
//! 编码与解码都被建模为一条线性的阶段序列，每次 `step` 只完成一个阶段，
//! 任何阶段失败都会让状态机进入 [`Stage::Failed`] 并中止后续阶段。
//!
//! ```text
//! Start → Header → Signature → ExtensionLength → Extension
//!       → PayloadLength → Payload → Tail (仅编码) → Done
//! ```

use crate::capacity::{self, Capacity, Geometry};
use crate::constants::{BITS_PER_BYTE, MAX_EXTENSION_LEN, MAX_PAYLOAD_LEN, SIGNATURE};
use crate::container::{copy_header, copy_tail, remaining_len, skip_header};
use crate::error::{Error, Field, Result};
use crate::field::{conceal_stream, read_bytes, read_integer, reveal_stream, write_bytes, write_integer};
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// 协议配置：签名以及两个长度字段的上限。编码端和解码端必须使用相同的签名。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    signature: Vec<u8>,
    max_extension_len: u32,
    max_payload_len: u32,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            signature: SIGNATURE.as_bytes().to_vec(),
            max_extension_len: MAX_EXTENSION_LEN,
            max_payload_len: MAX_PAYLOAD_LEN,
        }
    }
}

impl Protocol {
    /// 使用自定义签名创建协议。
    ///
    /// # Errors
    ///
    /// 签名为空时返回 [`Error::EmptySignature`]。
    pub fn with_signature(signature: impl Into<Vec<u8>>) -> Result<Self> {
        let signature = signature.into();
        if signature.is_empty() {
            return Err(Error::EmptySignature);
        }
        Ok(Self {
            signature,
            ..Self::default()
        })
    }

    pub fn with_max_extension_len(mut self, max: u32) -> Self {
        self.max_extension_len = max;
        self
    }

    pub fn with_max_payload_len(mut self, max: u32) -> Self {
        self.max_payload_len = max;
        self
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn max_extension_len(&self) -> u32 {
        self.max_extension_len
    }

    pub fn max_payload_len(&self) -> u32 {
        self.max_payload_len
    }

    /// 一次性完成编码，不观察中间阶段。
    pub fn encode<C, S, W>(
        &self,
        carrier: C,
        secret: S,
        extension: impl Into<Vec<u8>>,
        output: &mut W,
    ) -> Result<EncodeReport>
    where
        C: Read + Seek,
        S: Read + Seek,
        W: Write + ?Sized,
    {
        Encoder::new(self, carrier, secret, extension)?.run(output, |_| {})
    }

    /// 一次性完成解码，把数据读入内存。
    pub fn decode<R: Read + Seek>(&self, carrier: R) -> Result<Payload> {
        let mut content = Vec::new();
        let report = Decoder::new(self, carrier).run(&mut content, |_| {})?;
        Ok(Payload {
            extension: report.extension,
            content,
        })
    }
}

/// 状态机的阶段。每个值表示 "该阶段已经完成"。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Header,
    Signature,
    ExtensionLength,
    Extension,
    PayloadLength,
    Payload,
    Tail,
    Done,
    Failed,
}

impl Stage {
    /// 下一个阶段。解码没有尾部拷贝，`Payload` 之后直接结束。
    fn successor(self, copy_tail: bool) -> Stage {
        match self {
            Stage::Start => Stage::Header,
            Stage::Header => Stage::Signature,
            Stage::Signature => Stage::ExtensionLength,
            Stage::ExtensionLength => Stage::Extension,
            Stage::Extension => Stage::PayloadLength,
            Stage::PayloadLength => Stage::Payload,
            Stage::Payload if copy_tail => Stage::Tail,
            Stage::Payload | Stage::Tail => Stage::Done,
            Stage::Done => Stage::Done,
            Stage::Failed => Stage::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Header => "header",
            Stage::Signature => "signature",
            Stage::ExtensionLength => "extension length",
            Stage::Extension => "extension",
            Stage::PayloadLength => "payload length",
            Stage::Payload => "payload",
            Stage::Tail => "remaining image data",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 解码得到的秘密文件：扩展名 (含前导点) 和内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub extension: Vec<u8>,
    pub content: Vec<u8>,
}

/// 编码完成后的统计信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeReport {
    pub geometry: Geometry,
    pub capacity: Capacity,
    pub extension: Vec<u8>,
    pub payload_len: u32,
    pub tail_len: u64,
}

/// 解码完成后的统计信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeReport {
    pub extension: Vec<u8>,
    pub payload_len: u32,
}

/// 编码状态机。
///
/// 构造时就完成容量检查，因此容量不足时不会产生任何输出。
pub struct Encoder<'p, C, S> {
    protocol: &'p Protocol,
    carrier: C,
    secret: S,
    extension: Vec<u8>,
    payload_len: u32,
    geometry: Geometry,
    capacity: Capacity,
    tail_len: u64,
    stage: Stage,
}

impl<'p, C, S> Encoder<'p, C, S>
where
    C: Read + Seek,
    S: Read + Seek,
{
    /// 检查扩展名与数据长度，读取载体几何信息并完成容量检查。
    ///
    /// # Errors
    ///
    /// * 扩展名或秘密数据为空时返回 [`Error::InvalidLength`]。
    /// * 长度超过协议上限时返回 [`Error::LengthOutOfBounds`]。
    /// * 容量不足时返回 [`Error::CapacityExceeded`]。
    pub fn new(
        protocol: &'p Protocol,
        mut carrier: C,
        mut secret: S,
        extension: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let extension = extension.into();
        let extension_len = check_length(
            Field::ExtensionLength,
            extension.len() as u64,
            protocol.max_extension_len,
        )?;

        let secret_len = secret.seek(SeekFrom::End(0))?;
        secret.seek(SeekFrom::Start(0))?;
        let payload_len = check_length(Field::PayloadLength, secret_len, protocol.max_payload_len)?;

        let geometry = Geometry::read(&mut carrier)?;
        let capacity = capacity::check(
            &geometry,
            protocol.signature.len() as u64,
            extension_len as u64,
            payload_len as u64,
        )?;

        Ok(Self {
            protocol,
            carrier,
            secret,
            extension,
            payload_len,
            geometry,
            capacity,
            tail_len: 0,
            stage: Stage::Start,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// 执行一个阶段，返回新的阶段。
    ///
    /// # Errors
    ///
    /// 阶段失败时返回对应的错误，状态机进入 [`Stage::Failed`]；
    /// 之后再调用会返回 [`Error::Aborted`]。
    pub fn step<W: Write + ?Sized>(&mut self, output: &mut W) -> Result<Stage> {
        match self.stage {
            Stage::Done => return Ok(Stage::Done),
            Stage::Failed => return Err(Error::Aborted),
            _ => {}
        }

        let next = self.stage.successor(true);
        match self.advance(next, output) {
            Ok(()) => {
                self.stage = next;
                Ok(next)
            }
            Err(e) => {
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }

    fn advance<W: Write + ?Sized>(&mut self, next: Stage, output: &mut W) -> Result<()> {
        match next {
            Stage::Header => {
                self.carrier.seek(SeekFrom::Start(0))?;
                copy_header(&mut self.carrier, output)
            }
            Stage::Signature => write_bytes(
                &mut self.carrier,
                output,
                &self.protocol.signature,
                Field::Signature,
            ),
            Stage::ExtensionLength => write_integer(
                &mut self.carrier,
                output,
                self.extension.len() as u32,
                Field::ExtensionLength,
            ),
            Stage::Extension => {
                write_bytes(&mut self.carrier, output, &self.extension, Field::Extension)
            }
            Stage::PayloadLength => write_integer(
                &mut self.carrier,
                output,
                self.payload_len,
                Field::PayloadLength,
            ),
            Stage::Payload => {
                self.secret.seek(SeekFrom::Start(0))?;
                conceal_stream(
                    &mut self.carrier,
                    &mut self.secret,
                    output,
                    self.payload_len as u64,
                    Field::Payload,
                )
            }
            Stage::Tail => {
                self.tail_len = copy_tail(&mut self.carrier, output)?;
                Ok(())
            }
            Stage::Done => Ok(output.flush()?),
            Stage::Start | Stage::Failed => Ok(()),
        }
    }

    /// 依次执行所有剩余阶段，每完成一个阶段调用一次 `observe`。
    pub fn run<W, F>(mut self, output: &mut W, mut observe: F) -> Result<EncodeReport>
    where
        W: Write + ?Sized,
        F: FnMut(Stage),
    {
        while self.stage != Stage::Done {
            let stage = self.step(output)?;
            observe(stage);
        }

        Ok(EncodeReport {
            geometry: self.geometry,
            capacity: self.capacity,
            extension: self.extension,
            payload_len: self.payload_len,
            tail_len: self.tail_len,
        })
    }
}

/// 解码状态机。
///
/// 解码只读取载体，不会改写它。元数据 (签名、扩展名、长度) 可以先用
/// [`Decoder::read_metadata`] 读出，调用者据此决定输出位置后再读取数据本身。
pub struct Decoder<'p, R> {
    protocol: &'p Protocol,
    carrier: R,
    extension: Vec<u8>,
    extension_len: u32,
    payload_len: u32,
    stage: Stage,
}

impl<'p, R: Read + Seek> Decoder<'p, R> {
    pub fn new(protocol: &'p Protocol, carrier: R) -> Self {
        Self {
            protocol,
            carrier,
            extension: Vec::new(),
            extension_len: 0,
            payload_len: 0,
            stage: Stage::Start,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// 已解码的扩展名，[`Stage::Extension`] 之前为空。
    pub fn extension(&self) -> &[u8] {
        &self.extension
    }

    /// 已解码的数据长度，[`Stage::PayloadLength`] 之前为零。
    pub fn payload_len(&self) -> u32 {
        self.payload_len
    }

    /// 执行一个阶段，返回新的阶段。`output` 只在 [`Stage::Payload`] 阶段被写入。
    ///
    /// # Errors
    ///
    /// 与 [`Encoder::step`] 相同，另外签名不匹配时返回 [`Error::SignatureMismatch`]，
    /// 长度为零时返回 [`Error::InvalidLength`]。
    pub fn step<W: Write + ?Sized>(&mut self, output: &mut W) -> Result<Stage> {
        match self.stage {
            Stage::Done => return Ok(Stage::Done),
            Stage::Failed => return Err(Error::Aborted),
            _ => {}
        }

        let next = self.stage.successor(false);
        match self.advance(next, output) {
            Ok(()) => {
                self.stage = next;
                Ok(next)
            }
            Err(e) => {
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }

    fn advance<W: Write + ?Sized>(&mut self, next: Stage, output: &mut W) -> Result<()> {
        match next {
            Stage::Header => skip_header(&mut self.carrier),
            Stage::Signature => {
                let protocol = self.protocol;
                let expected = protocol.signature();
                let found = read_bytes(&mut self.carrier, expected.len(), Field::Signature)?;
                if found != expected {
                    return Err(Error::SignatureMismatch {
                        expected: expected.to_vec(),
                        found,
                    });
                }
                Ok(())
            }
            Stage::ExtensionLength => {
                let len = read_integer(&mut self.carrier, Field::ExtensionLength)?;
                self.extension_len = check_length(
                    Field::ExtensionLength,
                    len as u64,
                    self.protocol.max_extension_len,
                )?;
                self.ensure_available(Field::Extension, self.extension_len)
            }
            Stage::Extension => {
                self.extension = read_bytes(
                    &mut self.carrier,
                    self.extension_len as usize,
                    Field::Extension,
                )?;
                Ok(())
            }
            Stage::PayloadLength => {
                let len = read_integer(&mut self.carrier, Field::PayloadLength)?;
                self.payload_len =
                    check_length(Field::PayloadLength, len as u64, self.protocol.max_payload_len)?;
                self.ensure_available(Field::Payload, self.payload_len)
            }
            Stage::Payload => reveal_stream(
                &mut self.carrier,
                output,
                self.payload_len as u64,
                Field::Payload,
            ),
            Stage::Done => Ok(output.flush()?),
            Stage::Start | Stage::Tail | Stage::Failed => Ok(()),
        }
    }

    /// 在读取一个字段之前确认载体中还有足够的字节。
    fn ensure_available(&mut self, field: Field, len: u32) -> Result<()> {
        let needed = len as u64 * BITS_PER_BYTE as u64;
        let available = remaining_len(&mut self.carrier)?;
        if available < needed {
            return Err(Error::TruncatedCarrier {
                field,
                needed,
                available,
            });
        }
        Ok(())
    }

    /// 读出签名、扩展名和数据长度，停在 [`Stage::PayloadLength`]。
    pub fn read_metadata<F: FnMut(Stage)>(&mut self, mut observe: F) -> Result<&[u8]> {
        let mut sink = io::sink();
        while matches!(
            self.stage,
            Stage::Start
                | Stage::Header
                | Stage::Signature
                | Stage::ExtensionLength
                | Stage::Extension
        ) {
            let stage = self.step(&mut sink)?;
            observe(stage);
        }
        Ok(&self.extension)
    }

    /// 依次执行所有剩余阶段，数据写入 `output`。
    pub fn run<W, F>(mut self, output: &mut W, mut observe: F) -> Result<DecodeReport>
    where
        W: Write + ?Sized,
        F: FnMut(Stage),
    {
        while self.stage != Stage::Done {
            let stage = self.step(output)?;
            observe(stage);
        }

        Ok(DecodeReport {
            extension: self.extension,
            payload_len: self.payload_len,
        })
    }
}

/// 长度必须大于零且不超过上限。
fn check_length(field: Field, length: u64, max: u32) -> Result<u32> {
    if length == 0 {
        return Err(Error::InvalidLength { field });
    }
    if length > max as u64 {
        return Err(Error::LengthOutOfBounds {
            field,
            length,
            max: max as u64,
        });
    }
    Ok(length as u32)
}

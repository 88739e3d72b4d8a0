//! # bmp_steg 库
//!
//! 本库包含 BMP 图像 LSB 隐写工具的核心逻辑：逐位编解码、字段编解码、
//! 容量规划、帧协议状态机以及头部/尾部的原样拷贝。
//!
//! 核心只依赖 `Read`/`Write`/`Seek`，不涉及文件路径；文件相关的处理在 [`handler`] 中。

// 声明库包含的所有模块。

pub mod capacity;
pub mod cli;
pub mod constants;
pub mod container;
pub mod error;
pub mod field;
pub mod frame;
pub mod handler;
pub mod lsb;

pub use error::{Error, Field, Result};
pub use frame::{Decoder, Encoder, Payload, Protocol, Stage};

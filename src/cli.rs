//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use crate::constants::SIGNATURE;
use clap::Parser;
use std::path::PathBuf;

/// 一款基于 LSB (最低有效位) 隐写术的命令行工具，用于把任意文件隐藏到未压缩的 BMP 图像中，并在之后恢复。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款基于 LSB (最低有效位) 隐写术的命令行工具，用于把任意文件隐藏到未压缩的 BMP 图像中，并在之后恢复。"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令：encode (隐藏) 和 decode (恢复)。
#[derive(Parser, Debug)]
pub enum Commands {
    /// 把秘密文件 (连同其扩展名) 隐藏到 BMP 图像中。
    Encode(EncodeArgs),

    /// 从经过隐写的 BMP 图像中恢复秘密文件。
    Decode(DecodeArgs),
}

/// 'encode' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct EncodeArgs {
    /// 用作载体的 BMP 图像路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 要隐藏的秘密文件路径，必须带有扩展名。
    #[arg(short, long)]
    pub secret: PathBuf,

    /// 输出图像路径。默认为载体同目录下的 `doctored_<载体文件名>`。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 输出文件已存在时强制覆盖。
    #[arg(short, long)]
    pub force: bool,

    /// 写在帧开头的签名，解码时必须使用相同的值。
    #[arg(long, default_value = SIGNATURE)]
    pub signature: String,

    /// 不输出阶段进度和汇总信息。
    #[arg(short, long)]
    pub quiet: bool,
}

/// 'decode' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// 已隐藏数据的 BMP 图像路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 输出文件名 (不含扩展名，扩展名从图像中恢复)。
    /// 默认为载体同目录下的 `recovered_<载体文件名主干>`。
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 输出文件已存在时强制覆盖。
    #[arg(short, long)]
    pub force: bool,

    /// 编码时使用的签名。
    #[arg(long, default_value = SIGNATURE)]
    pub signature: String,

    /// 不输出阶段进度和汇总信息。
    #[arg(short, long)]
    pub quiet: bool,
}

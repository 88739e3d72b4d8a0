//! # 命令处理逻辑模块
//!
//! 包含处理 `encode` 和 `decode` 子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、校验载体图像、驱动帧协议状态机以及向用户报告结果。
//!
//! 输出总是先写入目标目录中的临时文件，只有整个流程成功后才会落盘，
//! 因此任何失败都不会留下不完整的输出文件。

use crate::cli::{DecodeArgs, EncodeArgs};
use crate::constants::{COMPRESSION_OFFSET, HEADER_SIZE};
use crate::frame::{Decoder, Encoder, Protocol, Stage};
use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use image::ImageFormat;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 处理 'Encode' 命令的执行逻辑。
///
/// 负责打开载体图像和秘密文件、校验载体格式、在创建输出之前完成容量检查，
/// 然后逐阶段写入帧，最后把结果图像落盘。
///
/// # Arguments
///
/// * `args` - 包含输入/输出路径的 `EncodeArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取输入的图像或秘密文件。
/// * 载体不是未压缩的 BMP 图像，或秘密文件没有扩展名。
/// * 图像容量不足以隐藏秘密文件。
/// * 目标文件已存在且未指定 `--force`。
/// * 编码过程中任何阶段失败，或无法写入目标文件。
pub fn handle_encode(args: EncodeArgs) -> Result<()> {
    let protocol = Protocol::with_signature(args.signature.into_bytes())
        .context("Invalid signature supplied.")?;

    let mut carrier = open_input(&args.image, "image")?;
    validate_carrier(&mut carrier, &args.image)?;

    let extension = secret_extension(&args.secret)?;
    let secret = open_input(&args.secret, "secret")?;

    let dest = args.dest.unwrap_or_else(|| default_dest(&args.image));
    ensure_writable(&dest, args.force)?;

    let encoder = Encoder::new(&protocol, carrier, secret, extension.as_bytes()).with_context(|| {
        format!(
            "Unable to hide '{}' in '{}'.",
            args.secret.to_string_lossy().red().bold(),
            args.image.to_string_lossy().red().bold()
        )
    })?;

    if !args.quiet {
        println!("{}", "[INFO] Check capacity done".bright_green().bold());
    }

    let mut temp = create_temp(&dest)?;
    let report = {
        let mut writer = BufWriter::new(temp.as_file_mut());
        encoder
            .run(&mut writer, |stage| {
                if !args.quiet {
                    log_stage(stage, true);
                }
            })
            .with_context(|| {
                "Failed to write the hidden data into the image. \nThe image file may be corrupt or truncated."
            })?
    };

    persist(temp, &dest, args.force)?;

    if !args.quiet {
        println!();
        print_row("Source image", args.image.to_string_lossy().normal());
        print_row(
            "Image geometry",
            format!("{} x {}", report.geometry.width, report.geometry.height).normal(),
        );
        print_row(
            "Bits per pixel",
            report.geometry.bits_per_pixel.to_string().normal(),
        );
        print_row(
            "Image capacity",
            format!("{} bits", report.capacity.available).green(),
        );
        print_row(
            "Required",
            format!("{} bits", report.capacity.required).normal(),
        );
        print_row("Secret file", args.secret.to_string_lossy().normal());
        print_row("Secret extension", extension.normal());
        print_row("Secret size", format!("{} bytes", report.payload_len).normal());
        print_row("Stego image", dest.to_string_lossy().normal());
    }

    println!(
        "The secret file has been successfully hidden and saved: {}",
        dest.to_string_lossy().green().bold()
    );

    Ok(())
}

/// 处理 'Decode' 命令的执行逻辑。
///
/// 负责打开经过隐写的图像、校验签名并读出元数据，根据恢复的扩展名确定输出路径，
/// 最后把秘密文件内容写入该路径。
///
/// # Arguments
///
/// * `args` - 包含输入/输出路径的 `DecodeArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取输入的图像文件，或它不是未压缩的 BMP 图像。
/// * 图像中没有可识别的签名 (不是由本工具生成的图像)。
/// * 长度字段损坏、数据被截断，或恢复出的扩展名不安全。
/// * 目标文件已存在且未指定 `--force`，或无法写入目标文件。
pub fn handle_decode(args: DecodeArgs) -> Result<()> {
    let protocol = Protocol::with_signature(args.signature.into_bytes())
        .context("Invalid signature supplied.")?;

    let mut carrier = open_input(&args.image, "image")?;
    validate_carrier(&mut carrier, &args.image)?;

    let mut decoder = Decoder::new(&protocol, carrier);
    let extension = decoder
        .read_metadata(|stage| {
            if !args.quiet {
                log_stage(stage, false);
            }
        })
        .map_err(|e| {
            let message = if e.is_signature_mismatch() {
                format!(
                    "'{}' does not contain a recognized hidden file.",
                    args.image.to_string_lossy().red().bold()
                )
            } else {
                format!(
                    "Failed to read the hidden file metadata from '{}'. \nThe image appears to be corrupted.",
                    args.image.to_string_lossy().red().bold()
                )
            };
            anyhow::Error::new(e).context(message)
        })?;

    let extension = recovered_extension(extension)?;
    let stem = args
        .output
        .map(|path| path.with_extension(""))
        .unwrap_or_else(|| default_stem(&args.image));
    let dest = append_extension(&stem, &extension);
    ensure_writable(&dest, args.force)?;

    let mut temp = create_temp(&dest)?;
    let report = {
        let mut writer = BufWriter::new(temp.as_file_mut());
        decoder
            .run(&mut writer, |stage| {
                if !args.quiet {
                    log_stage(stage, false);
                }
            })
            .with_context(|| {
                format!(
                    "Failed to recover the hidden file from '{}'. \nThe data appears to be corrupted or truncated.",
                    args.image.to_string_lossy().red().bold()
                )
            })?
    };

    persist(temp, &dest, args.force)?;

    if !args.quiet {
        println!();
        print_row("Source image", args.image.to_string_lossy().normal());
        print_row("Secret extension", extension.normal());
        print_row("Secret size", format!("{} bytes", report.payload_len).normal());
        print_row("Secret file", dest.to_string_lossy().normal());
    }

    println!(
        "The secret file has been successfully recovered and saved: {}",
        dest.to_string_lossy().green().bold()
    );

    Ok(())
}

fn open_input(path: &Path, kind: &str) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| {
        format!(
            "Unable to read {} file: {}",
            kind,
            path.to_string_lossy().red().bold()
        )
    })?;
    Ok(BufReader::new(file))
}

/// 载体必须是未压缩的 BMP 图像，且至少包含完整的头部。
fn validate_carrier<R: Read + Seek>(carrier: &mut R, path: &Path) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE];
    carrier.read_exact(&mut header).with_context(|| {
        format!(
            "Image file is too small to contain a BMP header: {}",
            path.to_string_lossy().red().bold()
        )
    })?;
    carrier.rewind()?;

    let format = image::guess_format(&header).with_context(|| {
        format!(
            "Unrecognized image format: {}",
            path.to_string_lossy().red().bold()
        )
    })?;
    anyhow::ensure!(
        format == ImageFormat::Bmp,
        "Only BMP images can be used as carriers, got {:?}: {}",
        format,
        path.to_string_lossy().red().bold()
    );

    let compression = u32::from_le_bytes([
        header[COMPRESSION_OFFSET],
        header[COMPRESSION_OFFSET + 1],
        header[COMPRESSION_OFFSET + 2],
        header[COMPRESSION_OFFSET + 3],
    ]);
    anyhow::ensure!(
        compression == 0,
        "Compressed BMP images are not supported (compression type {}): {}",
        compression.to_string().red().bold(),
        path.to_string_lossy().red().bold()
    );

    Ok(())
}

/// 秘密文件的扩展名，带前导点，例如 `.txt`。
fn secret_extension(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .with_context(|| {
            format!(
                "Secret file must have a UTF-8 file extension: {}",
                path.to_string_lossy().red().bold()
            )
        })?;
    Ok(format!(".{extension}"))
}

/// 恢复出的扩展名来自图像数据，不可信，拼接路径之前必须检查。
fn recovered_extension(raw: &[u8]) -> Result<String> {
    let extension =
        std::str::from_utf8(raw).context("The recovered file extension is not valid UTF-8.")?;

    anyhow::ensure!(
        !extension.contains(['/', '\\', '\0']) && !extension.contains(".."),
        "The recovered file extension is unsafe: {}",
        extension.escape_debug().to_string().red().bold()
    );

    Ok(extension.to_string())
}

fn default_dest(image: &Path) -> PathBuf {
    let name = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.bmp".to_string());
    image.with_file_name(format!("doctored_{name}"))
}

fn default_stem(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    image.with_file_name(format!("recovered_{stem}"))
}

fn append_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(extension);
    PathBuf::from(name)
}

fn ensure_writable(dest: &Path, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || !dest.exists(),
        "Output file already exists: {}. \nUse --force to overwrite it.",
        dest.to_string_lossy().red().bold()
    );
    Ok(())
}

/// 在目标文件所在目录创建临时文件，保证之后的重命名不会跨文件系统。
fn create_temp(dest: &Path) -> Result<NamedTempFile> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tempfile::Builder::new()
        .prefix(".bmp_steg")
        .tempfile_in(&dir)
        .with_context(|| {
            format!(
                "Unable to create a temporary file in: {}",
                dir.to_string_lossy().red().bold()
            )
        })
}

fn persist(mut temp: NamedTempFile, dest: &Path, force: bool) -> Result<()> {
    temp.as_file_mut().flush()?;
    let result = if force {
        temp.persist(dest)
    } else {
        temp.persist_noclobber(dest)
    };
    result.map_err(|e| e.error).with_context(|| {
        format!(
            "Unable to write to target file: {}",
            dest.to_string_lossy().red().bold()
        )
    })?;
    Ok(())
}

/// 每完成一个阶段输出一行进度信息。
fn log_stage(stage: Stage, encoding: bool) {
    let verb = if encoding { "encoded" } else { "decoded" };
    let line = match stage {
        Stage::Header if encoding => "[INFO] Header copied successfully".to_string(),
        Stage::Header => "[INFO] Header skipped".to_string(),
        Stage::Signature if !encoding => "[INFO] Signature verified successfully".to_string(),
        Stage::Tail => format!("[INFO] {} copied successfully", capitalize(stage)),
        Stage::Done => return,
        Stage::Start | Stage::Failed => return,
        _ => format!("[INFO] {} {} successfully", capitalize(stage), verb),
    };

    let line = match stage {
        Stage::Header => line.bright_yellow(),
        Stage::Signature => line.bright_blue(),
        Stage::ExtensionLength | Stage::PayloadLength => line.bright_magenta(),
        Stage::Extension | Stage::Payload => line.bright_cyan(),
        _ => line.bright_red(),
    };
    println!("{}", line.bold());
}

fn capitalize(stage: Stage) -> String {
    let name = stage.to_string();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    }
}

fn print_row(label: &str, value: ColoredString) {
    println!("{}{}", format!("{:<18}", format!("{label}:")).bold(), value);
}

/// BMP 文件的标准头部大小 (字节)。
/// 头部原样复制，帧从像素数据的第一个字节开始。
pub const HEADER_SIZE: usize = 54;

/// 帧开头写入的默认签名。
/// 解码时先校验它，不匹配则说明图像不是由本工具生成的。
pub const SIGNATURE: &str = "#*";

/// 每个载体字节只承载 1 bit，因此一个数据字节需要 8 个载体字节。
pub const BITS_PER_BYTE: usize = 8;

/// 长度字段为 `u32`，按 1 bit/字节 需要 32 个载体字节，与数值大小无关。
pub const LENGTH_FIELD_BYTES: usize = 32;

/// 长度字段在容量计算中按 4 字节计 (32 bit)。
pub const LENGTH_FIELD_SIZE: u64 = 4;

/// 头部中宽度 (`i32`, 小端) 的偏移量。
pub const WIDTH_OFFSET: usize = 18;

/// 头部中高度 (`i32`, 小端) 的偏移量。
pub const HEIGHT_OFFSET: usize = 22;

/// 头部中每像素位数 (`i16`, 小端) 的偏移量。
pub const BITS_PER_PIXEL_OFFSET: usize = 28;

/// 头部中压缩方式 (`u32`, 小端) 的偏移量，0 表示未压缩 (BI_RGB)。
pub const COMPRESSION_OFFSET: usize = 30;

/// 扩展名长度上限。
pub const MAX_EXTENSION_LEN: u32 = 255;

/// 秘密文件长度上限 (1 GiB)。
pub const MAX_PAYLOAD_LEN: u32 = 1 << 30;

/// 流式传输时每批处理的数据字节数。
pub const CHUNK_SIZE: usize = 4096;

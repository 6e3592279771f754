//! 手动断点文件
//!
//! 文件是连续的 4 字节小端地址，没有文件头。

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// 读取所有完整的地址记录，末尾不足 4 字节的部分被忽略
pub fn load_manual_breakpoints(path: &Path) -> io::Result<Vec<u32>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let trailing = data.len() % 4;
    if trailing != 0 {
        tracing::debug!(path = ?path, trailing, "断点文件末尾有不完整的记录");
    }

    Ok(data
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// 检查断点文件是否为可读的普通文件
pub fn validate_breakpoint_file(path: &Path) -> io::Result<()> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "断点文件不是普通文件",
        ));
    }
    Ok(())
}

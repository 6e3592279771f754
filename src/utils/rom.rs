//! ROM 镜像加载器

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;

/// 读取原始大端 ROM 文件，返回 16 位字
///
/// 奇数长度的镜像末尾补 0。
pub fn load_rom(path: impl AsRef<Path>) -> Result<Vec<u16>> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("无法读取ROM文件 {:?}", path))?;
    if data.is_empty() {
        return Err(anyhow!("ROM文件 {:?} 为空", path));
    }
    Ok(rom_words(&data))
}

pub fn rom_words(data: &[u8]) -> Vec<u16> {
    data.chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

//! M68K 指令反汇编模块

use anyhow::{Result, anyhow};
use capstone::prelude::*;

/// 68000 反汇编器
pub struct M68kDisassembler {
    cs: Capstone,
}

impl M68kDisassembler {
    /// 创建新的 68000 反汇编器
    pub fn new() -> Result<Self> {
        let cs = Capstone::new()
            .m68k()
            .mode(arch::m68k::ArchMode::M68k000)
            .build()
            .map_err(|e| anyhow!("Failed to create capstone engine: {}", e))?;

        Ok(Self { cs })
    }

    /// 反汇编 `words` 开头的一条指令
    ///
    /// # 参数
    /// - `words`: 从指令地址开始的 16 位字（足够容纳扩展字）
    /// - `address`: 指令地址
    ///
    /// # 返回
    /// 反汇编文本与指令长度（字节）
    pub fn disasm_words(&self, words: &[u16], address: u32) -> Result<(String, usize)> {
        let code: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();

        let insns = self
            .cs
            .disasm_count(&code, address as u64, 1)
            .map_err(|e| anyhow!("Failed to disassemble: {}", e))?;

        let Some(insn) = insns.iter().next() else {
            return Err(anyhow!("Invalid instruction at {:#08x}", address));
        };
        let mnemonic = insn.mnemonic().unwrap_or("<unknown>");
        let op_str = insn.op_str().unwrap_or("");

        let text = if op_str.is_empty() {
            mnemonic.to_string()
        } else {
            format!("{} {}", mnemonic, op_str)
        };
        Ok((text, insn.bytes().len()))
    }

    /// 反汇编指令并返回详细信息
    pub fn disasm_with_details(&self, words: &[u16], address: u32) -> Result<String> {
        let (text, size) = self.disasm_words(words, address)?;
        let code = hex::encode(
            words
                .iter()
                .take(size / 2)
                .flat_map(|w| w.to_be_bytes())
                .collect::<Vec<u8>>(),
        );
        Ok(format!("0x{:06x}: {:<20}  {}", address, code, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_instructions() {
        let disasm = M68kDisassembler::new().expect("Failed to create disassembler");

        let (text, size) = disasm.disasm_words(&[0x4e75], 0x1000).unwrap();
        assert!(text.starts_with("rts"));
        assert_eq!(size, 2);

        let (text, size) = disasm.disasm_words(&[0x4e71], 0x1000).unwrap();
        assert!(text.starts_with("nop"));
        assert_eq!(size, 2);
    }

    #[test]
    fn test_with_details() {
        let disasm = M68kDisassembler::new().expect("Failed to create disassembler");

        let (text, size) = disasm.disasm_words(&[0x4eb9, 0x0001, 0x2345], 0x200).unwrap();
        assert!(text.starts_with("jsr"));
        assert_eq!(size, 6);

        let detailed = disasm
            .disasm_with_details(&[0x4eb9, 0x0001, 0x2345, 0x4e75], 0x200)
            .unwrap();
        println!("Detailed JSR: {}", detailed);
        assert!(detailed.contains("4eb900012345"));
    }
}

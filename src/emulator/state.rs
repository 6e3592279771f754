//! CPU状态管理

use super::{BreakpointDispatch, BreakpointSet, CpuContext};
use crate::const_values::TimingConfig;
use crate::utils::disasm::M68kDisassembler;
use std::fmt;

/// 未映射地址的读取结果
const OPEN_BUS: u32 = 0xffff_ffff;

/// 68000 CPU状态
#[derive(Debug, Clone)]
pub struct State {
    // 数据寄存器
    pub dregs: [u32; 8],
    // 地址寄存器，A7 为栈指针
    pub aregs: [u32; 8],
    // 程序计数器
    pub pc: u32,
    // 周期计数
    pub cycle: u32,
    // 卡带 ROM
    pub rom: Vec<u16>,
    pub timing: TimingConfig,
    pub breakpoints: BreakpointSet,
}

impl State {
    /// 用 ROM 字创建CPU状态，栈指针与 PC 取自复位向量
    pub fn new(rom: Vec<u16>, timing: TimingConfig) -> Self {
        let mut state = Self {
            dregs: [0; 8],
            aregs: [0; 8],
            pc: 0,
            cycle: 0,
            rom,
            timing,
            breakpoints: BreakpointSet::new(),
        };
        if state.image_size() >= 8 {
            state.aregs[7] = state.read_long(0);
            state.pc = state.read_long(4);
        }
        state
    }

    /// 设置PC值，返回该地址是否装有断点
    ///
    /// 返回 `true` 时调用者需要先分发断点回调再执行该指令。
    #[inline(always)]
    pub fn set_pc(&mut self, pc: u32) -> bool {
        self.pc = pc;
        self.breakpoints.contains(pc)
    }

    fn read_word(&self, addr: u32) -> Option<u16> {
        if addr % 2 != 0 {
            return None;
        }
        self.rom.get((addr / 2) as usize).copied()
    }
}

impl CpuContext for State {
    fn image(&self) -> &[u16] {
        &self.rom
    }

    fn read_long(&self, addr: u32) -> u32 {
        match (self.read_word(addr), self.read_word(addr.wrapping_add(2))) {
            (Some(hi), Some(lo)) => (hi as u32) << 16 | lo as u32,
            _ => OPEN_BUS,
        }
    }

    fn current_cycle(&self) -> u32 {
        self.cycle
    }

    fn dregs(&self) -> &[u32; 8] {
        &self.dregs
    }

    fn aregs(&self) -> &[u32; 8] {
        &self.aregs
    }

    fn timing(&self) -> TimingConfig {
        self.timing
    }
}

impl BreakpointDispatch for State {
    fn insert_breakpoint(&mut self, addr: u32) {
        self.breakpoints.insert_breakpoint(addr);
    }

    fn remove_breakpoint(&mut self, addr: u32) {
        self.breakpoints.remove_breakpoint(addr);
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== CPU State ===")?;
        writeln!(f, "PC: 0x{:06x}  Cycle: {}", self.pc, self.cycle)?;
        writeln!(f)?;

        writeln!(f, "Registers:")?;
        for i in 0..8 {
            writeln!(
                f,
                "  D{}: 0x{:08x}    A{}: 0x{:08x}",
                i, self.dregs[i], i, self.aregs[i]
            )?;
        }
        writeln!(f)?;

        // 打印PC附近的反汇编
        writeln!(f, "Memory around PC:")?;
        let disasm = match M68kDisassembler::new() {
            Ok(d) => d,
            Err(_) => {
                writeln!(f, "  Failed to create disassembler")?;
                return Ok(());
            }
        };

        let start = (self.pc / 2).saturating_sub(4) as usize;
        let mut index = start;
        let mut shown = 0;
        while shown < 9 && index < self.rom.len() {
            let addr = (index * 2) as u32;
            let marker = if addr == self.pc { " <-- PC" } else { "" };
            // 68000 最长指令为 5 个字
            let end = (index + 5).min(self.rom.len());
            match disasm.disasm_words(&self.rom[index..end], addr) {
                Ok((text, size)) => {
                    writeln!(f, "  0x{:06x}: {}{}", addr, text, marker)?;
                    index += (size / 2).max(1);
                }
                Err(_) => {
                    writeln!(f, "  0x{:06x}: {:04x}    <invalid>{}", addr, self.rom[index], marker)?;
                    index += 1;
                }
            }
            shown += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_vectors() {
        let state = State::new(
            vec![0x00ff, 0xfffe, 0x0000, 0x0200, 0x4e71, 0x4e71],
            TimingConfig::default(),
        );
        assert_eq!(state.stack_pointer(), 0x00ff_fffe);
        assert_eq!(state.pc, 0x200);
    }

    #[test]
    fn test_read_long_outside_rom() {
        let state = State::new(vec![0x4e71, 0x4e71], TimingConfig::default());
        assert_eq!(state.read_long(0), 0x4e71_4e71);
        assert_eq!(state.read_long(2), OPEN_BUS);
        assert_eq!(state.read_long(0x78), OPEN_BUS);
        assert_eq!(state.read_long(1), OPEN_BUS);
    }

    #[test]
    fn test_display_marks_pc() {
        let mut rom = vec![0x4e71; 4];
        rom.push(0x4e75);
        let mut state = State::new(rom, TimingConfig::default());
        state.pc = 8;
        state.aregs[7] = 0x00ff_fe00;
        state.dregs[3] = 0x1234;
        let dump = state.to_string();
        assert!(dump.contains("PC: 0x000008"));
        assert!(dump.contains("D3: 0x00001234"));
        assert!(dump.contains("A7: 0x00fffe00"));
        let line = dump.lines().find(|l| l.contains("<-- PC")).unwrap();
        assert!(line.contains("0x000008"));
        assert!(line.contains("rts"));
    }

    #[test]
    fn test_set_pc_reports_breakpoint() {
        let mut state = State::new(vec![0x4e71; 4], TimingConfig::default());
        state.insert_breakpoint(4);
        assert!(state.set_pc(4));
        assert!(!state.set_pc(6));
        assert_eq!(state.pc, 6);
    }
}

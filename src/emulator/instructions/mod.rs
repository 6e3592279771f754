//! 68000 控制流指令解码
//!
//! 只识别分析器关心的指令（BSR/JSR/RTS/RTE），其余一律解码为 `Op::Other`。

mod classify;
mod ea;

pub use classify::{SiteKind, classify};
pub use ea::{EffectiveAddress, IndexRegister};

use crate::const_values::ADDRESS_MASK;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Bsr,
    Jsr,
    Rts,
    Rte,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mask: u16,
    pub identifier: u16,
    pub name: &'static str,
    pub op: Op,
}

pub const M68K_CONTROL_FLOW: &[Opcode] = &[
    Opcode {
        mask: 0xffff,
        identifier: 0x4e75,
        name: "rts",
        op: Op::Rts,
    },
    Opcode {
        mask: 0xffff,
        identifier: 0x4e73,
        name: "rte",
        op: Op::Rte,
    },
    Opcode {
        mask: 0xffc0,
        identifier: 0x4e80,
        name: "jsr",
        op: Op::Jsr,
    },
    Opcode {
        mask: 0xff00,
        identifier: 0x6100,
        name: "bsr",
        op: Op::Bsr,
    },
];

/// 解码后的指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub address: u32,
    pub op: Op,
    pub name: &'static str,
    /// 指令长度（字节）
    pub size: u32,
    /// 跳转目标的寻址方式，仅 BSR/JSR 有
    pub target: Option<EffectiveAddress>,
}

impl Instruction {
    fn other(address: u32) -> Self {
        Self {
            address,
            op: Op::Other,
            name: "<other>",
            size: 2,
            target: None,
        }
    }

    /// 用当前寄存器解析跳转目标
    ///
    /// 寄存器间接的 JSR 必须在命中时解析，静态扫描阶段得不到正确结果。
    pub fn branch_target(&self, dregs: &[u32; 8], aregs: &[u32; 8]) -> Option<u32> {
        self.target
            .map(|ea| ea.resolve(dregs, aregs) & ADDRESS_MASK)
    }
}

/// 从 `words[0]` 开始解码位于 `address` 的指令
///
/// 扩展字不足（镜像末尾被截断）时视为 `Op::Other`。
pub fn decode(words: &[u16], address: u32) -> Instruction {
    let Some(&opcode) = words.first() else {
        return Instruction::other(address);
    };
    let Some(entry) = M68K_CONTROL_FLOW
        .iter()
        .find(|x| opcode & x.mask == x.identifier)
    else {
        return Instruction::other(address);
    };

    match entry.op {
        Op::Rts | Op::Rte => Instruction {
            address,
            op: entry.op,
            name: entry.name,
            size: 2,
            target: None,
        },
        Op::Bsr => {
            let base = address.wrapping_add(2);
            let (disp, size) = match opcode as u8 {
                0 => match words.get(1) {
                    Some(&ext) => (ext as i16 as i32, 4),
                    None => return Instruction::other(address),
                },
                short => (short as i8 as i32, 2),
            };
            Instruction {
                address,
                op: Op::Bsr,
                name: entry.name,
                size,
                target: Some(EffectiveAddress::Relative { base, disp }),
            }
        }
        Op::Jsr => match EffectiveAddress::decode_control(opcode, &words[1..], address) {
            Some((ea, ext_words)) => Instruction {
                address,
                op: Op::Jsr,
                name: entry.name,
                size: 2 + 2 * ext_words,
                target: Some(ea),
            },
            None => Instruction::other(address),
        },
        Op::Other => Instruction::other(address),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_REGS: [u32; 8] = [0; 8];

    #[test]
    fn test_opcode_table_entries_decode_to_themselves() {
        for entry in M68K_CONTROL_FLOW {
            assert_eq!(entry.identifier & entry.mask, entry.identifier, "{}", entry.name);
            // JSR 的低 6 位为 0 时是 Dn，不合法，改用 (A0)
            let opcode = if entry.op == Op::Jsr {
                entry.identifier | 0x10
            } else {
                entry.identifier
            };
            let inst = decode(&[opcode, 0, 0], 0);
            assert_eq!(inst.op, entry.op, "{}", entry.name);
            assert_eq!(inst.name, entry.name);
        }
    }

    #[test]
    fn test_decode_returns() {
        assert_eq!(decode(&[0x4e75], 0x100).op, Op::Rts);
        assert_eq!(decode(&[0x4e73], 0x100).op, Op::Rte);
        // NOP
        assert_eq!(decode(&[0x4e71], 0x100).op, Op::Other);
        assert_eq!(decode(&[], 0x100).op, Op::Other);
    }

    #[test]
    fn test_bsr_short_and_word() {
        let inst = decode(&[0x6110], 0x200);
        assert_eq!(inst.op, Op::Bsr);
        assert_eq!(inst.size, 2);
        assert_eq!(inst.branch_target(&NO_REGS, &NO_REGS), Some(0x212));

        let inst = decode(&[0x6100, 0x0100], 0x200);
        assert_eq!(inst.size, 4);
        assert_eq!(inst.branch_target(&NO_REGS, &NO_REGS), Some(0x302));

        // 负位移
        let inst = decode(&[0x61fe], 0x200);
        assert_eq!(inst.branch_target(&NO_REGS, &NO_REGS), Some(0x200));
    }

    #[test]
    fn test_bsr_word_truncated() {
        assert_eq!(decode(&[0x6100], 0x200).op, Op::Other);
    }

    #[test]
    fn test_jsr_absolute() {
        let inst = decode(&[0x4eb8, 0x0010], 0);
        assert_eq!(inst.op, Op::Jsr);
        assert_eq!(inst.size, 4);
        assert_eq!(inst.branch_target(&NO_REGS, &NO_REGS), Some(0x10));

        let inst = decode(&[0x4eb9, 0x0001, 0x2345], 0);
        assert_eq!(inst.size, 6);
        assert_eq!(inst.branch_target(&NO_REGS, &NO_REGS), Some(0x12345));

        // abs.w 符号扩展后截断到 24 位
        let inst = decode(&[0x4eb8, 0x8000], 0);
        assert_eq!(inst.branch_target(&NO_REGS, &NO_REGS), Some(0xff8000));
    }

    #[test]
    fn test_jsr_register_modes() {
        let mut aregs = [0; 8];
        let mut dregs = [0; 8];
        aregs[0] = 0x1000;
        aregs[1] = 0x2000;
        dregs[1] = 0xffff_fffe;

        // jsr (a0)
        let inst = decode(&[0x4e90], 0);
        assert_eq!(inst.branch_target(&dregs, &aregs), Some(0x1000));

        // jsr -4(a1)
        let inst = decode(&[0x4ea9, 0xfffc], 0);
        assert_eq!(inst.branch_target(&dregs, &aregs), Some(0x1ffc));

        // jsr 4(a0,d1.w)
        let inst = decode(&[0x4eb0, 0x1004], 0);
        assert_eq!(inst.branch_target(&dregs, &aregs), Some(0x1002));

        // jsr 4(a0,d1.l)
        let inst = decode(&[0x4eb0, 0x1804], 0);
        assert_eq!(inst.branch_target(&dregs, &aregs), Some(0x1002));
    }

    #[test]
    fn test_jsr_pc_relative() {
        let inst = decode(&[0x4eba, 0x0010], 0x100);
        assert_eq!(inst.branch_target(&NO_REGS, &NO_REGS), Some(0x112));

        let mut aregs = [0; 8];
        aregs[2] = 0x20;
        // jsr 2(pc,a2.w)
        let inst = decode(&[0x4ebb, 0xa002], 0x100);
        assert_eq!(inst.branch_target(&NO_REGS, &aregs), Some(0x124));
    }

    #[test]
    fn test_jsr_invalid_modes() {
        // jsr d0 / jsr (a0)+ / jsr #imm 都不是合法的控制寻址
        assert_eq!(decode(&[0x4e80], 0).op, Op::Other);
        assert_eq!(decode(&[0x4e98], 0).op, Op::Other);
        assert_eq!(decode(&[0x4ebc, 0x0000], 0).op, Op::Other);
        // 扩展字缺失
        assert_eq!(decode(&[0x4eb9, 0x0001], 0).op, Op::Other);
    }
}

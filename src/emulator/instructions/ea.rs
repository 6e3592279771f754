//! 跳转指令的有效地址

/// 变址寄存器（简短扩展字）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRegister {
    pub address: bool,
    pub reg: u8,
    pub long: bool,
}

impl IndexRegister {
    fn from_extension(ext: u16) -> Self {
        Self {
            address: ext & 0x8000 != 0,
            reg: ((ext >> 12) & 0x7) as u8,
            long: ext & 0x0800 != 0,
        }
    }

    fn value(&self, dregs: &[u32; 8], aregs: &[u32; 8]) -> u32 {
        let raw = if self.address {
            aregs[self.reg as usize]
        } else {
            dregs[self.reg as usize]
        };
        if self.long { raw } else { raw as u16 as i16 as u32 }
    }
}

/// JSR/BSR 允许的控制寻址方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveAddress {
    /// (An)
    AddressIndirect(u8),
    /// d16(An)
    AddressDisplacement { reg: u8, disp: i16 },
    /// d8(An,Xn)
    AddressIndex {
        reg: u8,
        index: IndexRegister,
        disp: i8,
    },
    /// xxx.W
    AbsoluteShort(i16),
    /// xxx.L
    AbsoluteLong(u32),
    /// d16(PC)，`base` 为扩展字地址
    PcDisplacement { base: u32, disp: i16 },
    /// d8(PC,Xn)
    PcIndex {
        base: u32,
        index: IndexRegister,
        disp: i8,
    },
    /// BSR 的 PC 相对位移
    Relative { base: u32, disp: i32 },
}

impl EffectiveAddress {
    /// 解码操作字低 6 位的控制寻址方式，返回寻址方式与消耗的扩展字数
    pub(super) fn decode_control(opcode: u16, ext: &[u16], address: u32) -> Option<(Self, u32)> {
        let mode = (opcode >> 3) & 0x7;
        let reg = (opcode & 0x7) as u8;
        let ext_base = address.wrapping_add(2);
        let ea = match (mode, reg) {
            (2, _) => (Self::AddressIndirect(reg), 0),
            (5, _) => (
                Self::AddressDisplacement {
                    reg,
                    disp: *ext.first()? as i16,
                },
                1,
            ),
            (6, _) => {
                let word = *ext.first()?;
                (
                    Self::AddressIndex {
                        reg,
                        index: IndexRegister::from_extension(word),
                        disp: word as u8 as i8,
                    },
                    1,
                )
            }
            (7, 0) => (Self::AbsoluteShort(*ext.first()? as i16), 1),
            (7, 1) => {
                let hi = *ext.first()? as u32;
                let lo = *ext.get(1)? as u32;
                (Self::AbsoluteLong(hi << 16 | lo), 2)
            }
            (7, 2) => (
                Self::PcDisplacement {
                    base: ext_base,
                    disp: *ext.first()? as i16,
                },
                1,
            ),
            (7, 3) => {
                let word = *ext.first()?;
                (
                    Self::PcIndex {
                        base: ext_base,
                        index: IndexRegister::from_extension(word),
                        disp: word as u8 as i8,
                    },
                    1,
                )
            }
            _ => return None,
        };
        Some(ea)
    }

    pub fn resolve(&self, dregs: &[u32; 8], aregs: &[u32; 8]) -> u32 {
        match *self {
            Self::AddressIndirect(reg) => aregs[reg as usize],
            Self::AddressDisplacement { reg, disp } => {
                aregs[reg as usize].wrapping_add(disp as i32 as u32)
            }
            Self::AddressIndex { reg, index, disp } => aregs[reg as usize]
                .wrapping_add(disp as i32 as u32)
                .wrapping_add(index.value(dregs, aregs)),
            Self::AbsoluteShort(addr) => addr as i32 as u32,
            Self::AbsoluteLong(addr) => addr,
            Self::PcDisplacement { base, disp } => base.wrapping_add(disp as i32 as u32),
            Self::PcIndex { base, index, disp } => base
                .wrapping_add(disp as i32 as u32)
                .wrapping_add(index.value(dregs, aregs)),
            Self::Relative { base, disp } => base.wrapping_add(disp as u32),
        }
    }
}

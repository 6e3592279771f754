use super::{Instruction, Op};

/// 指令在控制流中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    Call,
    Return,
    InterruptReturn,
    None,
}

#[inline(always)]
pub fn classify(inst: &Instruction) -> SiteKind {
    match inst.op {
        Op::Bsr | Op::Jsr => SiteKind::Call,
        Op::Rts => SiteKind::Return,
        Op::Rte => SiteKind::InterruptReturn,
        Op::Other => SiteKind::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::instructions::decode;

    #[test]
    fn test_classify_sites() {
        assert_eq!(classify(&decode(&[0x4eb8, 0x0010], 0)), SiteKind::Call);
        assert_eq!(classify(&decode(&[0x6104], 0)), SiteKind::Call);
        assert_eq!(classify(&decode(&[0x4e75], 0)), SiteKind::Return);
        assert_eq!(classify(&decode(&[0x4e73], 0)), SiteKind::InterruptReturn);
        // JMP 不是调用
        assert_eq!(classify(&decode(&[0x4ef8, 0x0010], 0)), SiteKind::None);
        // BRA 不是调用
        assert_eq!(classify(&decode(&[0x6004], 0)), SiteKind::None);
    }
}

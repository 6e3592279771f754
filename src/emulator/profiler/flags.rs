//! 断点标志表

use super::format::PacketKind;
use std::fmt;

/// 单个事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventFlag {
    SubroutineEnter = 1 << 0,
    SubroutineExit = 1 << 1,
    InterruptEnter = 1 << 2,
    InterruptExit = 1 << 3,
    ManualBreakpoint = 1 << 4,
}

impl EventFlag {
    /// 一次命中产生多个包时的写出顺序
    pub const EMIT_ORDER: [EventFlag; 5] = [
        EventFlag::InterruptEnter,
        EventFlag::SubroutineEnter,
        EventFlag::ManualBreakpoint,
        EventFlag::SubroutineExit,
        EventFlag::InterruptExit,
    ];

    pub fn packet_kind(self) -> PacketKind {
        match self {
            EventFlag::SubroutineEnter => PacketKind::SubroutineEnter,
            EventFlag::SubroutineExit => PacketKind::SubroutineExit,
            EventFlag::InterruptEnter => PacketKind::InterruptEnter,
            EventFlag::InterruptExit => PacketKind::InterruptExit,
            EventFlag::ManualBreakpoint => PacketKind::ManualBreakpoint,
        }
    }

    fn short_name(self) -> &'static str {
        match self {
            EventFlag::SubroutineEnter => "SE",
            EventFlag::SubroutineExit => "SX",
            EventFlag::InterruptEnter => "IE",
            EventFlag::InterruptExit => "IX",
            EventFlag::ManualBreakpoint => "MB",
        }
    }
}

/// 一个地址上的事件位掩码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventFlags(u8);

impl EventFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline(always)]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn contains(self, flag: EventFlag) -> bool {
        self.0 & flag as u8 != 0
    }

    #[inline(always)]
    pub fn insert(&mut self, flag: EventFlag) {
        self.0 |= flag as u8;
    }

    /// 按 [`EventFlag::EMIT_ORDER`] 遍历已置位的事件
    pub fn iter(self) -> impl Iterator<Item = EventFlag> {
        EventFlag::EMIT_ORDER
            .into_iter()
            .filter(move |&flag| self.contains(flag))
    }
}

impl From<EventFlag> for EventFlags {
    fn from(flag: EventFlag) -> Self {
        Self(flag as u8)
    }
}

impl fmt::Display for EventFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(EventFlag::short_name).collect();
        write!(f, "{}", names.join("|"))
    }
}

/// 按指令字索引的标志表，大小在会话开始时固定
#[derive(Debug, Clone)]
pub struct FlagTable {
    entries: Vec<EventFlags>,
}

impl FlagTable {
    /// 为 `words` 个指令字创建全零表
    pub fn new(words: usize) -> Self {
        Self {
            entries: vec![EventFlags::empty(); words],
        }
    }

    /// 覆盖的镜像大小（字节）
    pub fn image_size(&self) -> u32 {
        (self.entries.len() * 2) as u32
    }

    /// 地址是否落在表内且按字对齐
    #[inline(always)]
    pub fn covers(&self, addr: u32) -> bool {
        addr % 2 == 0 && addr < self.image_size()
    }

    #[inline(always)]
    pub fn get(&self, addr: u32) -> EventFlags {
        if addr % 2 != 0 {
            return EventFlags::empty();
        }
        self.entries
            .get((addr / 2) as usize)
            .copied()
            .unwrap_or_default()
    }

    /// 在地址上合并一个事件，地址不在表内时返回 `false`
    pub fn insert(&mut self, addr: u32, flag: EventFlag) -> bool {
        if !self.covers(addr) {
            return false;
        }
        self.entries[(addr / 2) as usize].insert(flag);
        true
    }

    /// 所有非零项（地址升序）
    pub fn iter(&self) -> impl Iterator<Item = (u32, EventFlags)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, flags)| !flags.is_empty())
            .map(|(word, flags)| ((word * 2) as u32, *flags))
    }

    pub fn armed_count(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_merge() {
        let mut flags = EventFlags::empty();
        assert!(flags.is_empty());
        flags.insert(EventFlag::SubroutineExit);
        flags.insert(EventFlag::ManualBreakpoint);
        flags.insert(EventFlag::SubroutineExit);
        assert_eq!(flags.bits(), 0b1_0010);
        assert!(flags.contains(EventFlag::ManualBreakpoint));
        assert!(!flags.contains(EventFlag::InterruptEnter));
        assert_eq!(flags.to_string(), "MB|SX");
    }

    #[test]
    fn test_iter_uses_emit_order() {
        let mut flags = EventFlags::empty();
        for flag in [
            EventFlag::InterruptExit,
            EventFlag::SubroutineExit,
            EventFlag::ManualBreakpoint,
            EventFlag::SubroutineEnter,
            EventFlag::InterruptEnter,
        ] {
            flags.insert(flag);
        }
        let order: Vec<EventFlag> = flags.iter().collect();
        assert_eq!(order, EventFlag::EMIT_ORDER.to_vec());
    }

    #[test]
    fn test_table_bounds() {
        let mut table = FlagTable::new(6);
        assert_eq!(table.image_size(), 12);
        assert!(table.insert(10, EventFlag::InterruptExit));
        assert!(!table.insert(12, EventFlag::InterruptEnter));
        assert!(!table.insert(3, EventFlag::ManualBreakpoint));
        assert_eq!(table.get(10), EventFlags::from(EventFlag::InterruptExit));
        assert!(table.get(12).is_empty());
        assert!(table.get(11).is_empty());
        assert_eq!(table.armed_count(), 1);
    }

    #[test]
    fn test_table_iter_skips_empty() {
        let mut table = FlagTable::new(4);
        table.insert(6, EventFlag::SubroutineExit);
        table.insert(0, EventFlag::SubroutineEnter);
        let armed: Vec<u32> = table.iter().map(|(addr, _)| addr).collect();
        assert_eq!(armed, vec![0, 6]);
    }
}

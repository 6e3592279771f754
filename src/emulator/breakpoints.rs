//! 断点管理

use super::BreakpointDispatch;
use nohash_hasher::{self, BuildNoHashHasher};
use std::collections::HashSet;

type NoHashHashSet<T> = HashSet<T, BuildNoHashHasher<T>>;

/// 已安装的执行断点集合
#[derive(Debug, Clone, Default)]
pub struct BreakpointSet {
    breakpoints: NoHashHashSet<u32>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 检查地址是否有断点
    #[inline(always)]
    pub fn contains(&self, addr: u32) -> bool {
        self.breakpoints.contains(&addr)
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// 按地址排序的全部断点
    pub fn addresses(&self) -> Vec<u32> {
        let mut addrs: Vec<u32> = self.breakpoints.iter().copied().collect();
        addrs.sort_unstable();
        addrs
    }
}

impl BreakpointDispatch for BreakpointSet {
    fn insert_breakpoint(&mut self, addr: u32) {
        self.breakpoints.insert(addr);
    }

    fn remove_breakpoint(&mut self, addr: u32) {
        self.breakpoints.remove(&addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = BreakpointSet::new();
        set.insert_breakpoint(0x200);
        set.insert_breakpoint(0x200);
        set.insert_breakpoint(0x100);
        assert_eq!(set.len(), 2);
        assert_eq!(set.addresses(), vec![0x100, 0x200]);
    }

    #[test]
    fn test_remove() {
        let mut set = BreakpointSet::new();
        set.insert_breakpoint(0x200);
        set.remove_breakpoint(0x200);
        set.remove_breakpoint(0x300);
        assert!(set.is_empty());
        assert!(!set.contains(0x200));
    }
}

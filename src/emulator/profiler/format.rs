//! MDP 追踪文件格式
//!
//! 256 字节文件头之后是连续的数据包，没有长度字段，一直到文件末尾。
//! 所有整数均为小端序。

use crate::const_values::{MDP_HEADER_SIZE, MDP_MAGIC, MDP_VERSION, TimingConfig};
use std::io::{self, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("文件头魔数错误: {0}")]
    BadMagic(String),
    #[error("不支持的文件版本: {0}")]
    UnsupportedVersion(u8),
    #[error("未知的数据包类型: {0}")]
    UnknownPacket(u8),
    #[error("数据包被截断")]
    Truncated,
    #[error("读取错误: {0}")]
    Io(#[from] io::Error),
}

/// 数据包类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    SubroutineEnter = 0,
    SubroutineExit = 1,
    InterruptEnter = 2,
    InterruptExit = 3,
    Hint = 4,
    Vint = 5,
    AdjustCycles = 6,
    ManualBreakpoint = 7,
}

impl PacketKind {
    pub const COUNT: usize = 8;

    /// 是否在包后附带 4 字节目标地址
    #[inline(always)]
    pub fn has_target(self) -> bool {
        matches!(
            self,
            PacketKind::SubroutineEnter | PacketKind::InterruptEnter | PacketKind::ManualBreakpoint
        )
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => PacketKind::SubroutineEnter,
            1 => PacketKind::SubroutineExit,
            2 => PacketKind::InterruptEnter,
            3 => PacketKind::InterruptExit,
            4 => PacketKind::Hint,
            5 => PacketKind::Vint,
            6 => PacketKind::AdjustCycles,
            7 => PacketKind::ManualBreakpoint,
            other => return Err(FormatError::UnknownPacket(other)),
        })
    }
}

/// 文件头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MdpHeader {
    pub version: u8,
    pub mclk: u32,
    pub divider: u32,
}

impl MdpHeader {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            version: MDP_VERSION,
            mclk: timing.mclk,
            divider: timing.divider,
        }
    }

    pub fn to_bytes(&self) -> [u8; MDP_HEADER_SIZE] {
        let mut bytes = [0u8; MDP_HEADER_SIZE];
        bytes[0..3].copy_from_slice(&MDP_MAGIC);
        bytes[3] = self.version;
        bytes[4..8].copy_from_slice(&self.mclk.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.divider.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; MDP_HEADER_SIZE]) -> Result<Self, FormatError> {
        if bytes[0..3] != MDP_MAGIC {
            return Err(FormatError::BadMagic(hex::encode(&bytes[0..3])));
        }
        let version = bytes[3];
        if version != MDP_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        Ok(Self {
            version,
            mclk: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            divider: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        let mut bytes = [0u8; MDP_HEADER_SIZE];
        r.read_exact(&mut bytes).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => FormatError::Truncated,
            _ => FormatError::Io(e),
        })?;
        Self::from_bytes(&bytes)
    }
}

/// 一条事件记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,
    pub cycle: u32,
    pub stack_pointer: u32,
    /// 仅 [`PacketKind::has_target`] 为真的类型携带
    pub target: Option<u32>,
}

impl Packet {
    /// 包头长度：类型 1 字节 + 周期 4 字节 + 栈指针 4 字节
    pub const HEADER_SIZE: usize = 9;

    /// 不带目标地址的包
    pub fn new(kind: PacketKind, cycle: u32, stack_pointer: u32) -> Self {
        debug_assert!(!kind.has_target(), "{:?} 需要目标地址", kind);
        Self {
            kind,
            cycle,
            stack_pointer,
            target: None,
        }
    }

    pub fn with_target(kind: PacketKind, cycle: u32, stack_pointer: u32, target: u32) -> Self {
        debug_assert!(kind.has_target(), "{:?} 不带目标地址", kind);
        Self {
            kind,
            cycle,
            stack_pointer,
            target: Some(target),
        }
    }

    /// 写入后的字节数
    pub fn encoded_len(&self) -> usize {
        if self.kind.has_target() {
            Self::HEADER_SIZE + 4
        } else {
            Self::HEADER_SIZE
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut buf = [0u8; Self::HEADER_SIZE + 4];
        buf[0] = self.kind as u8;
        buf[1..5].copy_from_slice(&self.cycle.to_le_bytes());
        buf[5..9].copy_from_slice(&self.stack_pointer.to_le_bytes());
        debug_assert_eq!(self.target.is_some(), self.kind.has_target());
        if self.kind.has_target() {
            buf[9..13].copy_from_slice(&self.target.unwrap_or(0).to_le_bytes());
        }
        w.write_all(&buf[..self.encoded_len()])
    }

    /// 读取下一个数据包，干净的文件末尾返回 `None`
    pub fn read_from<R: Read>(r: &mut R) -> Result<Option<Self>, FormatError> {
        let mut tag = [0u8; 1];
        if r.read(&mut tag)? == 0 {
            return Ok(None);
        }
        let kind = PacketKind::try_from(tag[0])?;

        let mut body = [0u8; 8];
        read_exact_or_truncated(r, &mut body)?;
        let cycle = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
        let stack_pointer = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);

        let target = if kind.has_target() {
            let mut addr = [0u8; 4];
            read_exact_or_truncated(r, &mut addr)?;
            Some(u32::from_le_bytes(addr))
        } else {
            None
        };

        Ok(Some(Self {
            kind,
            cycle,
            stack_pointer,
            target,
        }))
    }
}

fn read_exact_or_truncated<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), FormatError> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FormatError::Truncated,
        _ => FormatError::Io(e),
    })
}

/// 读取整个追踪文件
pub fn read_trace<R: Read>(r: &mut R) -> Result<(MdpHeader, Vec<Packet>), FormatError> {
    let header = MdpHeader::read_from(r)?;
    let mut packets = Vec::new();
    while let Some(packet) = Packet::read_from(r)? {
        packets.push(packet);
    }
    Ok((header, packets))
}

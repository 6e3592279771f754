//! 控制流性能分析器
//!
//! 会话启动时扫描整个 ROM，在每条 BSR/JSR/RTS/RTE、三个中断入口以及手动断点处安装断点；
//! 解释器命中断点时调用 [`Profiler::on_breakpoint_hit`]，把事件按发生顺序写入 MDP 文件。

mod flags;
pub mod format;
mod manual;

pub use flags::{EventFlag, EventFlags, FlagTable};
pub use format::{FormatError, MdpHeader, Packet, PacketKind, read_trace};

use clap::Args;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::instructions::{self, SiteKind};
use super::{BreakpointDispatch, CpuContext};
use crate::const_values::INTERRUPT_VECTORS;
use manual::{load_manual_breakpoints, validate_breakpoint_file};

#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("无法创建性能分析文件 {path:?}: {source}")]
    CreateTrace { path: PathBuf, source: io::Error },
    #[error("无法读取断点文件 {path:?}: {source}")]
    BreakpointFile { path: PathBuf, source: io::Error },
    #[error("性能分析文件写入失败: {0}")]
    Io(#[from] io::Error),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfilerArgs {
    /// 追踪文件输出路径（覆盖配置文件）
    #[arg(short, long)]
    pub output: Option<String>,

    /// 手动断点文件（覆盖配置文件）
    #[arg(short, long)]
    pub breakpoints: Option<String>,

    /// 打印所有插桩地址
    #[arg(long, default_value_t = false)]
    pub list: bool,
}

/// 一次追踪会话：标志表与输出文件同生共死
struct Session {
    flags: FlagTable,
    writer: BufWriter<File>,
    path: PathBuf,
    packets: [u64; PacketKind::COUNT],
}

impl Session {
    #[inline(always)]
    fn write(&mut self, packet: Packet) -> io::Result<()> {
        packet.write_to(&mut self.writer)?;
        self.packets[packet.kind as usize] += 1;
        Ok(())
    }
}

/// 性能分析器
///
/// 同一时间最多一个活动会话。手动断点文件路径属于分析器本身，跨会话保留。
#[derive(Default)]
pub struct Profiler {
    session: Option<Session>,
    breakpoint_path: Option<PathBuf>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// 当前会话的输出文件
    pub fn output_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    pub fn breakpoint_path(&self) -> Option<&Path> {
        self.breakpoint_path.as_deref()
    }

    /// 地址上的事件标志，没有活动会话时返回 `None`
    pub fn flags_at(&self, addr: u32) -> Option<EventFlags> {
        self.session.as_ref().map(|s| s.flags.get(addr))
    }

    /// 当前会话所有插桩地址（升序）
    pub fn instrumented(&self) -> impl Iterator<Item = (u32, EventFlags)> + '_ {
        self.session.iter().flat_map(|s| s.flags.iter())
    }

    /// 本次会话已写出的某类数据包数量
    pub fn packet_count(&self, kind: PacketKind) -> u64 {
        self.session
            .as_ref()
            .map_or(0, |s| s.packets[kind as usize])
    }

    /// 设置手动断点文件，`None` 或空路径表示清除
    ///
    /// 文件不可读时清除配置并返回错误，分析器仍可继续使用。
    pub fn set_breakpoint_path(&mut self, path: Option<&Path>) -> Result<(), ProfilerError> {
        self.breakpoint_path = None;
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            info!("断点文件设置为无");
            return Ok(());
        };
        if let Err(source) = validate_breakpoint_file(path) {
            warn!(path = %path.display(), error = %source, "无法打开断点文件");
            return Err(ProfilerError::BreakpointFile {
                path: path.to_path_buf(),
                source,
            });
        }
        self.breakpoint_path = Some(path.to_path_buf());
        info!(path = %path.display(), "断点文件已设置");
        Ok(())
    }

    /// 启动追踪会话
    ///
    /// 已有会话时先停止它。失败时不会留下会话，也不会留下已注册的断点。
    pub fn start<C>(&mut self, cpu: &mut C, path: impl AsRef<Path>) -> Result<(), ProfilerError>
    where
        C: CpuContext + BreakpointDispatch,
    {
        if self.session.is_some() {
            self.stop(cpu)?;
        }
        let path = path.as_ref();

        let flags = self.build_flag_table(&*cpu)?;

        let file = File::create(path).map_err(|source| ProfilerError::CreateTrace {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        MdpHeader::new(cpu.timing()).write_to(&mut writer)?;
        writer.flush()?;

        for (addr, _) in flags.iter() {
            cpu.insert_breakpoint(addr);
        }

        info!(
            path = %path.display(),
            armed = flags.armed_count(),
            "性能分析器已启动"
        );
        self.session = Some(Session {
            flags,
            writer,
            path: path.to_path_buf(),
            packets: [0; PacketKind::COUNT],
        });
        Ok(())
    }

    /// 扫描镜像、中断向量和手动断点，生成标志表
    fn build_flag_table<C: CpuContext>(&self, cpu: &C) -> Result<FlagTable, ProfilerError> {
        let image = cpu.image();
        let mut flags = FlagTable::new(image.len());

        for word in 0..image.len() {
            let address = (word * 2) as u32;
            let inst = instructions::decode(&image[word..], address);
            let flag = match instructions::classify(&inst) {
                SiteKind::Call => EventFlag::SubroutineEnter,
                SiteKind::Return => EventFlag::SubroutineExit,
                SiteKind::InterruptReturn => EventFlag::InterruptExit,
                SiteKind::None => continue,
            };
            flags.insert(address, flag);
        }

        for (name, slot) in INTERRUPT_VECTORS {
            let target = cpu.read_long(slot);
            if target >= flags.image_size() {
                debug!("{} 向量 {:#x} 不在ROM内，跳过", name, target);
            } else if !flags.insert(target, EventFlag::InterruptEnter) {
                warn!("{} 向量 {:#x} 未按字对齐，跳过", name, target);
            }
        }

        if let Some(bp_path) = &self.breakpoint_path {
            info!(path = %bp_path.display(), "重新加载断点文件");
            let addrs =
                load_manual_breakpoints(bp_path).map_err(|source| ProfilerError::BreakpointFile {
                    path: bp_path.clone(),
                    source,
                })?;
            let added = arm_manual_breakpoints(&mut flags, &addrs);
            info!(read = addrs.len(), added, "已添加手动断点");
        }

        Ok(flags)
    }

    /// 停止当前会话，没有会话时什么也不做
    pub fn stop<C: BreakpointDispatch>(&mut self, cpu: &mut C) -> Result<(), ProfilerError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        for (addr, _) in session.flags.iter() {
            cpu.remove_breakpoint(addr);
        }
        let total: u64 = session.packets.iter().sum();
        let flushed = session.writer.flush();
        info!(path = %session.path.display(), packets = total, "性能分析器已停止");
        flushed?;
        Ok(())
    }

    /// 断点命中回调
    ///
    /// 按 [`EventFlag::EMIT_ORDER`] 为该地址上的每个事件写出一个数据包。
    pub fn on_breakpoint_hit<C: CpuContext>(
        &mut self,
        cpu: &C,
        address: u32,
    ) -> Result<(), ProfilerError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let flags = session.flags.get(address);
        let sp = cpu.stack_pointer();
        let cycle = cpu.current_cycle();

        for flag in flags.iter() {
            let kind = flag.packet_kind();
            let packet = match flag {
                EventFlag::InterruptEnter | EventFlag::ManualBreakpoint => {
                    Packet::with_target(kind, cycle, sp, address)
                }
                EventFlag::SubroutineEnter => {
                    Packet::with_target(kind, cycle, sp, resolve_call_target(cpu, address))
                }
                EventFlag::SubroutineExit | EventFlag::InterruptExit => {
                    Packet::new(kind, cycle, sp)
                }
            };
            session.write(packet)?;
        }
        Ok(())
    }

    /// 周期统计检查点
    pub fn notify_hint<C: CpuContext>(&mut self, cpu: &C, cycles: u32) -> Result<(), ProfilerError> {
        self.notify(cpu, PacketKind::Hint, cycles)
    }

    /// 垂直中断时刻
    pub fn notify_vint<C: CpuContext>(&mut self, cpu: &C, cycles: u32) -> Result<(), ProfilerError> {
        self.notify(cpu, PacketKind::Vint, cycles)
    }

    /// 周期计数器重新定基
    pub fn notify_adjust_cycles<C: CpuContext>(
        &mut self,
        cpu: &C,
        cycles: u32,
    ) -> Result<(), ProfilerError> {
        self.notify(cpu, PacketKind::AdjustCycles, cycles)
    }

    fn notify<C: CpuContext>(
        &mut self,
        cpu: &C,
        kind: PacketKind,
        cycles: u32,
    ) -> Result<(), ProfilerError> {
        if let Some(session) = self.session.as_mut() {
            session.write(Packet::new(kind, cycles, cpu.stack_pointer()))?;
        }
        Ok(())
    }
}

/// 合并手动断点，返回实际装上的条数
fn arm_manual_breakpoints(flags: &mut FlagTable, addrs: &[u32]) -> usize {
    let mut added = 0;
    for &addr in addrs {
        if flags.insert(addr, EventFlag::ManualBreakpoint) {
            added += 1;
        } else {
            warn!("手动断点 {:#x} 不在ROM内或未对齐，跳过", addr);
        }
    }
    added
}

/// 用命中时的寄存器重新解码调用目标
fn resolve_call_target<C: CpuContext>(cpu: &C, address: u32) -> u32 {
    let words = cpu.image().get((address / 2) as usize..).unwrap_or(&[]);
    let inst = instructions::decode(words, address);
    inst.branch_target(cpu.dregs(), cpu.aregs())
        .unwrap_or_else(|| {
            warn!("无法解析 {:#x} 处的调用目标", address);
            0
        })
}

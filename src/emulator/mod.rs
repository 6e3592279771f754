//! 模拟器接口模块
//!
//! 分析器只通过这里的两个 trait 与解释器交互：读取 CPU 状态，以及安装/移除断点。

mod breakpoints;
pub mod instructions;
pub mod profiler;
pub mod state;

pub use breakpoints::BreakpointSet;
pub use profiler::{Profiler, ProfilerError};
pub use state::State;

use crate::const_values::TimingConfig;

/// 正在运行的 CPU 上下文
pub trait CpuContext {
    /// 已加载的程序镜像（按 16 位字存放）
    fn image(&self) -> &[u16];

    /// 镜像大小（字节）
    fn image_size(&self) -> u32 {
        (self.image().len() * 2) as u32
    }

    /// 从模拟地址空间读取 32 位值
    fn read_long(&self, addr: u32) -> u32;

    /// 当前周期计数
    fn current_cycle(&self) -> u32;

    fn dregs(&self) -> &[u32; 8];

    fn aregs(&self) -> &[u32; 8];

    /// A7
    fn stack_pointer(&self) -> u32 {
        self.aregs()[7]
    }

    /// 当前机器的时钟参数
    fn timing(&self) -> TimingConfig;
}

/// 断点分发机制
///
/// PC 到达已注册地址时，解释器必须在执行该指令之前调用
/// [`Profiler::on_breakpoint_hit`]。重复注册同一地址是空操作。
pub trait BreakpointDispatch {
    fn insert_breakpoint(&mut self, addr: u32);

    fn remove_breakpoint(&mut self, addr: u32);
}

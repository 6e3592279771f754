use anyhow::{self, Context};
use serde::Deserialize;
use std::path::Path;

/// 外部中断向量槽 (IRQ2)
pub const EXT_INT_VECTOR: u32 = 0x68;
/// 水平中断向量槽 (IRQ4)
pub const H_INT_VECTOR: u32 = 0x70;
/// 垂直中断向量槽 (IRQ6)
pub const V_INT_VECTOR: u32 = 0x78;

/// 扫描会话启动时读取的中断向量
pub const INTERRUPT_VECTORS: [(&str, u32); 3] = [
    ("EXT-INT", EXT_INT_VECTOR),
    ("H-INT", H_INT_VECTOR),
    ("V-INT", V_INT_VECTOR),
];

/// 68000 只有 24 根地址线
pub const ADDRESS_MASK: u32 = 0x00ff_ffff;

pub const MDP_MAGIC: [u8; 3] = *b"MDP";
pub const MDP_VERSION: u8 = 1;
pub const MDP_HEADER_SIZE: usize = 256;

/// 主时钟与 68000 分频（会话启动时写入文件头）
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    pub mclk: u32,
    pub divider: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        // NTSC
        Self {
            mclk: 53_693_175,
            divider: 7,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TraceConfig {
    pub output: String,
    #[serde(default)]
    pub breakpoint_file: Option<String>,
}

/// 性能分析器配置（来自 profile/config.toml）
#[derive(Deserialize, Debug, Clone)]
pub struct ProfilerConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    pub trace: TraceConfig,
}

impl ProfilerConfig {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<ProfilerConfig> {
        let toml_str = std::fs::read_to_string(&path)
            .with_context(|| format!("无法读取配置文件: {:?}", &path.as_ref().as_os_str()))?;
        let config: ProfilerConfig = toml::from_str(&toml_str)
            .with_context(|| format!("无法解析配置文件: {:?}", &path.as_ref().as_os_str()))?;
        anyhow::Ok(config)
    }
}

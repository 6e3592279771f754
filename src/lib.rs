//! 68000 控制流性能分析库
pub mod const_values;
pub mod emulator;
pub mod utils;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use const_values::ProfilerConfig;
use emulator::profiler::{ProfilerArgs, read_trace};
use emulator::{Profiler, State};
use utils::{M68kDisassembler, load_rom};

/// 68000 控制流性能分析器
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// ROM 文件路径
    #[arg(short, long)]
    pub rom: String,

    /// 配置文件地址
    #[arg(short, long, default_value = "profile/config.toml")]
    pub config: String,

    /// 分析器参数
    #[command(flatten)]
    pub profiler: ProfilerArgs,
}

/// 相对路径按项目目录解析
fn resolve_config_path(config: &str) -> PathBuf {
    let arg_cfg_path = PathBuf::from(config);
    if arg_cfg_path.is_absolute() {
        arg_cfg_path
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(config)
    }
}

pub fn build_profiler_run_blocking(args: Args) -> Result<()> {
    let config = ProfilerConfig::new(resolve_config_path(&args.config))?;
    let output = args.profiler.output.unwrap_or(config.trace.output);
    let breakpoints = args.profiler.breakpoints.or(config.trace.breakpoint_file);

    info!(path = %args.rom, "加载ROM文件");
    let rom = load_rom(&args.rom)?;
    let mut state = State::new(rom, config.timing);
    info!(
        mclk = config.timing.mclk,
        divider = config.timing.divider,
        "时钟配置"
    );

    let mut profiler = Profiler::new();
    if profiler
        .set_breakpoint_path(breakpoints.as_deref().map(Path::new))
        .is_err()
    {
        warn!("不使用手动断点继续运行");
    }

    profiler.start(&mut state, &output)?;

    if args.profiler.list {
        print_instrumentation(&profiler, &state)?;
    }

    profiler.stop(&mut state)?;

    // 回读文件头确认输出完整
    let (header, packets) = read_trace(&mut BufReader::new(File::open(&output)?))?;
    info!(
        version = header.version,
        packets = packets.len(),
        "追踪文件校验通过"
    );
    Ok(())
}

/// 打印复位后的CPU状态与所有插桩地址
fn print_instrumentation(profiler: &Profiler, state: &State) -> Result<()> {
    println!("{}", state);
    let disasm = M68kDisassembler::new()?;
    for (addr, flags) in profiler.instrumented() {
        let index = (addr / 2) as usize;
        let end = (index + 5).min(state.rom.len());
        let text = match disasm.disasm_with_details(&state.rom[index..end], addr) {
            Ok(text) => text,
            Err(_) => format!("0x{:06x}: {:04x}    <invalid>", addr, state.rom[index]),
        };
        println!("{} {}", format!("{:<14}", flags.to_string()).cyan(), text);
    }
    Ok(())
}

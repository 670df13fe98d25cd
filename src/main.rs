use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;

use fwmemdump::driver::fw_cdev;
use fwmemdump::layout::StridePolicy;
use fwmemdump::walker::{RegionWalker, WalkOptions};

/// Dump the configuration memory of a FireWire unit.
#[derive(Parser, Debug)]
struct Args {
    /// Firewire character device of the unit, e.g. /dev/fw1
    device: PathBuf,

    /// Timeout of each read transaction
    #[arg(long, default_value_t = fw_cdev::DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// How entries of region D are spaced
    #[arg(long, value_enum, default_value_t = StridePolicy::Constant)]
    region_d_stride: StridePolicy,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp_micros()
        .init();

    let args = Args::parse();

    let device = fw_cdev::Device::open(&args.device, Duration::from_millis(args.timeout_ms))
        .with_context(|| format!("failed to open {:?}", args.device))?;
    info!("Opened unit {:?}", args.device);

    let options = WalkOptions { region_d_stride: args.region_d_stride };
    let mut walker = RegionWalker::new(device, std::io::stdout().lock()).with_options(options);
    walker.walk().context("failed to walk configuration memory")?;

    Ok(())
}

pub mod bp_class;
pub mod class_cache;
pub mod cli;
pub mod coverage;
pub mod depth_gate;
pub mod errors;
pub mod htslib_pileup;
pub mod pipeline;
pub mod roi;
pub mod sources;
pub mod writer;

use cli::CalcRoiCovgArgs;
use errors::Result;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: Once = Once::new();

pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

pub fn run_from_args(args: CalcRoiCovgArgs) -> Result<()> {
    pipeline::run(&args).map(|_| ())
}

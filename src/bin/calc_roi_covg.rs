use mimalloc::MiMalloc;
use std::process::ExitCode;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> ExitCode {
    roi_covg::init_tracing();
    match roi_covg::cli::parse_from_env().and_then(roi_covg::run_from_args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("calc_roi_covg: {error}");
            ExitCode::from(1)
        }
    }
}

//! `blockgrid` command line entry point (native).

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
fn main() {
    env_logger::init();
    log::debug!("Starting blockgrid");

    if let Err(e) = blockgrid_app::cli::run_from_env() {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(all(feature = "native", not(target_arch = "wasm32"))))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}

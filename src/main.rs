use ddsmt::{cli, interrupt, logsetup, orchestrate};

fn main() {
    let cfg = cli::parse();
    logsetup::init(cfg.verbose);

    if ctrlc::set_handler(interrupt::request).is_err() {
        log::warn!("failed to install SIGINT handler; Ctrl-C will terminate immediately");
    }

    if let Err(e) = orchestrate::run(cfg) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

use anyhow::Result;
use log::LevelFilter;
use pbcvt::harness::{fixtures, Harness, NativeBinding};
use std::io;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Warn)
        .parse_env(env_logger::Env::default().filter_or("PBCVT_LOG", "warn"))
        .init();

    let (a, b) = fixtures()?;

    let stdout = io::stdout();
    let mut harness = Harness::new(NativeBinding, stdout.lock());
    harness.run(&a, &b)?;

    Ok(())
}

use clap::Parser;
use fatplan_driver::Args;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    fatplan_driver::run(&args)?;
    Ok(())
}

use std::process::ExitCode;

use anyhow::{Context, Result};
use engine::{Engine, EngineConfig};
use log::*;

fn init() -> Result<Engine> {
    Engine::new(EngineConfig::default()).context("Failed to initialize the renderer")
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let engine = match init() {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("ERROR: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = engine.run().context("Renderer stopped") {
        error!("{:#}", err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

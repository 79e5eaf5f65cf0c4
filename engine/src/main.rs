use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Result};
use log::info;
use structopt::StructOpt;

use sable_engine::analysis::ConstPropConfig;
use sable_engine::ir::adapter::method::Method;
use sable_engine::ir::asm;
use sable_engine::ir::bridge::function::Function;
use sable_engine::optimize;
use sable_shared::logging::{self, Tracer};

#[derive(StructOpt)]
#[structopt(
    name = "sable-engine",
    about = "Intraprocedural constant propagation for register bytecode",
    rename_all = "kebab-case"
)]
struct Args {
    /// Verbosity
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Fold arithmetic over inline literals
    #[structopt(long)]
    fold_arithmetic: bool,

    /// Track the values of static fields
    #[structopt(long)]
    track_static_fields: bool,

    /// Method to optimize (.json wire form or .sasm text)
    input: PathBuf,
}

fn load_method(input: &PathBuf) -> Result<Method> {
    let content = fs::read_to_string(input)?;
    let method = match input.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("sasm") => {
            let name = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("anonymous");
            asm::parse_method(name, &content)?
        }
        _ => bail!("expect a .json or .sasm input"),
    };
    Ok(method)
}

fn main() -> Result<()> {
    let args = Args::from_args();
    let Args {
        verbose,
        fold_arithmetic,
        track_static_fields,
        input,
    } = args;

    // setup logging
    logging::setup(verbose)?;

    // load and validate the method
    let method = load_method(&input)?;
    let mut function = Function::convert(&method)?;
    info!("loaded method {}", function.name);

    // run the propagation and print the optimized body
    let config = ConstPropConfig {
        fold_arithmetic,
        track_static_fields,
    };
    {
        let tracer = Tracer::new(format!("constant propagation on {}", function.name));
        optimize(&mut function, config)?;
        tracer.log("analysis and rewrite complete");
    }
    println!("{}", function);

    Ok(())
}

use anyhow::{Context, Result};
use clap::{Arg, Command};
use quiver_core::{Graph, OpRegistry};
use std::path::Path;

mod imagery;
mod model;

fn main() -> Result<()> {
    let env = env_logger::Env::default().filter_or("QUIVER_LOG", "warn");
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();

    let matches = Command::new("quiver")
        .about("Small neural-network inference runtime")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run a model over an image")
                .arg(Arg::new("model").long("model").takes_value(true).required(true))
                .arg(Arg::new("input").long("input").takes_value(true).required(true))
                .arg(Arg::new("output").long("output").takes_value(true).required(true)),
        )
        .subcommand(
            Command::new("dump")
                .about("Print the node table and the execution order")
                .arg(Arg::new("model").long("model").takes_value(true).required(true)),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("run", sub)) => run(
            sub.value_of("model").unwrap(),
            sub.value_of("input").unwrap(),
            sub.value_of("output").unwrap(),
        ),
        Some(("dump", sub)) => dump(sub.value_of("model").unwrap()),
        _ => unreachable!("subcommand is required"),
    }
}

fn build(model_path: &str) -> Result<Graph> {
    let (records, weights) = model::load(Path::new(model_path))?;
    let registry = OpRegistry::with_builtins();
    let graph = Graph::build(&records, &weights, &registry)
        .with_context(|| format!("building the graph from {model_path}"))?;
    Ok(graph)
}

fn run(model_path: &str, input: &str, output: &str) -> Result<()> {
    let mut graph = build(model_path)?;
    let entry = graph
        .entry_edges()
        .next()
        .context("the model declares no entry edge")?
        .to_string();
    let exit =
        graph.exit_edges().next().context("the model declares no exit edge")?.to_string();

    let img = image::open(input).with_context(|| format!("opening {input}"))?.to_rgb8();
    log::info!("running {model_path} over a {}x{} image", img.width(), img.height());
    graph.set_inputs(&entry, vec![imagery::tensor_from_image(&img)])?;
    graph.forward()?;

    let outputs = graph.outputs(&exit)?;
    let result = outputs.first().context("the forward pass produced an empty batch")?;
    imagery::image_from_tensor(result)?
        .save(output)
        .with_context(|| format!("writing {output}"))?;
    log::info!("wrote {output}");
    Ok(())
}

fn dump(model_path: &str) -> Result<()> {
    let graph = build(model_path)?;
    for node in graph.nodes() {
        let inputs: Vec<&str> = node.inputs.iter().map(|&e| graph.edge_name(e)).collect();
        let outputs: Vec<&str> = node.outputs.iter().map(|&e| graph.edge_name(e)).collect();
        println!(
            "#{:<3} {:<24} {:<24} {:?} -> {:?}",
            node.id,
            node.name,
            node.ty,
            inputs,
            outputs
        );
    }
    println!("order: {:?}", graph.order());
    Ok(())
}

//! Example: Load and inspect a tracing file.
//!
//! Run with: cargo run --example inspect_tracing -- path/to/AA0001.swc

use std::env;

use nv_core::{load_tracing, StructureKind};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_tracing <path-to-swc-or-json>");
        return;
    }

    let path = &args[1];
    println!("Loading tracing: {}", path);

    match load_tracing(path) {
        Ok(tracing) => {
            println!("\n=== Tracing: {} ===", tracing.label.as_deref().unwrap_or(path));
            println!("Format: {:?}", tracing.format);
            println!("Total nodes: {}", tracing.node_count());

            for part in &tracing.parts {
                let nodes = &part.nodes;
                let somas = nodes.iter().filter(|n| n.kind() == StructureKind::Soma).count();
                let bounds = nodes.bounds();
                println!("\n--- {:?} ---", part.role);
                println!("  Nodes: {}", nodes.len());
                println!("  Roots: {}", nodes.roots().count());
                println!("  Orphans: {}", nodes.orphans().count());
                println!("  Soma samples: {}", somas);
                if !bounds.is_empty() {
                    println!("  Bounds: {:?} .. {:?}", bounds.min, bounds.max);
                    println!("  Centroid: {:?}", nodes.centroid());
                }
            }
        }
        Err(e) => {
            eprintln!("Error loading tracing: {}", e);
            std::process::exit(1);
        }
    }
}

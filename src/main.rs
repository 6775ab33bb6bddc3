// ========================================================================================
//
//                      THE COMMAND-LINE ORCHESTRATOR: HIEVAL
//
// ========================================================================================
//
// Loads a hierarchy description and a code universe, builds the layer stack and either
// writes the column layout of every layer or projects prediction and gold matrices into
// their combined multi-layer form. All numeric work lives in the library.

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, Parser, Subcommand};
use hieval::io::{
    load_hierarchy_json, load_hierarchy_table, read_code_list, read_label_matrix,
    write_layer_index, write_matrix,
};
use hieval::{
    AncestorTable, CodeIndex, HierarchyConfig, LayerStack, aggregate, binarize, project_layers,
};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

// ========================================================================================
//                         COMMAND-LINE INTERFACE DEFINITION
// ========================================================================================

#[derive(Parser)]
#[command(
    name = "hieval",
    version,
    about = "Hierarchy-aware label projection for multi-label evaluation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the layer stack and write the column layout of every layer
    #[command(about = "Describe the layer columns (outputs: a layer/column/code TSV)")]
    Layers {
        #[command(flatten)]
        hierarchy: HierarchyArgs,

        /// Path of the TSV file to write
        #[arg(long)]
        out: PathBuf,
    },

    /// Project prediction and gold matrices through every layer and concatenate them
    #[command(
        about = "Project labels across layers (outputs: combined_predictions.tsv, combined_golds.tsv)"
    )]
    Project {
        #[command(flatten)]
        hierarchy: HierarchyArgs,

        /// TSV prediction matrix with one column per code
        #[arg(long)]
        predictions: PathBuf,

        /// TSV gold matrix with one column per code
        #[arg(long)]
        golds: PathBuf,

        /// Index of the last stacked layer to include (defaults to the last one)
        #[arg(long)]
        depth: Option<usize>,

        /// Clamp projected counts to 0/1
        #[arg(long)]
        binarize: bool,

        /// Directory receiving the combined matrices
        #[arg(long)]
        out_dir: PathBuf,
    },
}

#[derive(Args)]
struct HierarchyArgs {
    /// Hierarchy description: a JSON graph (.json) or a source/level/target table
    #[arg(long)]
    hierarchy: PathBuf,

    /// Code universe, one code per line in column order
    #[arg(long)]
    codes: PathBuf,

    /// TOML run configuration; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ancestor layers to build
    #[arg(long, value_name = "N")]
    max_layer: Option<usize>,

    /// Keep non-branching ancestors and self-representing edges
    #[arg(long)]
    keep_duplicates: bool,

    /// Do not put the leaf filter in front of the ancestor layers
    #[arg(long)]
    no_leaf_filter: bool,
}

impl HierarchyArgs {
    fn resolve_config(&self) -> Result<HierarchyConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => HierarchyConfig::load(path)?,
            None => HierarchyConfig::default(),
        };
        if let Some(max_layer) = self.max_layer {
            config.max_layer = max_layer;
        }
        if self.keep_duplicates {
            config.suppress_duplicates = false;
        }
        if self.no_leaf_filter {
            config.prepend_leaf_filter = false;
        }
        Ok(config)
    }

    fn build(
        &self,
        config: &HierarchyConfig,
    ) -> Result<(CodeIndex, LayerStack), Box<dyn Error>> {
        let table = load_hierarchy(&self.hierarchy)?;
        let codes = read_code_list(&self.codes)?;
        eprintln!(
            "> {} codes, {} hierarchy entries, {} ancestor layers.",
            codes.len(),
            table.len(),
            config.max_layer
        );
        let stack = aggregate(&codes, &table, config.policy(), config.prepend_leaf_filter)?;
        Ok((codes, stack))
    }
}

fn load_hierarchy(path: &Path) -> Result<AncestorTable, Box<dyn Error>> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(load_hierarchy_json(path)?)
    } else {
        Ok(load_hierarchy_table(path)?)
    }
}

// ========================================================================================
//                                    SUBCOMMANDS
// ========================================================================================

fn run_layers(hierarchy: HierarchyArgs, out: PathBuf) -> Result<(), Box<dyn Error>> {
    let config = hierarchy.resolve_config()?;
    let stack = hierarchy.build(&config)?.1;
    write_layer_index(&out, &stack)?;
    eprintln!("> Wrote {} layers to {}", stack.len(), out.display());
    Ok(())
}

fn run_project(
    hierarchy: HierarchyArgs,
    predictions: PathBuf,
    golds: PathBuf,
    depth: Option<usize>,
    clamp: bool,
    out_dir: PathBuf,
) -> Result<(), Box<dyn Error>> {
    let mut config = hierarchy.resolve_config()?;
    if depth.is_some() {
        config.eval_depth = depth;
    }
    let eval_depth = config.resolved_eval_depth()?;

    let (codes, stack) = hierarchy.build(&config)?;
    let preds = read_label_matrix(&predictions, &codes)?;
    let gold = read_label_matrix(&golds, &codes)?;

    let mut combined = project_layers(preds.view(), gold.view(), stack.layers(), eval_depth)?;
    if clamp {
        combined.predictions = binarize(combined.predictions.view());
        combined.golds = binarize(combined.golds.view());
    }

    fs::create_dir_all(&out_dir)?;
    let labels = stack.column_labels(eval_depth);
    let preds_path = out_dir.join("combined_predictions.tsv");
    let golds_path = out_dir.join("combined_golds.tsv");
    write_matrix(&preds_path, &labels, combined.predictions.view())?;
    write_matrix(&golds_path, &labels, combined.golds.view())?;
    eprintln!(
        "> Wrote {} x {} combined matrices to {}",
        combined.predictions.nrows(),
        labels.len(),
        out_dir.display()
    );
    Ok(())
}

// ========================================================================================
//                                       MAIN
// ========================================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let start_time = Instant::now();

    let result = match Cli::parse().command {
        Commands::Layers { hierarchy, out } => run_layers(hierarchy, out),
        Commands::Project {
            hierarchy,
            predictions,
            golds,
            depth,
            binarize: clamp,
            out_dir,
        } => run_project(hierarchy, predictions, golds, depth, clamp, out_dir),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    log::info!("Finished in {:.2?}.", start_time.elapsed());
}

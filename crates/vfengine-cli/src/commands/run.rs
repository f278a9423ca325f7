//! Query execution command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use comfy_table::Cell;
use vfengine_common::NodeId;
use vfengine_core::plan::{RelationType, SinkKind};
use vfengine_engine::query::JoinQuery;
use vfengine_engine::{Engine, EngineConfig, QueryOutcome};

use crate::OutputFormat;
use crate::loader;
use crate::output::{self, Format};

/// Arguments of `vfengine run`.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Edge list CSV (`src,dst` per row)
    #[arg(long, value_name = "FILE")]
    pub edges: PathBuf,

    /// Join predicates, e.g. "a->b,b->c"
    #[arg(long)]
    pub query: String,

    /// Column ordering, e.g. "a,b,c" (defaults to order of appearance)
    #[arg(short, long, value_delimiter = ',')]
    pub order: Vec<String>,

    /// Explode rows instead of building factorized batches
    #[arg(long)]
    pub unpacked: bool,

    /// Terminal operator
    #[arg(long, default_value_t = SinkKind::Count)]
    pub sink: SinkKind,

    /// Propagate selections to the root before the sink
    #[arg(long)]
    pub cascade: bool,

    /// Scan only these node ids
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    pub sources: Vec<u64>,

    /// Relation type of a joined attribute, e.g. "b=1:1"
    #[arg(long = "relation", value_name = "ATTR=TYPE")]
    pub relations: Vec<String>,

    /// Trace every chunk an operator publishes
    #[arg(long)]
    pub debug_chunks: bool,
}

impl RunArgs {
    /// Engine configuration for these arguments, starting from the
    /// environment defaults.
    ///
    /// # Errors
    ///
    /// Fails on a malformed `--relation` value.
    pub fn config(&self, base: EngineConfig) -> Result<EngineConfig> {
        let mut config = base.with_sink(self.sink);
        if self.unpacked {
            config = config.with_packed(false);
        }
        if self.cascade {
            config = config.with_cascade_selection();
        }
        if self.debug_chunks {
            config = config.with_debug_chunks();
        }
        if !self.sources.is_empty() {
            config = config
                .with_source_nodes(self.sources.iter().copied().map(NodeId::new).collect());
        }
        for relation in &self.relations {
            let (attribute, kind) = relation
                .split_once('=')
                .ok_or_else(|| anyhow!("expected ATTR=TYPE, got '{relation}'"))?;
            let kind: RelationType = kind.trim().parse().map_err(|e: String| anyhow!(e))?;
            config = config.with_relation_type(attribute.trim(), kind);
        }
        Ok(config)
    }

    /// Column ordering, defaulting to the order attributes appear in the query.
    ///
    /// # Errors
    ///
    /// Fails if the query does not parse.
    pub fn ordering(&self) -> Result<Vec<String>> {
        if !self.order.is_empty() {
            return Ok(self.order.iter().map(|a| a.trim().to_string()).collect());
        }
        let query = JoinQuery::parse(&self.query)?;
        Ok(query.attributes().iter().map(ToString::to_string).collect())
    }
}

/// Loads the edges and runs the query.
///
/// # Errors
///
/// Fails if loading, planning or execution fails.
pub fn execute(args: &RunArgs) -> Result<QueryOutcome> {
    let config = args.config(EngineConfig::from_env())?;
    let ordering = args.ordering()?;
    let store = loader::load_store(&args.edges)?;
    let engine = Engine::new(Arc::new(store));
    engine
        .run(&args.query, ordering.iter().map(String::as_str), &config)
        .with_context(|| format!("query '{}' failed", args.query))
}

/// Run the run command.
///
/// # Errors
///
/// Fails if the query fails or the outcome cannot be printed.
pub fn run(args: &RunArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let outcome = execute(args)?;

    match Format::from(format) {
        Format::Json => output::print_json(&outcome, quiet)?,
        Format::Table => {
            let mut items = vec![
                ("Rows", outcome.rows.to_string()),
                ("Packed", outcome.packed.to_string()),
                ("Elapsed", format!("{:.3} ms", outcome.elapsed_ms)),
            ];
            if let Some(roots) = outcome.surviving_roots {
                items.push(("Surviving Roots", roots.to_string()));
            }
            output::status(&output::key_value_table(&items).to_string(), quiet);

            let mut operators = output::create_table();
            output::add_header(&mut operators, &["Operator", "Calls"]);
            for op in &outcome.operators {
                operators.add_row(vec![Cell::new(op.name), Cell::new(op.calls)]);
            }
            output::status(&operators.to_string(), quiet);

            if !outcome.minimums.is_empty() {
                let mut minimums = output::create_table();
                output::add_header(&mut minimums, &["Attribute", "Minimum"]);
                for min in &outcome.minimums {
                    minimums.add_row(vec![Cell::new(min.attribute), Cell::new(min.value)]);
                }
                output::status(&minimums.to_string(), quiet);
            }
            output::status(&outcome.tree, quiet);
        }
    }
    Ok(())
}

//! Hograph CLI: edit a higher-order graph stored in Neo4j or Kuzu
//!
//! Without a subcommand the interactive menu starts. Connection settings come
//! from flags or the matching environment variables.

mod menu;
mod parsers;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hograph::{connect, Backend, DatabaseConfig, GraphStorage, KuzuConfig, Neo4jConfig};
use std::path::PathBuf;
use tracing::info;

use crate::menu::{capabilities_table, summary_table, Shell};

#[derive(Parser)]
#[command(name = "hograph", version, about = "Higher-order graph editor for Neo4j and Kuzu")]
struct Cli {
    /// Backend to use (NEO4J or KUZU)
    #[arg(long, global = true, env = "DATABASE_PROVIDER", default_value = "NEO4J")]
    provider: Backend,

    /// Neo4j HTTP URL
    #[arg(long, global = true, env = "DB_URI", default_value = "http://localhost:7474")]
    uri: String,

    /// Neo4j user
    #[arg(long, global = true, env = "DB_USERNAME", default_value = "neo4j")]
    username: String,

    /// Neo4j password
    #[arg(long, global = true, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Neo4j database name
    #[arg(long, global = true, env = "DB_NAME", default_value = "neo4j")]
    database: String,

    /// Kuzu database directory
    #[arg(long, global = true, env = "KUZU_DB_PATH", default_value = "./demo_db")]
    kuzu_path: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            provider: self.provider,
            neo4j: Neo4jConfig {
                uri: self.uri.clone(),
                username: self.username.clone(),
                password: self.password.clone(),
                database: self.database.clone(),
            },
            kuzu: KuzuConfig {
                path: self.kuzu_path.clone(),
            },
        }
    }
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Start the interactive menu
    Shell,
    /// Load node and/or edge files into the backend
    Import {
        /// Nodes file
        #[arg(long)]
        nodes: Option<PathBuf>,

        /// Edges file
        #[arg(long)]
        edges: Option<PathBuf>,

        /// Empty the mirrored sets before loading
        #[arg(long)]
        clear: bool,
    },
    /// Write nodes.csv and edges.csv
    Export {
        /// Target directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Remove all data from the backend
    Clear,
    /// Show the backend and what it can store
    Show,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.database_config();
    let db = connect(&config).with_context(|| format!("connecting to {}", config.provider))?;
    info!("Using {} backend", db.backend());

    let mut graph = GraphStorage::new(db.clone());
    let result = run(cli.command.unwrap_or(Commands::Shell), &mut graph).await;

    // Always release the backend, even when the command failed
    let closed = db.close().await;
    result?;
    closed.context("closing the database")?;
    Ok(())
}

async fn run(command: Commands, graph: &mut GraphStorage) -> Result<()> {
    match command {
        Commands::Shell => {
            println!("Hograph v{} ({} backend)", hograph::version(), graph.database().backend());
            let stdin = std::io::stdin();
            Shell::new(stdin.lock(), std::io::stdout()).run(graph).await?;
            println!("Bye!");
        }
        Commands::Import { nodes, edges, clear } => {
            if nodes.is_none() && edges.is_none() {
                anyhow::bail!("nothing to import: pass --nodes and/or --edges");
            }
            if let Some(path) = nodes {
                let count = graph
                    .import_nodes_from_csv(&path, clear)
                    .await
                    .with_context(|| format!("importing nodes from {}", path.display()))?;
                println!("Imported {} node(s) from {}", count, path.display());
            }
            if let Some(path) = edges {
                let count = graph
                    .import_edges_from_csv(&path, clear)
                    .await
                    .with_context(|| format!("importing edges from {}", path.display()))?;
                println!("Imported {} edge(s) from {}", count, path.display());
            }
            println!("{}", summary_table(graph));
        }
        Commands::Export { dir } => {
            let summary = graph
                .export_graph(&dir)
                .await
                .with_context(|| format!("exporting to {}", dir.display()))?;
            println!(
                "Exported {} node(s) and {} edge(s) to {}",
                summary.nodes,
                summary.edges,
                dir.display()
            );
        }
        Commands::Clear => {
            graph.clear_graph().await?;
            println!("Graph cleared successfully.");
        }
        Commands::Show => {
            let db = graph.database();
            println!("Backend: {}", db.backend());
            println!("{}", capabilities_table(&db.capabilities()));
        }
    }
    Ok(())
}

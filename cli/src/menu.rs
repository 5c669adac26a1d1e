//! Interactive numbered-menu shell
//!
//! Reads from any `BufRead` and writes to any `Write` so the whole dialogue
//! can be driven from tests. A failed command prints its error and the menu
//! comes back; end of input leaves the shell.

use anyhow::Result;
use comfy_table::{ContentArrangement, Table};
use hograph::{Capabilities, GraphStorage};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::parsers::{parse_edges, parse_hyper_edges, parse_nodes};

const MAIN_MENU: &str = "\nChoose an option:\n\
    1 - Import Graph\n\
    2 - Modify Graph\n\
    3 - Export Graph\n\
    4 - Clear Graph\n\
    5 - Display Higher-Order Graph\n\
    6 - Show Backend Capabilities\n\
    7 - Exit";

const MODIFY_MENU: &str = "\nChoose an option:\n\
    1 - Add Node(s)\n\
    2 - Delete Node(s)\n\
    3 - Add Edge(s)\n\
    4 - Delete Edge(s)\n\
    5 - Add Hyper Edge(s)\n\
    6 - Delete Hyper Edge(s)\n\
    7 - Back";

pub struct Shell<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Run the main menu until Exit or end of input
    pub async fn run(&mut self, graph: &mut GraphStorage) -> Result<()> {
        loop {
            writeln!(self.out, "{}", MAIN_MENU)?;
            let Some(choice) = self.read_number()? else {
                break;
            };
            writeln!(self.out)?;

            let outcome = match choice {
                1 => self.import(graph).await,
                2 => self.modify(graph).await,
                3 => self.export(graph).await,
                4 => self.clear(graph).await,
                5 => self.display(graph),
                6 => self.capabilities(graph),
                7 => break,
                _ => Ok(()),
            };
            if let Err(e) = outcome {
                writeln!(self.out, "Error: {:#}", e)?;
            }
        }
        Ok(())
    }

    async fn modify(&mut self, graph: &mut GraphStorage) -> Result<()> {
        loop {
            writeln!(self.out, "{}", MODIFY_MENU)?;
            let Some(choice) = self.read_number()? else {
                return Ok(());
            };
            writeln!(self.out)?;

            let outcome = match choice {
                1 => self.add_nodes(graph).await,
                2 => self.delete_nodes(graph).await,
                3 => self.change_edges(graph, true).await,
                4 => self.change_edges(graph, false).await,
                5 => self.change_hyper_edges(graph, true),
                6 => self.change_hyper_edges(graph, false),
                7 => return Ok(()),
                _ => Ok(()),
            };
            if let Err(e) = outcome {
                writeln!(self.out, "Error: {:#}", e)?;
            }
        }
    }

    async fn import(&mut self, graph: &mut GraphStorage) -> Result<()> {
        let nodes = self.read_path("Nodes file (blank to skip): ")?;
        let edges = self.read_path("Edges file (blank to skip): ")?;
        let clear = self
            .read_line("Replace the current graph? (y/N): ")?
            .is_some_and(|answer| answer.eq_ignore_ascii_case("y"));

        if let Some(path) = nodes {
            let count = graph.import_nodes_from_csv(&path, clear).await?;
            writeln!(self.out, "Imported {} node(s) from {}.", count, path.display())?;
        }
        if let Some(path) = edges {
            let count = graph.import_edges_from_csv(&path, clear).await?;
            writeln!(self.out, "Imported {} edge(s) from {}.", count, path.display())?;
        }
        Ok(())
    }

    async fn export(&mut self, graph: &mut GraphStorage) -> Result<()> {
        let dir = self
            .read_path("Export directory (blank for current): ")?
            .unwrap_or_else(|| PathBuf::from("."));
        let summary = graph.export_graph(&dir).await?;
        writeln!(
            self.out,
            "Exported {} node(s) and {} edge(s) to {}.",
            summary.nodes,
            summary.edges,
            dir.display()
        )?;
        Ok(())
    }

    async fn clear(&mut self, graph: &mut GraphStorage) -> Result<()> {
        graph.clear_graph().await?;
        writeln!(self.out, "Graph cleared successfully.")?;
        Ok(())
    }

    fn display(&mut self, graph: &GraphStorage) -> Result<()> {
        writeln!(self.out, "{}", graph)?;
        writeln!(self.out, "{}", summary_table(graph))?;
        Ok(())
    }

    fn capabilities(&mut self, graph: &GraphStorage) -> Result<()> {
        let db = graph.database();
        writeln!(self.out, "Backend: {}", db.backend())?;
        writeln!(self.out, "{}", capabilities_table(&db.capabilities()))?;
        Ok(())
    }

    async fn add_nodes(&mut self, graph: &mut GraphStorage) -> Result<()> {
        let Some(line) = self.read_line("Enter node name(s) separated by semi-colon: ")? else {
            return Ok(());
        };
        let mut added = 0;
        for name in parse_nodes(&line) {
            match graph.add_node(&name).await {
                Ok(()) => added += 1,
                Err(e) => writeln!(self.out, "Error: could not add node '{}': {}", name, e)?,
            }
        }
        writeln!(self.out, "{} node(s) added.", added)?;
        Ok(())
    }

    async fn delete_nodes(&mut self, graph: &mut GraphStorage) -> Result<()> {
        let Some(line) = self.read_line("Enter node name(s) to delete separated by semi-colon: ")?
        else {
            return Ok(());
        };
        let mut deleted = 0;
        for name in parse_nodes(&line) {
            match graph.delete_node(&name).await {
                Ok(()) => deleted += 1,
                Err(e) => writeln!(self.out, "Error: could not delete node '{}': {}", name, e)?,
            }
        }
        writeln!(self.out, "{} node(s) deleted.", deleted)?;
        Ok(())
    }

    async fn change_edges(&mut self, graph: &mut GraphStorage, add: bool) -> Result<()> {
        let prompt = if add {
            "Enter edge(s) in format (relationship_name,start_node,end_node) separated by semi-colon: "
        } else {
            "Enter edge(s) to delete in format (relationship_name,start_node,end_node) separated by semi-colon: "
        };
        let Some(line) = self.read_line(prompt)? else {
            return Ok(());
        };
        let mut changed = 0;
        for edge in parse_edges(&line)? {
            let outcome = if add {
                graph.add_edge(&edge.start, &edge.end, &edge.relationship).await
            } else {
                graph.delete_edge(&edge.start, &edge.end, &edge.relationship).await
            };
            match outcome {
                Ok(()) => changed += 1,
                Err(e) => writeln!(
                    self.out,
                    "Error: ({}) --[{}]--> ({}): {}",
                    edge.start, edge.relationship, edge.end, e
                )?,
            }
        }
        let verb = if add { "added" } else { "deleted" };
        writeln!(self.out, "{} edge(s) {}.", changed, verb)?;
        Ok(())
    }

    fn change_hyper_edges(&mut self, graph: &mut GraphStorage, add: bool) -> Result<()> {
        let prompt = if add {
            "Enter hyper edge(s) in format (node_1,node_2,...,node_n) separated by semi-colon: "
        } else {
            "Enter hyper edge(s) to delete in format (node_1,node_2,...,node_n) separated by semi-colon: "
        };
        let Some(line) = self.read_line(prompt)? else {
            return Ok(());
        };
        let members = parse_hyper_edges(&line)?;
        let Some(label) = self.read_line("Relationship label: ")? else {
            return Ok(());
        };
        if label.is_empty() {
            anyhow::bail!("a hyper edge needs a relationship label");
        }

        let mut changed = 0;
        for names in members {
            let done = if add {
                graph.add_hyper_edge(names, &label)
            } else {
                graph.delete_hyper_edge(names, &label)
            };
            if done {
                changed += 1;
            }
        }
        let verb = if add { "added" } else { "deleted" };
        writeln!(self.out, "{} hyper edge(s) {}.", changed, verb)?;
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn read_path(&mut self, prompt: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .read_line(prompt)?
            .filter(|p| !p.is_empty())
            .map(PathBuf::from))
    }

    /// Prompt until a number is entered; `None` at end of input
    fn read_number(&mut self) -> Result<Option<u32>> {
        loop {
            let Some(line) = self.read_line("Enter a number: ")? else {
                return Ok(None);
            };
            match line.parse() {
                Ok(n) => return Ok(Some(n)),
                Err(_) => writeln!(self.out, "Please enter a correct number!")?,
            }
        }
    }
}

/// Counts of everything in the mirror
pub fn summary_table(graph: &GraphStorage) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Backend", "Nodes", "Edges", "Hyper edges"]);
    table.add_row(vec![
        graph.database().backend().to_string(),
        graph.node_count().to_string(),
        graph.edge_count().to_string(),
        graph.hyper_edge_count().to_string(),
    ]);
    table
}

pub fn capabilities_table(caps: &Capabilities) -> Table {
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Capability", "Supported"]);
    table.add_row(vec!["Node labels", yes_no(caps.node_labels)]);
    table.add_row(vec!["Node properties", yes_no(caps.node_properties)]);
    table.add_row(vec!["Relationship types", yes_no(caps.relationship_types)]);
    table.add_row(vec!["Relationship properties", yes_no(caps.relationship_properties)]);
    table.add_row(vec!["Detach delete", yes_no(caps.detach_delete)]);
    table.add_row(vec!["Bulk copy import", yes_no(caps.bulk_copy)]);
    table
}

//! Line-oriented operator console.
//!
//! Each input line is one command. Commands run against the shared
//! controller while the session's periodic tasks keep ticking, so status
//! output reflects repairs that happened between commands.

use nexus_meta::{
    ClusterController, ClusterSnapshot, EventLog, LogEntry, MetaError, NodeId, ReplicationHealth,
    SharedController,
};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::MgmtConfig;

const HELP: &str = "\
commands:
  upload <name> <bytes>    start streaming a file into the cluster
  toggle <node-id>         flip a node between ACTIVE and DEAD
  add-node                 register a new DataNode
  delete <file-id|name>    remove a file and reclaim its blocks
  status                   show nodes, files and replication health
  logs                     show the retained event log
  quit                     stop the session";

/// Errors reported back to the operator. None of them end the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    /// Blank input line.
    #[error("empty command")]
    Empty,

    /// Verb not recognised.
    #[error("unknown command: {0} (try `help`)")]
    UnknownCommand(String),

    /// Known verb, wrong arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Byte count did not parse.
    #[error("invalid byte count: {0}")]
    InvalidSize(String),

    /// Node id did not parse.
    #[error("invalid node id: {0}")]
    InvalidNodeId(String),

    /// The controller rejected the command.
    #[error(transparent)]
    Cluster(#[from] MetaError),
}

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Start an upload.
    Upload {
        /// File name.
        name: String,
        /// Declared size.
        size_bytes: u64,
    },
    /// Flip a node's status.
    Toggle(NodeId),
    /// Register a node.
    AddNode,
    /// Delete a file by id or name.
    Delete(String),
    /// Print the cluster state.
    Status,
    /// Print the event log.
    Logs,
    /// Print the command list.
    Help,
    /// End the console loop.
    Quit,
}

impl ConsoleCommand {
    /// Parses one input line.
    pub fn parse(line: &str) -> Result<Self, ConsoleError> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err(ConsoleError::Empty);
        };
        let args: Vec<&str> = parts.collect();

        match (verb.to_lowercase().as_str(), args.as_slice()) {
            ("upload", [name, size]) => {
                let size_bytes = size
                    .parse()
                    .map_err(|_| ConsoleError::InvalidSize(size.to_string()))?;
                Ok(ConsoleCommand::Upload {
                    name: name.to_string(),
                    size_bytes,
                })
            }
            ("upload", _) => Err(ConsoleError::Usage("upload <name> <bytes>")),
            ("toggle", [id]) => NodeId::parse(id)
                .map(ConsoleCommand::Toggle)
                .ok_or_else(|| ConsoleError::InvalidNodeId(id.to_string())),
            ("toggle", _) => Err(ConsoleError::Usage("toggle <node-id>")),
            ("delete", [key]) => Ok(ConsoleCommand::Delete(key.to_string())),
            ("delete", _) => Err(ConsoleError::Usage("delete <file-id|name>")),
            ("add-node", _) => Ok(ConsoleCommand::AddNode),
            ("status", _) => Ok(ConsoleCommand::Status),
            ("logs", _) => Ok(ConsoleCommand::Logs),
            ("help", _) => Ok(ConsoleCommand::Help),
            ("quit" | "exit", _) => Ok(ConsoleCommand::Quit),
            (other, _) => Err(ConsoleError::UnknownCommand(other.to_string())),
        }
    }
}

/// Runs one command and returns the text to show the operator.
pub fn execute(
    controller: &mut ClusterController,
    command: ConsoleCommand,
) -> Result<String, ConsoleError> {
    match command {
        ConsoleCommand::Upload { name, size_bytes } => {
            controller.submit_upload(&name, size_bytes)?;
            Ok(format!("upload of \"{}\" started", name))
        }
        ConsoleCommand::Toggle(node_id) => {
            let status = controller
                .toggle_node(node_id)
                .ok_or(MetaError::NodeNotFound(node_id))?;
            Ok(format!("{} is now {}", node_id, status))
        }
        ConsoleCommand::AddNode => {
            let node = controller.register_node();
            Ok(format!("registered {} ({})", node.name, node.id))
        }
        ConsoleCommand::Delete(key) => {
            let file_id = controller.resolve_file(&key)?;
            let record = controller
                .delete_file(file_id)
                .ok_or(MetaError::FileNotFound(key))?;
            Ok(format!("deleted \"{}\" ({})", record.name, record.id))
        }
        ConsoleCommand::Status => Ok(render_status(
            &controller.snapshot(),
            &controller.replication_health(),
        )),
        ConsoleCommand::Logs => Ok(controller
            .event_log()
            .entries()
            .map(render_entry)
            .collect::<Vec<_>>()
            .join("\n")),
        ConsoleCommand::Help => Ok(HELP.to_string()),
        ConsoleCommand::Quit => Ok(String::new()),
    }
}

/// Formats a snapshot as the `status` table.
pub fn render_status(snapshot: &ClusterSnapshot, health: &ReplicationHealth) -> String {
    let mut lines = vec![format!(
        "nodes: {} ({} active)",
        snapshot.nodes.len(),
        snapshot.active_nodes
    )];
    for node in &snapshot.nodes {
        lines.push(format!(
            "  {:<6} {:<8} {:<6} {} blocks",
            node.id.to_string(),
            node.name,
            node.status.to_string(),
            node.held_blocks().len()
        ));
    }

    lines.push(format!("files: {}", snapshot.files.len()));
    for file in &snapshot.files {
        lines.push(format!(
            "  {}  {}  {} blocks  rf {}",
            file.id,
            file.name,
            file.blocks.len(),
            file.replication_factor
        ));
    }

    lines.push(format!(
        "replication: {} healthy, {} under-replicated, {} lost",
        health.healthy, health.under_replicated, health.lost
    ));
    if let Some(upload) = &snapshot.upload {
        lines.push(format!("upload: {} {}%", upload.file_name, upload.percent));
    }
    lines.join("\n")
}

/// Formats one event log line.
pub fn render_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] {:<7} {}",
        entry.timestamp,
        format!("{:?}", entry.severity).to_uppercase(),
        entry.message
    )
}

fn unseen_entries(log: &EventLog, last_seen: &mut Option<u64>) -> Vec<String> {
    let fresh: Vec<String> = log
        .entries()
        .filter(|e| last_seen.map_or(true, |seen| e.id > seen))
        .map(render_entry)
        .collect();
    if let Some(latest) = log.latest() {
        *last_seen = Some(latest.id);
    }
    fresh
}

/// Reads commands from `reader` until `quit` or end of input.
pub async fn run_console<R, W>(
    controller: SharedController,
    config: &MgmtConfig,
    reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut last_seen = controller.lock().await.event_log().latest().map(|e| e.id);

    loop {
        if !config.prompt.is_empty() {
            writer.write_all(config.prompt.as_bytes()).await?;
            writer.flush().await?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(ConsoleError::Empty) => continue,
            Err(e) => {
                writer.write_all(format!("error: {}\n", e).as_bytes()).await?;
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }

        tracing::debug!(?command, "console command");
        let (result, events) = {
            let mut guard = controller.lock().await;
            let result = execute(&mut guard, command);
            let events = if config.echo_events {
                unseen_entries(guard.event_log(), &mut last_seen)
            } else {
                Vec::new()
            };
            (result, events)
        };

        let mut out = String::new();
        for event in events {
            out.push_str(&event);
            out.push('\n');
        }
        match result {
            Ok(text) if !text.is_empty() => {
                out.push_str(&text);
                out.push('\n');
            }
            Ok(_) => {}
            Err(e) => out.push_str(&format!("error: {}\n", e)),
        }
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
    }

    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_meta::{shared, ClusterConfig, NodeStatus, OrderedPlacement};

    fn cluster(nodes: usize) -> ClusterController {
        let config = ClusterConfig {
            initial_nodes: nodes,
            ..ClusterConfig::default()
        };
        let mut controller = ClusterController::new(config)
            .unwrap()
            .with_placement(Box::new(OrderedPlacement));
        controller.bootstrap();
        controller
    }

    fn quiet_config() -> MgmtConfig {
        MgmtConfig {
            echo_events: false,
            prompt: String::new(),
            ..MgmtConfig::default()
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ConsoleCommand::parse("upload a.txt 1024"),
            Ok(ConsoleCommand::Upload {
                name: "a.txt".into(),
                size_bytes: 1024
            })
        );
        assert_eq!(
            ConsoleCommand::parse("  toggle dn-03 "),
            Ok(ConsoleCommand::Toggle(NodeId::new(3)))
        );
        assert_eq!(
            ConsoleCommand::parse("TOGGLE 4"),
            Ok(ConsoleCommand::Toggle(NodeId::new(4)))
        );
        assert_eq!(
            ConsoleCommand::parse("delete a.txt"),
            Ok(ConsoleCommand::Delete("a.txt".into()))
        );
        assert_eq!(ConsoleCommand::parse("add-node"), Ok(ConsoleCommand::AddNode));
        assert_eq!(ConsoleCommand::parse("exit"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ConsoleCommand::parse("   "), Err(ConsoleError::Empty));
        assert_eq!(
            ConsoleCommand::parse("upload a.txt"),
            Err(ConsoleError::Usage("upload <name> <bytes>"))
        );
        assert_eq!(
            ConsoleCommand::parse("upload a.txt lots"),
            Err(ConsoleError::InvalidSize("lots".into()))
        );
        assert_eq!(
            ConsoleCommand::parse("toggle node-x"),
            Err(ConsoleError::InvalidNodeId("node-x".into()))
        );
        assert_eq!(
            ConsoleCommand::parse("format c:"),
            Err(ConsoleError::UnknownCommand("format".into()))
        );
    }

    #[test]
    fn test_execute_maps_onto_controller() {
        let mut controller = cluster(6);

        let out = execute(&mut controller, ConsoleCommand::Toggle(NodeId::new(2))).unwrap();
        assert_eq!(out, "dn-02 is now DEAD");
        assert_eq!(
            controller.registry().get(NodeId::new(2)).map(|n| n.status),
            Some(NodeStatus::Dead)
        );

        let err = execute(&mut controller, ConsoleCommand::Toggle(NodeId::new(9))).unwrap_err();
        assert_eq!(err, ConsoleError::Cluster(MetaError::NodeNotFound(NodeId::new(9))));

        let out = execute(&mut controller, ConsoleCommand::AddNode).unwrap();
        assert_eq!(out, "registered Node-7 (dn-07)");
    }

    #[test]
    fn test_execute_delete_by_name() {
        let mut controller = cluster(6);
        controller.submit_upload("a.txt", 1).unwrap();
        controller.complete_upload_now().unwrap();

        let out = execute(&mut controller, ConsoleCommand::Delete("a.txt".into())).unwrap();
        assert!(out.starts_with("deleted \"a.txt\""));
        assert!(controller.catalog().is_empty());

        let err = execute(&mut controller, ConsoleCommand::Delete("a.txt".into())).unwrap_err();
        assert_eq!(
            err,
            ConsoleError::Cluster(MetaError::FileNotFound("a.txt".into()))
        );
    }

    #[test]
    fn test_execute_rejected_upload() {
        let mut controller = cluster(2);
        let err = execute(
            &mut controller,
            ConsoleCommand::Upload {
                name: "a.txt".into(),
                size_bytes: 1,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConsoleError::Cluster(MetaError::InsufficientCapacity { .. })
        ));
    }

    #[test]
    fn test_status_rendering() {
        let mut controller = cluster(3);
        controller.submit_upload("a.txt", 1).unwrap();
        controller.complete_upload_now().unwrap();
        controller.toggle_node(NodeId::new(1));

        let text = render_status(&controller.snapshot(), &controller.replication_health());
        assert!(text.starts_with("nodes: 3 (2 active)"));
        assert!(text.contains("dn-01  Node-1   DEAD   4 blocks"));
        assert!(text.contains("files: 1"));
        assert!(text.contains("replication: 0 healthy, 4 under-replicated, 0 lost"));
    }

    #[tokio::test]
    async fn test_console_script() {
        let controller = shared(cluster(6));
        let input: &[u8] = b"add-node\ntoggle dn-02\n\nbogus\nupload a.txt 1024\nquit\nadd-node\n";
        let mut output = Vec::new();

        run_console(controller.clone(), &quiet_config(), input, &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("registered Node-7 (dn-07)\n"));
        assert!(text.contains("dn-02 is now DEAD\n"));
        assert!(text.contains("error: unknown command: bogus"));
        assert!(text.contains("upload of \"a.txt\" started\n"));

        let guard = controller.lock().await;
        assert_eq!(guard.registry().len(), 7);
        assert!(guard.upload_progress().is_some());
    }

    #[tokio::test]
    async fn test_console_echoes_new_events() {
        let controller = shared(cluster(6));
        let config = MgmtConfig {
            prompt: String::new(),
            ..MgmtConfig::default()
        };
        let input: &[u8] = b"toggle 1\nstatus\n";
        let mut output = Vec::new();

        run_console(controller, &config, input, &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        let echoed = text
            .lines()
            .filter(|l| l.contains("Heartbeat Monitor: Node Node-1 status changed to DEAD"))
            .count();
        assert_eq!(echoed, 1);
        assert!(text.contains("ERROR"));
    }
}

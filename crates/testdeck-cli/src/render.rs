//! Terminal rendering of trees and log entries.

use colored::Colorize;
use testdeck_core::artifact::{ArtifactNode, NodeKind, TreeRow};
use testdeck_core::session::{EntryRole, SessionEntry, SessionStatus};

const INDENT: &str = "  ";

fn folder_marker(expanded: bool) -> &'static str {
    if expanded { "▾" } else { "▸" }
}

pub fn tree_row(row: &TreeRow) -> String {
    let marker = if row.is_folder {
        folder_marker(row.expanded)
    } else {
        " "
    };
    let label = format!("{}{} {}", INDENT.repeat(row.depth), marker, row.name);
    let id = format!("[{}]", row.id).bright_black();
    let line = if row.is_folder {
        format!("{} {}", label.bold(), id)
    } else {
        format!("{} {}", label, id)
    };
    if row.selected {
        format!("{} {}", line, "◀ selected".bright_yellow())
    } else {
        line
    }
}

pub fn print_rows(rows: &[TreeRow]) {
    if rows.is_empty() {
        println!("{}", "(empty project)".bright_black());
    }
    for row in rows {
        println!("{}", tree_row(row));
    }
}

/// Prints every node regardless of expansion.
pub fn print_nodes(nodes: &[ArtifactNode], depth: usize) {
    for node in nodes {
        let id = format!("[{}]", node.id).bright_black();
        match &node.kind {
            NodeKind::Folder { children, expanded } => {
                let label = format!("{}{} {}", INDENT.repeat(depth), folder_marker(*expanded), node.name);
                println!("{} {}", label.bold(), id);
                print_nodes(children, depth + 1);
            }
            NodeKind::File => {
                println!("{}  {} {}", INDENT.repeat(depth), node.name, id);
            }
        }
    }
}

fn clock(created_at: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(created_at)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

pub fn entry(entry: &SessionEntry) -> String {
    let header = format!("{} {}", entry.id, clock(&entry.created_at)).bright_black();
    match entry.role {
        EntryRole::User => format!("{} {} {}", header, "you ›".green().bold(), entry.content.green()),
        EntryRole::Engine => {
            let body = entry
                .content
                .lines()
                .collect::<Vec<_>>()
                .join("\n       ");
            format!("{} {} {}", header, "engine ›".bright_blue().bold(), body.bright_blue())
        }
    }
}

pub fn print_entries<'a>(entries: impl IntoIterator<Item = &'a SessionEntry>) {
    for e in entries {
        println!("{}", entry(e));
    }
}

pub fn status(status: SessionStatus) -> String {
    match status {
        SessionStatus::Idle => "idle".green().to_string(),
        SessionStatus::AwaitingResponse => "awaiting response".yellow().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testdeck_core::artifact::NodeId;
    use testdeck_core::session::EntryId;

    #[test]
    fn test_row_shows_id_and_selection() {
        colored::control::set_override(false);
        let row = TreeRow {
            id: NodeId::from("3"),
            name: "login.test.js".to_string(),
            depth: 2,
            is_folder: false,
            expanded: false,
            selected: true,
        };
        // Two levels of indent, then a blank marker column so files line up
        // with folder names.
        assert_eq!(tree_row(&row), "      login.test.js [3] ◀ selected");
    }

    #[test]
    fn test_entry_has_role_and_content() {
        colored::control::set_override(false);
        let line = entry(&SessionEntry::engine(EntryId::new(2), "done"));
        assert!(line.starts_with("#2 "));
        assert!(line.ends_with("engine › done"));
    }
}

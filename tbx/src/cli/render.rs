use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use serde::Serialize;
use tbx_common::error::Result;
use tbx_common::model::{ArtifactResult, DependencyNode};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn node_label(node: &DependencyNode) -> String {
    let mut label = node.coordinate().to_string();
    if !node.scope().is_empty() {
        label = format!("{} [{}]", label, node.scope());
    }
    if node.dependency.optional {
        label.push_str(" (optional)");
    }
    match &node.omitted_for {
        Some(reason) => format!("{}", format!("{label} - omitted: {reason}").dimmed()),
        None => label,
    }
}

fn print_children(node: &DependencyNode, prefix: &str) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        println!("{}{}{}", prefix, branch, node_label(child));
        let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
        print_children(child, &next);
    }
}

pub fn print_tree(root: &DependencyNode) {
    println!("{}", root.coordinate().to_string().bold());
    print_children(root, "");
}

pub fn print_artifacts(results: &[ArtifactResult]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.add_row(Row::new(vec![
        Cell::new("Artifact").style_spec("b"),
        Cell::new("From").style_spec("b"),
        Cell::new("File").style_spec("b"),
    ]));
    for result in results {
        let file = result
            .file
            .as_ref()
            .map(|f| f.display().to_string())
            .unwrap_or_else(|| result.exceptions.join("; "));
        let file_cell = if result.is_resolved() {
            Cell::new(&file)
        } else {
            Cell::new(&file).style_spec("Fr")
        };
        table.add_row(Row::new(vec![
            Cell::new(&result.coordinate.to_string()).style_spec("Fb"),
            Cell::new(result.repository.as_deref().unwrap_or("local")),
            file_cell,
        ]));
    }
    table.printstd();
}

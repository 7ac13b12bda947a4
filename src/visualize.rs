use std::fmt::Write as FmtWrite;
use std::io::{self, Write};

use tracing::*;

use crate::{BondOrder, Element, MatchingSolution, MolecularGraph};

/// Writes the DOT rendering of a solution to `output_dot`, and renders it to
/// a PNG with Graphviz when `output_image` is given.
pub fn visualize_solution(
    solution: &MatchingSolution,
    output_dot: &str,
    output_image: Option<&str>,
) -> io::Result<()> {
    let dot_string = solution_to_dot(solution);

    let mut file = std::fs::File::create(output_dot)?;
    file.write_all(dot_string.as_bytes())?;
    info!("DOT file saved to {}", output_dot);

    if let Some(image_path) = output_image {
        // Needs Graphviz `dot` on the PATH.
        let status = std::process::Command::new("dot")
            .args(["-Tpng", output_dot, "-o", image_path])
            .status()?;
        if !status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("Graphviz 'dot' command failed with status: {}", status),
            ));
        }
        info!("Image rendered to {}", image_path);
    }
    Ok(())
}

/// Renders both graphs of a solution side by side. Mapped atoms are filled,
/// and dotted edges join each query atom to its partner.
pub fn solution_to_dot(solution: &MatchingSolution) -> String {
    let mut dot = String::new();
    let _ = writeln!(dot, "graph Mapping {{");
    let _ = writeln!(dot, "    rankdir=LR;");
    let _ = writeln!(
        dot,
        "    label=\"{} / {} ({}, {} atoms)\";",
        escape(solution.query.label()),
        escape(solution.target.label()),
        solution.origin,
        solution.mapped_atoms()
    );

    let query_mapped = |index: usize| solution.mapping.target_of(index).is_some();
    let target_mapped = |index: usize| solution.mapping.query_of(index).is_some();
    write_cluster(&mut dot, "q", &solution.query, &query_mapped);
    write_cluster(&mut dot, "t", &solution.target, &target_mapped);

    for (query, target) in solution.mapping.pairs() {
        let _ = writeln!(
            dot,
            "    q{} -- t{} [style=dotted, color=gray, constraint=false];",
            query, target
        );
    }
    let _ = writeln!(dot, "}}");
    dot
}

fn write_cluster(
    dot: &mut String,
    prefix: &str,
    graph: &MolecularGraph,
    mapped: &dyn Fn(usize) -> bool,
) {
    let _ = writeln!(dot, "    subgraph cluster_{} {{", prefix);
    let _ = writeln!(dot, "        label=\"{}\";", escape(graph.label()));
    for (index, atom) in graph.atoms().enumerate() {
        let color = element_to_color(atom.element);
        let style = if mapped(index) {
            format!("style=filled, fillcolor={color}, fontcolor=white")
        } else {
            format!("color={color}")
        };
        let _ = writeln!(
            dot,
            "        {}{} [label=\"{}\", shape=circle, {}];",
            prefix,
            index,
            atom.symbol(),
            style
        );
    }
    for (a, b, order) in graph.bonds() {
        let _ = writeln!(
            dot,
            "        {}{} -- {}{} [{}];",
            prefix,
            a,
            prefix,
            b,
            bond_to_style(order)
        );
    }
    let _ = writeln!(dot, "    }}");
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Assigns colors to elements for visualization.
fn element_to_color(element: Element) -> &'static str {
    match element {
        Element::C => "black",
        Element::H => "gray",
        Element::O => "red",
        Element::N => "blue",
        Element::S => "goldenrod",
        Element::P => "orange",
        Element::F => "pink",
        Element::Cl => "darkgreen",
        Element::Br => "brown",
        Element::I => "purple",
        _ => "slategray",
    }
}

fn bond_to_style(order: BondOrder) -> &'static str {
    match order {
        BondOrder::Single => "penwidth=2",
        BondOrder::Double => "penwidth=2, color=\"black:invis:black\"",
        BondOrder::Triple => "penwidth=2, color=\"black:invis:black:invis:black\"",
        BondOrder::Aromatic => "penwidth=2, style=dashed, color=purple",
    }
}

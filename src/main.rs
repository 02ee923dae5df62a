#![forbid(unsafe_code)]

use std::process::exit;

use safe_saphyr::budget::BudgetReport;
use safe_saphyr::{Allowlist, ClassDescriptor, Options, load_all_with_options};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: safe-saphyr FILE [--allow-tag TAG]... [--allow-class NAME]... [--allow-set NAME]...
Loads FILE with the Ruby-compatible tag allowlist plus the given extras and
prints each resolved document. Set RUST_LOG=debug to see audit events.";

fn report_budget(report: &BudgetReport) {
    eprintln!(
        "budget: {} events, {} nodes, {} aliases, {} anchors, depth {}",
        report.events, report.nodes, report.aliases, report.anchors, report.max_depth
    );
}

/// Load a YAML file through the allowlist and print what it resolves to.
/// Exit codes: 1 usage, 2 unreadable file, 3 rejected document.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let mut path = None;
    let mut allowlist = Allowlist::ruby_compat();
    let mut classes = Vec::new();

    while let Some(arg) = args.next() {
        if path.is_none() && !arg.starts_with("--") {
            path = Some(arg);
            continue;
        }
        let value = match arg.as_str() {
            "--allow-tag" | "--allow-class" | "--allow-set" => args.next(),
            _ => None,
        };
        match (arg.as_str(), value) {
            ("--allow-tag", Some(tag)) => {
                allowlist.register_tags([tag]);
            }
            ("--allow-class", Some(name)) => classes.push(ClassDescriptor::record(name)),
            ("--allow-set", Some(name)) => classes.push(ClassDescriptor::set(name)),
            _ => {
                eprintln!("{USAGE}");
                exit(1);
            }
        }
    }

    let Some(path) = path else {
        eprintln!("{USAGE}");
        exit(1);
    };
    if let Err(err) = allowlist.register_classes(classes) {
        eprintln!("{err}");
        exit(1);
    }

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Failed to read {path}: {err}");
            exit(2);
        }
    };

    let options = Options {
        budget_report: Some(report_budget),
        ..Options::default()
    };

    match load_all_with_options(&content, &allowlist, options) {
        Ok(documents) => {
            for document in documents {
                println!("---\n{document:#?}");
            }
        }
        Err(err) => {
            eprintln!("{path} rejected:\n{err}");
            exit(3);
        }
    }
}

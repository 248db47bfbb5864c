use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use matpath_core::{attrs, Cascade, MaterializedPathTree, MemoryStore, Node, OrderBy};

#[derive(serde::Serialize)]
struct Output {
    implementation: &'static str,
    storage: &'static str,
    workload: String,
    timestamp: String,
    name: String,
    total_ops: u64,
    duration_ms: f64,
    ops_per_sec: f64,
    extra: Extra,
    source_file: Option<String>,
}

#[derive(serde::Serialize)]
struct Extra {
    count: u64,
    fanout: u64,
    rewritten: u64,
}

fn main() -> matpath_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut count: u64 = 200;
    let mut fanout: u64 = 4;
    let mut out_file: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--count=") {
            count = val.parse().unwrap_or(count);
        } else if let Some(val) = arg.strip_prefix("--fanout=") {
            fanout = val.parse().unwrap_or(fanout).max(1);
        } else if let Some(val) = arg.strip_prefix("--out=") {
            out_file = Some(PathBuf::from(val));
        }
    }

    let mut tree = MaterializedPathTree::new(MemoryStore::default());

    let start = Instant::now();
    let mut top = tree.create_root(attrs([("name", "top")]))?;
    let mut nodes = vec![top.clone()];
    for i in 0..count {
        let mut parent = nodes[(i / fanout) as usize].clone();
        let mut node = Node::new(attrs([("name", format!("n{i}"))]));
        tree.move_to_child_of(&mut node, &mut parent, Cascade::Include)?;
        nodes.push(node);
    }
    let mut target = tree.create_root(attrs([("name", "target")]))?;
    let report = tree.move_to_child_of(&mut top, &mut target, Cascade::Include)?;
    let virtual_tree = tree.build_tree(&target)?;
    let _ = tree.descendants(&target, &OrderBy::default())?;
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(nodes = virtual_tree.len(), "built virtual tree");

    let total_ops = count + 3;
    let output = Output {
        implementation: "core-memory",
        storage: "memory",
        workload: format!("insert-move-build-{}", count),
        timestamp: chrono::Utc::now().to_rfc3339(),
        name: format!("insert-move-build-{}", count),
        total_ops,
        duration_ms,
        ops_per_sec: if duration_ms > 0.0 {
            total_ops as f64 / duration_ms * 1000.0
        } else {
            f64::INFINITY
        },
        extra: Extra {
            count,
            fanout,
            rewritten: report.rewritten_descendants,
        },
        source_file: out_file.as_ref().map(|p| p.display().to_string()),
    };

    let json = serde_json::to_string_pretty(&output).expect("serialize");
    if let Some(path) = out_file {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdirs");
        }
        fs::write(&path, &json).expect("write output");
    }
    println!("{}", json);
    Ok(())
}

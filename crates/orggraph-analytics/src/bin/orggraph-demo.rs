use anyhow::Result;
use clap::Parser;
use orggraph_analytics::AnalyticsEngine;
use orggraph_cache::ResultCache;
use orggraph_core::{AnalyticsConfig, EdgeRef, NodeRef};
use orggraph_graph::MemoryGraph;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Run the bounded analytics engine against a seeded demo org graph.
#[derive(Parser)]
#[command(name = "orggraph-demo")]
struct Args {
    /// Number of teams in the generated graph
    #[arg(long, default_value_t = 3)]
    teams: usize,

    /// People per team
    #[arg(long, default_value_t = 6)]
    team_size: usize,

    /// Sampling seed for reproducible runs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Centrality algorithm: degree, closeness, betweenness or pagerank
    #[arg(long, default_value = "degree")]
    centrality: String,

    /// Community algorithm: connected_components, label_propagation or
    /// modularity_clustering
    #[arg(long, default_value = "label_propagation")]
    community: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let graph = build_demo_graph(args.teams, args.team_size)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "demo graph ready"
    );

    let config = AnalyticsConfig::from_env()?;
    let cache = Arc::new(ResultCache::new(
        config.cache_max_entries,
        Duration::from_secs(config.cache_ttl_seconds),
    ));
    let engine = AnalyticsEngine::with_sampling_seed(Arc::new(graph), cache, config, args.seed);

    let centrality = engine
        .centrality(&args.centrality, Some("Person".into()), Some(10))
        .await?;
    println!("{}", serde_json::to_string_pretty(&centrality)?);

    let community = engine
        .community(&args.community, None, Some(2), Some(10))
        .await?;
    println!("{}", serde_json::to_string_pretty(&community)?);

    let stats = engine.statistics(None, None, Some(100)).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    // Repeat one call so the printed cache stats show a hit.
    let _ = engine.statistics(None, None, Some(100)).await?;
    println!("{}", serde_json::to_string_pretty(&engine.cache_stats())?);

    Ok(())
}

/// Teams with a manager each, members reporting to the manager, managers
/// collaborating in a ring and working on one shared project.
fn build_demo_graph(teams: usize, team_size: usize) -> Result<MemoryGraph> {
    let graph = MemoryGraph::new();
    graph.add_node(
        NodeRef::new("proj-atlas", vec!["Project".into()]).with_property("name", "Atlas"),
    );

    for t in 0..teams {
        let team_id = format!("team-{t}");
        graph.add_node(
            NodeRef::new(team_id.clone(), vec!["Team".into()])
                .with_property("name", format!("Team {t}")),
        );

        let manager_id = format!("person-{t}-0");
        for p in 0..team_size {
            let person_id = format!("person-{t}-{p}");
            graph.add_node(
                NodeRef::new(person_id.clone(), vec!["Person".into()])
                    .with_property("name", format!("Person {t}-{p}")),
            );
            graph.add_edge(EdgeRef::new(
                format!("member-{t}-{p}"),
                "MEMBER_OF",
                person_id.clone(),
                team_id.clone(),
            ))?;
            if p > 0 {
                graph.add_edge(EdgeRef::new(
                    format!("reports-{t}-{p}"),
                    "REPORTS_TO",
                    person_id,
                    manager_id.clone(),
                ))?;
            }
        }
        if team_size > 0 {
            graph.add_edge(EdgeRef::new(
                format!("works-{t}"),
                "WORKS_ON",
                manager_id,
                "proj-atlas",
            ))?;
        }
    }

    for t in 0..teams {
        let next = (t + 1) % teams;
        if t != next && team_size > 0 {
            graph.add_edge(EdgeRef::new(
                format!("collab-{t}"),
                "COLLABORATES_WITH",
                format!("person-{t}-0"),
                format!("person-{next}-0"),
            ))?;
        }
    }

    Ok(graph)
}

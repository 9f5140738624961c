//! CLI front-ends for search, autocomplete, popularity and history.

use anyhow::Result;

use federated_search_core::models::SearchResult;

use crate::config::Config;
use crate::engine::SearchEngine;

pub async fn run_search(config: &Config, query: &str, user_id: &str, json: bool) -> Result<()> {
    let engine = SearchEngine::from_config(config).await?;
    let results = engine.perform_search(query, user_id).await?;
    engine.wait_for_history().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, result) in results.iter().enumerate() {
        print_result(i + 1, result);
    }
    Ok(())
}

fn print_result(rank: usize, result: &SearchResult) {
    let title = if result.title.is_empty() {
        "(untitled)"
    } else {
        result.title.as_str()
    };
    println!("{}. [{:.0}] {} / {}", rank, result.score, result.source_type, title);
    if let Some(created) = result.created_at {
        println!("    created: {}", created.format("%Y-%m-%d"));
    }
    if !result.description.is_empty() {
        println!("    \"{}\"", result.description.replace('\n', " ").trim());
    }
    println!("    link: {}", result.link);
    println!();
}

pub async fn run_suggest(config: &Config, prefix: &str, limit: usize) -> Result<()> {
    let engine = SearchEngine::from_config(config).await?;
    let suggestions = engine.get_suggestions(prefix, limit).await?;
    if suggestions.is_empty() {
        println!("No suggestions.");
    }
    for s in suggestions {
        println!("{}", s);
    }
    Ok(())
}

pub async fn run_popular(config: &Config, limit: usize) -> Result<()> {
    let engine = SearchEngine::from_config(config).await?;
    let popular = engine.get_popular_searches(limit).await?;
    if popular.is_empty() {
        println!("No searches in the last 7 days.");
        return Ok(());
    }
    println!("{:>6}  QUERY", "COUNT");
    for p in popular {
        println!("{:>6}  {}", p.count, p.query);
    }
    Ok(())
}

pub async fn run_history(config: &Config, user_id: &str, limit: usize) -> Result<()> {
    let engine = SearchEngine::from_config(config).await?;
    let entries = engine.recent_searches(user_id, limit).await?;
    if entries.is_empty() {
        println!("No history for {}.", user_id);
        return Ok(());
    }
    for e in entries {
        println!("{}  {}", e.timestamp.format("%Y-%m-%d %H:%M:%S"), e.query);
    }
    Ok(())
}

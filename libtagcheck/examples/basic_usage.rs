//! Basic usage example for the tagcheck library.
//!
//! Checks a tag and lists the tags of a repository on a local registry.
//!
//! Run with: cargo run --example basic_usage -- localhost:5000/alpine:3.19

use libtagcheck::{Resolution, TagCheck};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let image = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "localhost:5000/alpine:3.19".to_string());

    let checker = TagCheck::new();

    println!("Checking {}...", image);
    match checker.check(&image).await? {
        Resolution::Found {
            endpoint, value, ..
        } => println!("✓ {} found on {}", value, endpoint),
        Resolution::Absent { endpoint, .. } => println!("✗ not found on {}", endpoint),
        Resolution::Exhausted { failures } => {
            eprintln!("✗ no endpoint answered");
            eprintln!("  Make sure a registry is running, e.g.:");
            eprintln!("  docker run -d -p 5000:5000 registry:2");
            for attempt in failures {
                eprintln!("  - {}: {}", attempt.endpoint, attempt.error);
            }
            return Ok(());
        }
    }

    println!("\nListing tags...");
    if let Some(tags) = checker.list(&image).await?.found() {
        println!("✓ Found {} tags:", tags.len());
        for tag in tags.iter().take(10) {
            println!("  - {}", tag);
        }
        if tags.len() > 10 {
            println!("  ... and {} more", tags.len() - 10);
        }
    }

    Ok(())
}

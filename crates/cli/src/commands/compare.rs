use std::time::Instant;

use navload_orm::{LoadStrategy, RelationshipPath, RootQuery};
use serde::Serialize;

use crate::render::{self, Output};
use crate::App;

#[derive(Debug, Serialize)]
struct Measurement {
    strategy: LoadStrategy,
    blogs: usize,
    posts: usize,
    round_trips: usize,
    elapsed_ms: f64,
}

/// Load every blog's posts under each strategy and report the cost
pub async fn run(app: &App) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for strategy in [
        LoadStrategy::Lazy,
        LoadStrategy::Eager,
        LoadStrategy::Explicit,
        LoadStrategy::Batch,
    ] {
        rows.push(measure(app, strategy).await?);
    }

    match app.output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        Output::Text => {
            render::heading("Loading Posts for every blog");
            println!("  {:<10} {:>6} {:>6} {:>12} {:>10}", "strategy", "blogs", "posts", "round trips", "ms");
            for row in &rows {
                println!(
                    "  {:<10} {:>6} {:>6} {:>12} {:>10.2}",
                    row.strategy.to_string(),
                    row.blogs,
                    row.posts,
                    row.round_trips,
                    row.elapsed_ms
                );
            }
            render::note("Lazy and per-blog explicit loading grow with the blog count; eager and batch stay at 2.");
        }
    }
    Ok(())
}

async fn measure(app: &App, strategy: LoadStrategy) -> anyhow::Result<Measurement> {
    let posts_path = RelationshipPath::new("Posts");
    let upfront = match strategy {
        LoadStrategy::Eager | LoadStrategy::Batch => vec![posts_path.clone()],
        LoadStrategy::Lazy | LoadStrategy::Explicit => Vec::new(),
    };

    let started = Instant::now();
    let outcome = app.loader.load(RootQuery::all("Blog"), strategy, &upfront).await?;
    let (mut blogs, session) = outcome.into_parts();

    match strategy {
        LoadStrategy::Lazy => {
            for blog in blogs.iter_mut() {
                session.related(blog, "Posts").await?;
            }
        }
        LoadStrategy::Explicit => {
            for blog in blogs.iter_mut() {
                session.load_entry(blog, &posts_path).await?;
            }
        }
        LoadStrategy::Eager | LoadStrategy::Batch => {}
    }

    let posts = blogs.iter().filter_map(|b| b.loaded("Posts")).map(<[_]>::len).sum();
    Ok(Measurement {
        strategy,
        blogs: blogs.len(),
        posts,
        round_trips: session.round_trips(),
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
    })
}

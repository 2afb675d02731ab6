use navload_orm::{Projection, RelationshipSummary, RootQuery, SortDirection};

use crate::render::{self, Output};
use crate::App;

/// Blog titles with post and tag counts and the most recent posts
pub async fn run(app: &App, top: usize) -> anyhow::Result<()> {
    let projection = Projection::new(&["Id", "Title"])
        .summarize(
            RelationshipSummary::new("Posts")
                .count_as("PostCount")
                .top(top, "RecentPosts")
                .order_by("PublishedDate", SortDirection::Descending)
                .fields(&["Title", "PublishedDate"]),
        )
        .summarize(RelationshipSummary::new("Tags").count_as("TagCount"));

    let outcome = app.loader.project(RootQuery::all("Blog"), &projection).await?;

    match app.output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&outcome.rows)?),
        Output::Text => {
            render::heading("Projection");
            for row in &outcome.rows {
                println!(
                    "  {} ({} posts, {} tags)",
                    row["Title"].as_str().unwrap_or_default(),
                    row["PostCount"],
                    row["TagCount"]
                );
                for post in row["RecentPosts"].as_array().into_iter().flatten() {
                    println!("    - {}", post["Title"].as_str().unwrap_or_default());
                }
            }
            render::print_trips(&outcome.session.log());
        }
    }
    Ok(())
}

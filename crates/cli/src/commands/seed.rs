use serde_json::json;

use crate::render::{self, Output};
use crate::App;

const ENTITIES: [&str; 4] = ["Blog", "Post", "Comment", "Tag"];

pub async fn run(app: &App) -> anyhow::Result<()> {
    let mut counts = Vec::with_capacity(ENTITIES.len());
    for entity in ENTITIES {
        counts.push((entity, app.store.count(entity).await?));
    }

    match app.output {
        Output::Json => {
            let counts: serde_json::Map<String, serde_json::Value> =
                counts.iter().map(|(entity, n)| (entity.to_string(), json!(n))).collect();
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        Output::Text => {
            render::heading("Seeded data");
            for (entity, n) in &counts {
                println!("  {:<8} {}", entity, n);
            }
            render::note("Seeding only runs against an empty store; rerunning it inserts nothing.");
        }
    }
    Ok(())
}

mod common;

use chrono::{Duration, Utc};
use navload_orm::models::{decode_all, Blog, Comment, Entity, Post, Tag};
use navload_orm::seed::seed_demo_data;
use navload_orm::{
    Filterable, LoadStrategy, Node, Projection, RelationshipPath, RelationshipSummary, RootQuery, RoundTripKind,
    SortDirection,
};

use common::{demo_store, generated_store, loader};

fn titles(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().filter_map(|n| n.record.str_of("Title")).collect()
}

fn recent_posts() -> RelationshipPath {
    let cutoff = (Utc::now() - Duration::days(15)).to_rfc3339();
    RelationshipPath::new("Posts").where_gt("PublishedDate", cutoff)
}

#[tokio::test]
async fn test_filtered_include_keeps_only_matching_posts() {
    let loader = loader(demo_store().await);

    let filtered = loader
        .load(RootQuery::all("Blog"), LoadStrategy::Eager, &[recent_posts()])
        .await
        .unwrap();
    let unfiltered = loader
        .load_str(RootQuery::all("Blog"), LoadStrategy::Eager, &["Posts"])
        .await
        .unwrap();

    assert_eq!(filtered.round_trips(), unfiltered.round_trips());
    let counts: Vec<usize> = filtered
        .roots
        .iter()
        .map(|b| b.loaded("Posts").unwrap().len())
        .collect();
    assert_eq!(counts, vec![2, 1, 1]);
    assert_eq!(titles(filtered.roots[1].loaded("Posts").unwrap()), vec!["Pasta Recipe"]);
    assert_eq!(titles(filtered.roots[2].loaded("Posts").unwrap()), vec!["Tokyo Adventure"]);

    let log = filtered.log();
    assert!(log[1].filter.as_deref().unwrap_or_default().starts_with("PublishedDate >"));
}

#[tokio::test]
async fn test_filtered_root_query() {
    let loader = loader(demo_store().await);
    let outcome = loader
        .load_str(
            RootQuery::all("Post").where_eq("BlogId", 2),
            LoadStrategy::Eager,
            &["Comments"],
        )
        .await
        .unwrap();

    assert_eq!(titles(&outcome.roots), vec!["Chocolate Cake Recipe", "Pasta Recipe"]);
    let authors: Vec<&str> = outcome
        .roots
        .iter()
        .flat_map(|p| p.loaded("Comments").unwrap())
        .filter_map(|c| c.record.str_of("Author"))
        .collect();
    assert_eq!(authors, vec!["Alice", "Charlie"]);
    assert_eq!(outcome.round_trips(), 2);
}

#[tokio::test]
async fn test_textual_path_filter() {
    let loader = loader(demo_store().await);
    let outcome = loader
        .load_str(
            RootQuery::all("Blog"),
            LoadStrategy::Eager,
            &["Posts.Comments[Author = 'Jane']"],
        )
        .await
        .unwrap();

    let comments = outcome.roots[0].descend("Posts.Comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].record.str_of("Author"), Some("Jane"));
    assert!(outcome.roots[1].descend("Posts.Comments").is_empty());
    assert_eq!(outcome.round_trips(), 3);
}

#[tokio::test]
async fn test_many_to_many_is_one_round_trip() {
    let loader = loader(demo_store().await);
    let outcome = loader
        .load_str(RootQuery::all("Blog"), LoadStrategy::Eager, &["Tags"])
        .await
        .unwrap();

    assert_eq!(outcome.round_trips(), 2);
    assert_eq!(outcome.log()[1].kind, RoundTripKind::ScanByJoin);

    let tags: Vec<Vec<String>> = outcome
        .roots
        .iter()
        .map(|b| {
            decode_all::<Tag>(b.loaded("Tags").unwrap())
                .unwrap()
                .into_iter()
                .map(|t| t.name)
                .collect()
        })
        .collect();
    assert_eq!(
        tags,
        vec![
            vec!["Programming".to_string(), "C#".to_string()],
            vec!["Food".to_string()],
            vec!["Travel".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_inverse_many_to_many() {
    let loader = loader(demo_store().await);
    let outcome = loader
        .load_str(RootQuery::by_key("Tag", 2), LoadStrategy::Eager, &["Blogs.Posts"])
        .await
        .unwrap();

    let blogs = outcome.roots[0].loaded("Blogs").unwrap();
    assert_eq!(titles(blogs), vec!["Tech Blog"]);
    assert_eq!(outcome.roots[0].descend("Blogs.Posts").len(), 2);
    assert_eq!(outcome.round_trips(), 3);
}

#[tokio::test]
async fn test_split_include_is_one_round_trip_per_path() {
    let loader = loader(demo_store().await);
    let outcome = loader
        .load_str(RootQuery::all("Blog"), LoadStrategy::Eager, &["Posts", "Tags"])
        .await
        .unwrap();

    let kinds: Vec<RoundTripKind> = outcome.log().iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RoundTripKind::ScanAll,
            RoundTripKind::ScanByForeignKey,
            RoundTripKind::ScanByJoin,
        ]
    );
    assert!(outcome.roots.iter().all(|b| b.is_loaded("Posts") && b.is_loaded("Tags")));
}

#[tokio::test]
async fn test_belongs_to_from_comments() {
    let loader = loader(demo_store().await);
    let outcome = loader
        .load_str(RootQuery::all("Comment"), LoadStrategy::Eager, &["Post.Blog"])
        .await
        .unwrap();

    assert_eq!(outcome.round_trips(), 3);
    let diana = outcome
        .roots
        .iter()
        .find(|c| c.record.str_of("Author") == Some("Diana"))
        .unwrap();
    let post = diana.single("Post").unwrap();
    assert_eq!(post.record.str_of("Title"), Some("Paris Trip"));
    assert_eq!(post.single("Blog").unwrap().record.str_of("Title"), Some("Travel Blog"));

    // Posts 1 and 2 share a blog; the blog is fetched once
    let log = outcome.log();
    assert_eq!(log[1].key_count, 5);
    assert_eq!(log[2].key_count, 3);
}

#[tokio::test]
async fn test_explicit_per_entity_versus_set() {
    let loader = loader(demo_store().await);

    let per_entity = loader
        .load(RootQuery::all("Blog"), LoadStrategy::Explicit, &[])
        .await
        .unwrap();
    let (mut blogs, session) = per_entity.into_parts();
    let posts = RelationshipPath::new("Posts");
    for blog in blogs.iter_mut() {
        session.load_entry(blog, &posts).await.unwrap();
    }
    assert_eq!(session.round_trips(), 4);
    assert!(blogs.iter().all(|b| b.loaded("Posts").map(<[Node]>::len) == Some(2)));

    let mut as_set = loader
        .load(RootQuery::all("Blog"), LoadStrategy::Explicit, &[])
        .await
        .unwrap();
    as_set
        .session
        .load_collection(&mut as_set.roots, &posts)
        .await
        .unwrap();
    assert_eq!(as_set.round_trips(), 2);

    let per_entity_json: Vec<_> = blogs.iter().map(Node::to_json).collect();
    let as_set_json: Vec<_> = as_set.roots.iter().map(Node::to_json).collect();
    assert_eq!(per_entity_json, as_set_json);
}

#[tokio::test]
async fn test_explicit_nested_entry() {
    let loader = loader(demo_store().await);
    let mut outcome = loader
        .load(RootQuery::by_key("Blog", 1), LoadStrategy::Explicit, &[])
        .await
        .unwrap();

    let path: RelationshipPath = "Posts.Comments".parse().unwrap();
    outcome.session.load_entry(&mut outcome.roots[0], &path).await.unwrap();

    assert_eq!(outcome.round_trips(), 3);
    let authors: Vec<&str> = outcome.roots[0]
        .descend("Posts.Comments")
        .into_iter()
        .filter_map(|c| c.record.str_of("Author"))
        .collect();
    assert_eq!(authors, vec!["John", "Jane", "Bob"]);
}

#[tokio::test]
async fn test_explicit_collection_with_filter() {
    let loader = loader(demo_store().await);
    let mut outcome = loader
        .load(RootQuery::all("Blog"), LoadStrategy::Explicit, &[])
        .await
        .unwrap();

    outcome
        .session
        .load_collection(&mut outcome.roots, &recent_posts())
        .await
        .unwrap();
    let counts: Vec<usize> = outcome
        .roots
        .iter()
        .map(|b| b.loaded("Posts").unwrap().len())
        .collect();
    assert_eq!(counts, vec![2, 1, 1]);
}

#[tokio::test]
async fn test_batch_issues_filtered_scans() {
    let loader = loader(demo_store().await);
    let outcome = loader
        .load_str(RootQuery::all("Blog"), LoadStrategy::Batch, &["Posts.Comments"])
        .await
        .unwrap();

    let log = outcome.log();
    assert_eq!(log.len(), 3);
    assert!(log.iter().all(|t| t.kind == RoundTripKind::ScanAll));
    assert_eq!(log[1].filter.as_deref(), Some("BlogId IN (1, 2, 3)"));
    assert_eq!(log[2].filter.as_deref(), Some("PostId IN (1, 2, 3, 4, 5, 6)"));

    let tokyo = &outcome.roots[2].loaded("Posts").unwrap()[1];
    assert_eq!(tokyo.loaded("Comments").map(<[Node]>::len), Some(0));
}

#[tokio::test]
async fn test_projection_counts_and_top_records() {
    let loader = loader(demo_store().await);
    let projection = Projection::new(&["Title"])
        .summarize(
            RelationshipSummary::new("Posts")
                .count_as("PostCount")
                .top(2, "RecentPosts")
                .order_by("PublishedDate", SortDirection::Descending)
                .fields(&["Title"]),
        )
        .summarize(RelationshipSummary::new("Tags").count_as("TagCount"));

    let outcome = loader.project(RootQuery::all("Blog"), &projection).await.unwrap();
    assert_eq!(outcome.round_trips(), 3);
    assert_eq!(
        outcome.rows[0],
        serde_json::json!({
            "Title": "Tech Blog",
            "PostCount": 2,
            "TagCount": 2,
            "RecentPosts": [{ "Title": "Advanced EF Core" }, { "Title": "EF Core Basics" }],
        })
    );
    assert_eq!(outcome.rows[2]["RecentPosts"][0]["Title"], "Tokyo Adventure");
}

#[tokio::test]
async fn test_projection_rejects_unknown_relationship() {
    let loader = loader(demo_store().await);
    let projection = Projection::new(&["Title"]).summarize(RelationshipSummary::new("Authors"));

    let result = loader.project(RootQuery::all("Blog"), &projection).await;
    assert!(matches!(result, Err(navload_orm::LoaderError::UnknownRelationship { .. })));
}

#[tokio::test]
async fn test_typed_entities_from_a_loaded_graph() {
    let loader = loader(demo_store().await);
    let outcome = loader
        .load_str(RootQuery::by_key("Blog", 2), LoadStrategy::Eager, &["Posts.Comments"])
        .await
        .unwrap();

    let blog = Blog::from_node(&outcome.roots[0]).unwrap();
    assert_eq!(blog.title, "Cooking Blog");

    let posts: Vec<Post> = decode_all(outcome.roots[0].loaded("Posts").unwrap()).unwrap();
    assert!(posts.iter().all(|p| p.blog_id == blog.id));
    assert!(posts[0].published_date < posts[1].published_date);

    let comments: Vec<Comment> = outcome.roots[0]
        .descend("Posts.Comments")
        .into_iter()
        .map(Comment::from_node)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(comments.len(), 2);
}

#[tokio::test]
async fn test_seeding_twice_inserts_once() {
    let store = demo_store().await;
    assert!(!seed_demo_data(store.as_ref()).await.unwrap());

    let loader = loader(store);
    let outcome = loader
        .load(RootQuery::all("Blog"), LoadStrategy::Lazy, &[])
        .await
        .unwrap();
    assert_eq!(outcome.roots.len(), 3);
}

#[tokio::test]
async fn test_generated_data_scales_without_extra_round_trips() {
    let loader = loader(generated_store(40, 3, 2).await);
    let outcome = loader
        .load_str(RootQuery::all("Blog"), LoadStrategy::Batch, &["Posts.Comments", "Tags"])
        .await
        .unwrap();

    assert_eq!(outcome.roots.len(), 40);
    assert_eq!(outcome.round_trips(), 4);
    let comments: usize = outcome.roots.iter().map(|b| b.descend("Posts.Comments").len()).sum();
    assert_eq!(comments, 240);
}

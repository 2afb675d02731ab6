use super::*;
use crate::relationships::blog_schema;

fn post(key: Key, blog_id: Key) -> Record {
    Record::new("Post", key).with("Id", key).with("BlogId", blog_id)
}

#[test]
fn test_group_by_attribute_keeps_order() {
    let groups = group_by_attribute(vec![post(1, 10), post(2, 20), post(3, 10)], "BlogId");

    assert_eq!(groups.len(), 2);
    let keys: Vec<Key> = groups[&10].iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![1, 3]);
    assert_eq!(groups[&20][0].key, 2);
}

#[test]
fn test_group_by_key_drops_items_without_key() {
    let records = vec![post(1, 10), Record::new("Post", 2).with("Id", 2)];
    let groups = group_by_key(records, |r| r.key_of("BlogId"));

    assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 1);
}

#[test]
fn test_attach_fills_every_parent() {
    let schema = blog_schema().unwrap();
    let mut blogs: Vec<Node> = (10..=12)
        .map(|k| Node::unresolved(Record::new("Blog", k).with("Id", k), &schema))
        .collect();

    let posts = vec![post(1, 10), post(2, 10), post(3, 11)];
    let grouped = group_by_key(
        posts.into_iter().map(|r| Node::unresolved(r, &schema)),
        |n| n.record.key_of("BlogId"),
    );
    attach(&mut blogs, "Posts", &grouped, |b| Some(b.key()));

    let counts: Vec<usize> = blogs.iter().map(|b| b.loaded("Posts").map_or(0, <[Node]>::len)).collect();
    assert_eq!(counts, vec![2, 1, 0]);
    assert!(blogs.iter().all(|b| b.is_loaded("Posts")));
    assert!(blogs.iter().all(|b| !b.is_loaded("Tags")));
}

#[test]
fn test_attach_shares_group_between_parents_with_same_key() {
    let schema = blog_schema().unwrap();
    let mut posts: Vec<Node> = vec![post(1, 10), post(2, 10)]
        .into_iter()
        .map(|r| Node::unresolved(r, &schema))
        .collect();

    let blog = Node::unresolved(Record::new("Blog", 10).with("Id", 10), &schema);
    let grouped = group_by_key(vec![blog], |n| Some(n.key()));
    attach(&mut posts, "Blog", &grouped, |p| p.record.key_of("BlogId"));

    assert!(posts.iter().all(|p| p.single("Blog").map(Node::key) == Some(10)));
}

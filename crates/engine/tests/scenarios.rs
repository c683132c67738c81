//! End-to-end scenarios exercising the full draft → resolve → persist →
//! relate → cascade → hydrate pipeline against the in-memory provider.
//! Each test mirrors one of the concrete walkthroughs the engine is
//! grounded on: bidirectional synthesis, forward-exact auto-generation,
//! fuzzy hit/miss, union-type matching, and bounded cascade.

use std::sync::Arc;

use graphdb_engine::{
    cascade, CascadeOptions, CreateOptions, Created, EngineContext, EntityOps, RelationProxy,
};
use graphdb_generator::StubGenerator;
use graphdb_provider::{MemoryProvider, Record};
use graphdb_schema::{normalize, Declaration, FieldDef};
use serde_json::json;

fn ctx(decl: &[(&str, &[(&str, &str)])]) -> EngineContext {
    let declaration: Declaration = decl
        .iter()
        .map(|(entity, fields)| {
            let map = fields
                .iter()
                .map(|(n, d)| (n.to_string(), FieldDef::scalar(*d)))
                .collect();
            (entity.to_string(), map)
        })
        .collect();
    let schema = normalize(&declaration).unwrap();
    EngineContext::new(
        Arc::new(schema),
        Arc::new(MemoryProvider::new()),
        Arc::new(StubGenerator),
    )
}

#[tokio::test]
async fn bidirectional_synthesis_round_trips_through_the_backref() {
    let ctx = ctx(&[
        ("Post", &[("title", "string"), ("author", "Author.posts")]),
        ("Author", &[("name", "string")]),
    ]);

    let authors = EntityOps::new(ctx.clone(), "Author");
    let mut author_data = Record::default();
    author_data.set("name", "J");
    let Created::Entity { entity: author, .. } = authors
        .create(Some("auth_1".to_string()), author_data, CreateOptions::default())
        .await
        .unwrap()
    else {
        panic!("expected entity");
    };
    let author_id = author.data.id().unwrap().to_string();

    let posts = EntityOps::new(ctx.clone(), "Post");
    let mut post_data = Record::default();
    post_data.set("title", "H");
    post_data.set("author", author_id.clone());
    posts
        .create(Some("post_1".to_string()), post_data, CreateOptions::default())
        .await
        .unwrap();

    let hydrated_author = authors.get(&author_id).await.unwrap().unwrap();
    let RelationProxy::Many(mut proxy) = hydrated_author.relation("posts").cloned().unwrap() else {
        panic!("expected many proxy");
    };
    let loaded = proxy.load_all(&ctx).await.unwrap();
    let titles: Vec<&str> = loaded.iter().filter_map(|r| r.get_str("title")).collect();
    assert_eq!(titles, vec!["H"]);
}

#[tokio::test]
async fn forward_exact_auto_generation_stamps_generated_by() {
    let ctx = ctx(&[
        ("Startup", &[("name", "string"), ("idea", "->Idea")]),
        ("Idea", &[("description", "string")]),
    ]);

    let startups = EntityOps::new(ctx.clone(), "Startup");
    let mut data = Record::default();
    data.set("name", "Acme");
    let Created::Entity { entity: startup, .. } = startups
        .create(Some("s_1".to_string()), data, CreateOptions::default())
        .await
        .unwrap()
    else {
        panic!("expected entity");
    };

    let RelationProxy::Single(mut idea_proxy) = startup.relation("idea").cloned().unwrap() else {
        panic!("expected single proxy");
    };
    let idea = idea_proxy.load(&ctx).await.unwrap();
    assert_eq!(idea.get("$generatedBy").and_then(|v| v.as_str()), Some("s_1"));

    let ideas = ctx.provider.list("Idea", Default::default()).await.unwrap();
    assert_eq!(ideas.len(), 1);
}

#[tokio::test]
async fn fuzzy_match_hits_an_existing_category() {
    let ctx = ctx(&[
        ("Article", &[("title", "string"), ("category", "~>Category(0.75)")]),
        ("Category", &[("name", "string")]),
    ]);

    let mut cat = Record::new("Category", "cat_1");
    cat.set("name", "renewable energy");
    ctx.provider.create("Category", Some("cat_1"), cat).await.unwrap();

    let articles = EntityOps::new(ctx.clone(), "Article");
    let mut data = Record::default();
    data.set("title", "Solar");
    data.set("categoryHint", "renewable energy");
    let Created::Entity { entity: article, .. } = articles
        .create(Some("art_1".to_string()), data, CreateOptions::default())
        .await
        .unwrap()
    else {
        panic!("expected entity");
    };

    let RelationProxy::Single(proxy) = article.relation("category").cloned().unwrap() else {
        panic!("expected single proxy");
    };
    assert_eq!(proxy.to_string(), "cat_1");

    let categories = ctx.provider.list("Category", Default::default()).await.unwrap();
    assert_eq!(categories.len(), 1, "no new category should have been generated");
}

#[tokio::test]
async fn fuzzy_miss_generates_and_writes_an_edge() {
    let ctx = ctx(&[
        ("Article", &[("title", "string"), ("category", "~>Category(0.9)")]),
        ("Category", &[("name", "string")]),
    ]);

    let articles = EntityOps::new(ctx.clone(), "Article");
    let mut data = Record::default();
    data.set("title", "Solar");
    data.set("categoryHint", "completely unrelated phrase");
    let Created::Entity { entity: article, .. } = articles
        .create(Some("art_1".to_string()), data, CreateOptions::default())
        .await
        .unwrap()
    else {
        panic!("expected entity");
    };

    let RelationProxy::Single(mut proxy) = article.relation("category").cloned().unwrap() else {
        panic!("expected single proxy");
    };
    let category = proxy.load(&ctx).await.unwrap();
    assert_eq!(category.get("$generated"), Some(&json!(true)));

    let edges = ctx.provider.list("Edge", Default::default()).await.unwrap();
    let edge = edges
        .iter()
        .find(|e| e.get_str("from") == Some("Article") && e.get_str("name") == Some("category"))
        .expect("a fuzzy-match Edge row should have been written");
    assert_eq!(edge.get_str("matchMode"), Some("fuzzy"));
}

#[tokio::test]
async fn union_subject_supplied_directly_hydrates_the_matched_type() {
    let ctx = ctx(&[
        ("Post", &[("subject", "->Person|Company")]),
        ("Person", &[("name", "string")]),
        ("Company", &[("name", "string")]),
    ]);

    ctx.provider
        .create("Person", Some("per_9"), Record::new("Person", "per_9"))
        .await
        .unwrap();

    let posts = EntityOps::new(ctx.clone(), "Post");
    let mut data = Record::default();
    data.set("subject", "per_9");
    let Created::Entity { entity: post, .. } = posts
        .create(Some("post_1".to_string()), data, CreateOptions::default())
        .await
        .unwrap()
    else {
        panic!("expected entity");
    };

    assert_eq!(post.data.get_str("subject$matchedType"), Some("Person"));
    let RelationProxy::Single(mut proxy) = post.relation("subject").cloned().unwrap() else {
        panic!("expected single proxy");
    };
    let loaded = proxy.load(&ctx).await.unwrap();
    assert_eq!(loaded.type_name(), Some("Person"));
}

#[tokio::test]
async fn bounded_cascade_creates_at_least_one_child_per_depth() {
    let ctx = ctx(&[("Node", &[("name", "string"), ("children", "->Node[]?")])]);

    let nodes = EntityOps::new(ctx.clone(), "Node");
    let mut data = Record::default();
    data.set("name", "root");
    let Created::Entity { entity: root, .. } = nodes
        .create(
            Some("root".to_string()),
            data,
            CreateOptions {
                resolve: graphdb_engine::ResolveOptions {
                    defer_arrays_to_cascade: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .await
        .unwrap()
    else {
        panic!("expected entity");
    };
    assert!(root.data.get_str("children").is_none() || root.data.get("children").unwrap().as_array().unwrap().is_empty());

    let report = cascade(
        &ctx,
        "Node",
        "root",
        &CascadeOptions {
            max_depth: 3,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(report.total_entities_created >= 3);
    assert!(report.types_generated.contains("Node"));

    // No depth-4 node: with the hard ceiling of DEFAULT_MAX_DEPTH (5) and a
    // requested max_depth of 3, the walk never persists past depth 3.
    let all_nodes = ctx.provider.list("Node", Default::default()).await.unwrap();
    assert_eq!(all_nodes.len() as u64, report.total_entities_created + 1);
}

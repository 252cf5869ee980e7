use avl_dict::AvlTree;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,avl_dict=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut tree = AvlTree::new();
    tree.insert(0, "zero");
    tree.insert(1, "one");
    tree.insert(2, "two");
    tree.insert(2, "two");
    tree.insert(3, "three");
    tree.insert(4, "four");
    tree.insert(5, "five");
    assert_eq!(tree.get(&1), Some(&"one"));
    tree.remove(&1);
    assert!(tree.find(&1) == tree.end());

    for (k, v) in &tree {
        println!("{k} => {v}");
    }

    let mut other = AvlTree::new();
    other.insert(1, "eins");
    other.insert(5, "fünf");
    other.insert(6, "sechs");
    tree.merge(&other);

    let mut cursor = tree.begin();
    print!("{{ ");
    while !cursor.is_end() {
        if let Some((k, v)) = cursor.key_value() {
            print!("{k}: {v}, ");
        }
        cursor.move_next();
    }
    println!("}}");
}

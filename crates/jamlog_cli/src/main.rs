//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `jamlog_core` linkage and a full write/read cycle on a throwaway
//!   in-memory store.
//! - Keep output deterministic apart from the generated record id.

use jamlog_core::{AttributeValue, PersistenceController, StoreConfig};
use uuid::Uuid;

fn main() {
    println!("jamlog_core ping={}", jamlog_core::ping());
    println!("jamlog_core version={}", jamlog_core::core_version());

    let mut store = PersistenceController::open_or_abort(StoreConfig::in_memory());
    let post_id = Uuid::new_v4();
    if let Err(err) = store.create_record(
        "Post",
        post_id,
        &[("body", AttributeValue::Text("draft".to_string()))],
    ) {
        eprintln!("create_record failed: {err}");
        std::process::exit(1);
    }

    store.update_attribute("Post", "body", "final", post_id);
    let body: Option<String> = store.fetch_attribute("Post", "body", post_id);
    let image_url: Option<String> = store.fetch_attribute("Post", "imageURL", post_id);

    println!("post id={post_id}");
    println!("post body={}", body.as_deref().unwrap_or("<none>"));
    println!("post imageURL={}", image_url.as_deref().unwrap_or("<none>"));
}

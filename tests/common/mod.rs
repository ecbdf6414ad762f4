//! Shared fixtures: listing markup and a local HTTP server that serves it.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse};
use axum::Router;

pub const SUBJECT: &str = "hot-fuzz";

pub fn article(user: &str, body: &str) -> String {
    format!(
        r#"<li class="film-detail"><div class="listitem">
            <article class="production-viewing -viewing">
                <a class="avatar" href="/{user}/"><img alt="{user}"></a>
                <a class="context" href="/{user}/film/{SUBJECT}/">Review by {user}</a>
                <span class="rating -green rated-8">★★★★</span>
                <time class="timestamp" datetime="2024-03-09T18:30:00Z">Mar 9</time>
                <div class="js-review"><div class="body-text -prose" lang="en"><p>{body}</p></div></div>
            </article>
        </div></li>"#
    )
}

/// Three valid reviews and two containers that must be rejected: one whose
/// body is only 10 characters and one with no recoverable author.
pub fn listing_markup() -> String {
    let mut items = String::new();
    items.push_str(&article(
        "alice",
        "An absolutely brilliant and hilarious film. I loved every minute!",
    ));
    items.push_str(&article("shorty", "Too short."));
    items.push_str(&article(
        "bob",
        "Tedious, boring and badly paced. A real disappointment.",
    ));
    // no avatar, and the permalink carries no user segment
    items.push_str(&format!(
        r#"<div class="listitem"><article class="production-viewing">
            <a class="context" href="/film/{SUBJECT}/">Review</a>
            <div class="js-review"><div class="body-text -prose">
                <p>Nobody signed this one, though it is plenty long enough.</p>
            </div></div>
        </article></div>"#
    ));
    items.push_str(&article(
        "carol",
        "The village setting is quiet and the runtime is two hours.",
    ));

    format!(
        "<!DOCTYPE html><html><body><section class=\"viewing-list\"><ul>{}</ul></section></body></html>",
        items
    )
}

/// Router answering each known path with its page and 404 otherwise.
pub fn fixture_router(pages: HashMap<String, String>) -> Router {
    let pages = Arc::new(pages);
    Router::new().fallback(move |uri: Uri| {
        let pages = pages.clone();
        async move {
            match pages.get(uri.path()) {
                Some(body) => (StatusCode::OK, Html(body.clone())).into_response(),
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
    })
}

/// Serve `pages` on an ephemeral port from the current runtime.
pub async fn spawn_fixture(pages: HashMap<String, String>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, fixture_router(pages)).await.unwrap();
    });
    addr
}

/// Serve `pages` from a dedicated thread, for tests that are not async.
pub fn spawn_fixture_blocking(pages: HashMap<String, String>) -> SocketAddr {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, fixture_router(pages)).await.unwrap();
        });
    });
    rx.recv().unwrap()
}

/// Only the plain `reviews/` variant exists, so the popular variant 404s.
pub fn fallback_pages() -> HashMap<String, String> {
    let mut pages = HashMap::new();
    pages.insert(format!("/film/{}/reviews/", SUBJECT), listing_markup());
    pages
}

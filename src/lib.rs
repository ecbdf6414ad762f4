//! # Review Harvester
//!
//! A polling ingestion pipeline for short-form film reviews.
//!
//! On a fixed interval the harvester picks a film at random from a
//! configured set, fetches its public review listing, extracts individual
//! reviews from the markup, scores each one with a lexicon-based sentiment
//! analyzer and stores the result in SQLite, silently skipping reviews it
//! has already seen. A small read-only HTTP service exposes the most
//! recently ingested rows.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌────────────┐   ┌──────────┐
//! │  Fetcher  │──▶│ Extractor │──▶│ Sentiment  │──▶│  SQLite  │
//! │  (HTTP)   │   │ (scraper) │   │ (lexicon)  │   │ reviews  │
//! └───────────┘   └───────────┘   └────────────┘   └────┬─────┘
//!        ▲                                              │
//!        │ every interval                 ┌─────────────┤
//!  ┌─────┴─────┐                          ▼             ▼
//!  │ Scheduler │                    ┌──────────┐  ┌──────────┐
//!  └───────────┘                    │   CLI    │  │   HTTP   │
//!                                   │(harvest) │  │ /reviews │
//!                                   └──────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! harvest init                  # create database
//! harvest once hot-fuzz         # run a single cycle for one film
//! harvest run                   # poll until Ctrl+C
//! harvest serve                 # start the read API
//! harvest recent --limit 10
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`fetch`] | Listing page retrieval with fallback variants |
//! | [`extract`] | Review extraction from listing markup |
//! | [`sentiment`] | Rule-based sentiment scoring |
//! | [`store`] | Deduplicating review persistence |
//! | [`scheduler`] | The polling loop |
//! | [`ingest`] | CLI wiring for the loop |
//! | [`server`] | Read-only HTTP service |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod recent;
pub mod scheduler;
pub mod sentiment;
pub mod server;
pub mod stats;
pub mod store;

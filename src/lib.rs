//! Lenta: a small social blogging server.
//!
//! Posts belong to optional groups, readers comment, and authenticated
//! users follow authors to build a personalised feed. The crate is
//! layered: `domain` holds entities and display rules, `application`
//! the feed/follow/compose services over repository traits, `infra`
//! the Postgres, filesystem, cache and HTTP adapters, and
//! `presentation` the askama views.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;

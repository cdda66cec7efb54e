//! # mapping-renderer
//!
//! Renders API Gateway mapping templates against a request payload, with
//! `$input` and the `$util` helpers bound.
//!
//! ## Usage
//!
//! ```rust
//! use mapping_renderer::render;
//!
//! let payload = r#"{"hello": ["world", "world2"]}"#;
//! let out = render("$util.parseJson($input.body).hello[1]", payload).unwrap();
//! assert_eq!(out, "world2");
//! ```
//!
//! For query/path/header parameters, `$context` and `$stageVariables`, build
//! a [`RenderRequest`] and use [`Renderer::render_request`].

pub mod context;
pub mod engine;
pub mod error;
pub mod jsonpath;
pub mod request;
pub mod util;

pub use context::{Input, RenderContext, Util};
pub use engine::{render, MappingTemplate, RenderOptions, Renderer};
pub use error::{RenderError, UtilError};
pub use request::{RenderRequest, RequestParams};

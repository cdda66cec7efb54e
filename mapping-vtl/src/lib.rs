//! # mapping-vtl
//!
//! A Velocity-style template language: the subset used by API Gateway
//! mapping templates. Parse once with [`parse`], render many times with
//! [`Template::render`].
//!
//! ## Usage
//!
//! ```rust
//! use mapping_vtl::{parse, Context, EvalOptions, Value};
//!
//! let template = parse("Hello, $name!").unwrap();
//! let ctx = Context::new().with("name", Value::from("World"));
//! let out = template.render(&ctx, &EvalOptions::default()).unwrap();
//! assert_eq!(out, "Hello, World!");
//! ```
//!
//! Host values such as `$util` are exposed through the [`Object`] trait.

mod ast;
pub mod error;
pub mod eval;
mod methods;
mod ops;
pub mod parser;
pub mod value;

pub use ast::Template;
pub use error::{BoxError, EvalError, ParseError};
pub use eval::{Context, EvalOptions, DEFAULT_MAX_FOREACH_ITERATIONS};
pub use parser::parse;
pub use value::{Map, Object, Value};

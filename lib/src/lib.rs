//! Building blocks for deriving IP geolocation feeds from BGP routing data.
//!
//! The library reconciles routes learned by network devices against a static, per-city address
//! allocation plan:
//!
//! - [`Config`] describes the allocation plan.
//! - [`AddrSet`] provides the address-set arithmetic used throughout.
//! - [`announce::classify`] sorts [`Route`]s learned from a device into announced and carved
//!   address space.
//! - [`Locations`] accumulates the classified routes per city, and produces a [`Report`].
//! - [`output`] writes a [`Report`] in geofeed CSV and JSON formats.
#![doc(html_root_url = "https://docs.rs/iplocbuild-lib/0.1.0")]
// clippy lints
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::multiple_crate_versions)]
// rustc lints
#![warn(absolute_paths_not_starting_with_crate)]
#![warn(deprecated_in_future)]
#![warn(elided_lifetimes_in_paths)]
#![warn(explicit_outlives_requirements)]
#![warn(keyword_idents)]
#![warn(macro_use_extern_crate)]
#![warn(meta_variable_misuse)]
#![warn(missing_abi)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(non_ascii_idents)]
#![warn(noop_method_call)]
#![warn(rust_2021_incompatible_closure_captures)]
#![warn(rust_2021_incompatible_or_patterns)]
#![warn(rust_2021_prefixes_incompatible_syntax)]
#![warn(rust_2021_prelude_collisions)]
#![warn(single_use_lifetimes)]
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(unsafe_op_in_unsafe_fn)]
#![warn(unstable_features)]
#![warn(unused_crate_dependencies)]
#![warn(unused_extern_crates)]
#![warn(unused_import_braces)]
#![warn(unused_lifetimes)]
#![warn(unused_qualifications)]
#![warn(unused_results)]
#![warn(variant_size_differences)]
// docs.rs build config
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod error;
pub use self::error::Error;

pub mod config;
pub use self::config::Config;

pub mod set;
pub use self::set::AddrSet;

pub mod route;
pub use self::route::{AsPath, NextHop, PathOrigin, Route};

pub mod announce;

pub mod location;
pub use self::location::{Locations, Report};

pub mod output;

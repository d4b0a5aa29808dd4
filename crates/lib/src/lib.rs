//! kiln-lib: recipe-driven source installs
//!
//! This crate provides the pieces behind `kiln install`:
//! - `RecipeDescriptor`: a validated description of one package and its build steps
//! - `DependencyResolver`: maps declared dependencies to installed prefixes
//! - `Fetcher`: downloads, verifies and extracts the source archive
//! - `InstallPlan`: concrete process invocations with placeholders substituted
//! - `Executor`: runs the stages in order, stopping at the first failure

pub mod config;
pub mod consts;
pub mod execute;
pub mod fetch;
pub mod paths;
pub mod placeholder;
pub mod plan;
pub mod recipe;
pub mod resolve;
pub mod util;

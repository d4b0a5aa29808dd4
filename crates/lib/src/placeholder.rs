//! Placeholder parsing and substitution for step templates.
//!
//! Install steps are written before the install prefix and the dependency
//! prefixes are known. Templates reference them through placeholders that are
//! substituted when the install plan is built.
//!
//! # Placeholder Formats
//!
//! - `$${prefix}` - install prefix of the recipe being built
//! - `$${dep:<id>}` - install prefix of the resolved dependency `<id>`
//! - `$${src}` - extracted source directory (the step working directory)
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so `$HOME` or `$(nproc)` in
//! an argument reach the program verbatim.
//!
//! # Escaping
//!
//! `$$${` produces a literal `$${`.
//!
//! # Example
//!
//! ```
//! use kiln_lib::placeholder::{parse, Placeholder, Segment};
//!
//! let segments = parse("--with-gcc=$${dep:i386-elf-gcc}/bin").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("--with-gcc=".to_string()),
//!     Segment::Placeholder(Placeholder::Dep("i386-elf-gcc".to_string())),
//!     Segment::Literal("/bin".to_string()),
//! ]);
//! ```

use thiserror::Error;

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  /// `$${prefix}`
  Prefix,

  /// `$${dep:<id>}`
  Dep(String),

  /// `$${src}`
  Src,
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder type: {0}")]
  UnknownType(String),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("unresolved dependency placeholder: {0}")]
  UnresolvedDep(String),

  #[error("install prefix is not available")]
  UnresolvedPrefix,

  #[error("source directory is not available")]
  UnresolvedSrc,
}

/// Supplies values for placeholders during substitution.
pub trait Resolver {
  fn resolve_prefix(&self) -> Result<&str, PlaceholderError>;

  fn resolve_dep(&self, id: &str) -> Result<&str, PlaceholderError>;

  fn resolve_src(&self) -> Result<&str, PlaceholderError>;
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed, empty, or of an unknown type.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut rest = input;
  let mut offset = 0;

  while let Some(idx) = rest.find("$$") {
    literal.push_str(&rest[..idx]);
    let after = &rest[idx + 2..];

    let next = if let Some(escaped) = after.strip_prefix("${") {
      literal.push_str("$${");
      escaped
    } else if let Some(body) = after.strip_prefix('{') {
      let close = body.find('}').ok_or(PlaceholderError::Unclosed(offset + idx))?;

      if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(&mut literal)));
      }
      segments.push(Segment::Placeholder(parse_placeholder_content(&body[..close])?));

      &body[close + 1..]
    } else {
      literal.push_str("$$");
      after
    };

    offset += rest.len() - next.len();
    rest = next;
  }

  literal.push_str(rest);
  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  match content {
    "prefix" => return Ok(Placeholder::Prefix),
    "src" => return Ok(Placeholder::Src),
    "" => return Err(PlaceholderError::Malformed("empty placeholder".to_string())),
    _ => {}
  }

  match content.split_once(':') {
    Some(("dep", id)) if !id.is_empty() => Ok(Placeholder::Dep(id.to_string())),
    Some(("dep", _)) => Err(PlaceholderError::Malformed(format!(
      "dependency placeholder missing id: '{content}'"
    ))),
    Some((kind, _)) => Err(PlaceholderError::UnknownType(kind.to_string())),
    None => Err(PlaceholderError::UnknownType(content.to_string())),
  }
}

/// Dependency ids referenced by `$${dep:<id>}` placeholders in `input`.
pub fn dependency_refs(input: &str) -> Result<Vec<String>, PlaceholderError> {
  Ok(
    parse(input)?
      .into_iter()
      .filter_map(|segment| match segment {
        Segment::Placeholder(Placeholder::Dep(id)) => Some(id),
        _ => None,
      })
      .collect(),
  )
}

/// Parse `input` and substitute every placeholder using `resolver`.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(Placeholder::Prefix) => result.push_str(resolver.resolve_prefix()?),
      Segment::Placeholder(Placeholder::Dep(id)) => result.push_str(resolver.resolve_dep(id)?),
      Segment::Placeholder(Placeholder::Src) => result.push_str(resolver.resolve_src()?),
    }
  }

  Ok(result)
}

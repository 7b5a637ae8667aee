//! Radix tree node.
//!
//! One node per path segment. Static children are kept sorted for binary
//! search; each node has at most one parameter child and one wildcard child.

use http::Method;
use smallvec::SmallVec;

use crate::error::RouteConflict;
use crate::params::Params;

/// Type of path segment in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    /// Literal segment (`api`, `create`)
    Static,
    /// Named parameter (`:id`)
    Param(String),
    /// Catch-all (`*rest`)
    Wildcard(String),
}

/// A node in the radix tree, holding the endpoints registered at its path.
#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    segment: String,
    kind: SegmentKind,
    endpoints: SmallVec<[(Method, T); 4]>,
    static_children: Vec<Node<T>>,
    param_child: Option<Box<Node<T>>>,
    wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn new(segment: &str, kind: SegmentKind) -> Self {
        Self {
            segment: segment.to_string(),
            kind,
            endpoints: SmallVec::new(),
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates the root node.
    pub(crate) fn root() -> Self {
        Self::new("", SegmentKind::Static)
    }

    /// Splits a pattern into typed segments.
    pub(crate) fn parse_pattern(path: &str) -> Vec<(String, SegmentKind)> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix(':') {
                    (s.to_string(), SegmentKind::Param(name.to_string()))
                } else if let Some(name) = s.strip_prefix('*') {
                    (s.to_string(), SegmentKind::Wildcard(name.to_string()))
                } else {
                    (s.to_string(), SegmentKind::Static)
                }
            })
            .collect()
    }

    /// Registers `value` for `method` at `path`.
    pub(crate) fn insert(&mut self, path: &str, method: Method, value: T) -> Result<(), RouteConflict> {
        let segments = Self::parse_pattern(path);
        if let Some(pos) = segments
            .iter()
            .position(|(_, kind)| matches!(kind, SegmentKind::Wildcard(_)))
        {
            if pos + 1 != segments.len() {
                return Err(RouteConflict::WildcardNotLast {
                    path: path.to_string(),
                });
            }
        }
        self.insert_segments(path, &segments, method, value)
    }

    fn insert_segments(
        &mut self,
        path: &str,
        segments: &[(String, SegmentKind)],
        method: Method,
        value: T,
    ) -> Result<(), RouteConflict> {
        let Some(((segment, kind), remaining)) = segments.split_first() else {
            if self.endpoints.iter().any(|(m, _)| *m == method) {
                return Err(RouteConflict::Duplicate {
                    method,
                    path: path.to_string(),
                });
            }
            self.endpoints.push((method, value));
            return Ok(());
        };

        let child = match kind {
            SegmentKind::Static => {
                match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(i) => &mut self.static_children[i],
                    Err(i) => {
                        self.static_children
                            .insert(i, Node::new(segment, SegmentKind::Static));
                        &mut self.static_children[i]
                    }
                }
            }
            SegmentKind::Param(name) | SegmentKind::Wildcard(name) => {
                let slot = if matches!(kind, SegmentKind::Param(_)) {
                    &mut self.param_child
                } else {
                    &mut self.wildcard_child
                };
                if let Some(existing) = slot.as_deref() {
                    if let SegmentKind::Param(existing_name) | SegmentKind::Wildcard(existing_name) =
                        &existing.kind
                    {
                        if existing_name != name {
                            return Err(RouteConflict::ParamName {
                                path: path.to_string(),
                                existing: existing_name.clone(),
                                new: name.clone(),
                            });
                        }
                    }
                }
                slot.get_or_insert_with(|| Box::new(Node::new(segment, kind.clone())))
                    .as_mut()
            }
        };

        child.insert_segments(path, remaining, method, value)
    }

    /// Finds the node registered for a concrete request path.
    pub(crate) fn find(&self, path: &str) -> Option<(&Self, Params)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let node = self.find_segments(&segments, &mut params)?;
        Some((node, params))
    }

    fn find_segments<'a>(&'a self, segments: &[&str], params: &mut Params) -> Option<&'a Self> {
        let Some((segment, remaining)) = segments.split_first() else {
            return (!self.endpoints.is_empty()).then_some(self);
        };

        if let Ok(i) = self
            .static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
        {
            if let Some(found) = self.static_children[i].find_segments(remaining, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), decode(segment));
                if let Some(found) = child.find_segments(remaining, params) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        if let Some(child) = &self.wildcard_child {
            if let SegmentKind::Wildcard(name) = &child.kind {
                if !child.endpoints.is_empty() {
                    let rest: Vec<String> = segments.iter().map(|s| decode(s)).collect();
                    params.push(name.clone(), rest.join("/"));
                    return Some(child.as_ref());
                }
            }
        }

        None
    }

    /// Returns the endpoint for `method`. `HEAD` falls back to `GET`.
    pub(crate) fn endpoint(&self, method: &Method) -> Option<&T> {
        let lookup = |m: &Method| {
            self.endpoints
                .iter()
                .find(|(registered, _)| registered == m)
                .map(|(_, value)| value)
        };
        lookup(method).or_else(|| {
            if *method == Method::HEAD {
                lookup(&Method::GET)
            } else {
                None
            }
        })
    }

    /// Returns the methods registered at this node.
    pub(crate) fn methods(&self) -> impl Iterator<Item = &Method> {
        self.endpoints.iter().map(|(m, _)| m)
    }
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| segment.to_string())
}

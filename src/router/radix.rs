//! Radix tree matcher for the path templates of one HTTP method.
//!
//! The tree is built by splitting templates into segments:
//! - each node represents one path segment
//! - literal segments (e.g. `users`) match exactly
//! - placeholder segments (e.g. `{id}`) match any single non-empty segment
//! - the operation is stored at the terminal node
//!
//! Lookup is O(k) in the number of request segments. Literal children are
//! always tried before placeholder children, and a failed placeholder
//! branch backtracks so `/users/me/posts` can still fall through to
//! `/users/{id}/posts` when no literal route continues.

use std::borrow::Cow;
use std::sync::Arc;

use super::core::ParamVec;
use crate::spec::{Operation, Segment};

#[derive(Clone, Debug)]
struct RadixNode {
    /// Literal segment text; empty for the root and placeholder nodes.
    segment: Cow<'static, str>,
    /// Operation registered at this node, if the node terminates a template.
    route: Option<Arc<Operation>>,
    /// Placeholder name when this is a placeholder node.
    param_name: Option<Arc<str>>,
    children: Vec<RadixNode>,
    /// Placeholder children. Several names may share a position
    /// (`/users/{id}/posts` vs `/users/{user_id}/comments`).
    param_children: Vec<RadixNode>,
}

impl RadixNode {
    fn new(segment: Cow<'static, str>) -> Self {
        Self {
            segment,
            route: None,
            param_name: None,
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    fn new_param(name: &str) -> Self {
        Self {
            segment: Cow::Borrowed(""),
            route: None,
            param_name: Some(Arc::from(name)),
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    /// Insert `route` at the end of `segments`, returning the operation it
    /// replaced if one was already registered there.
    fn insert(&mut self, segments: &[Segment], route: Arc<Operation>) -> Option<Arc<Operation>> {
        let Some((first, remaining)) = segments.split_first() else {
            return self.route.replace(route);
        };

        match first {
            Segment::Placeholder(name) => {
                if let Some(child) = self
                    .param_children
                    .iter_mut()
                    .find(|c| c.param_name.as_deref() == Some(name.as_str()))
                {
                    return child.insert(remaining, route);
                }
                let mut child = RadixNode::new_param(name);
                let replaced = child.insert(remaining, route);
                self.param_children.push(child);
                replaced
            }
            Segment::Literal(lit) => {
                if let Some(child) = self.children.iter_mut().find(|c| c.segment == lit.as_str()) {
                    return child.insert(remaining, route);
                }
                let mut child = RadixNode::new(Cow::Owned(lit.clone()));
                let replaced = child.insert(remaining, route);
                self.children.push(child);
                replaced
            }
        }
    }

    /// Remove any other placeholder branch that terminates at the same
    /// normalized template, so a re-registration under a different
    /// placeholder name replaces the earlier one instead of shadowing it.
    fn remove_shadowed(&mut self, segments: &[Segment], keep_names: &[&str]) -> Option<Arc<Operation>> {
        let Some((first, remaining)) = segments.split_first() else {
            return None;
        };
        match first {
            Segment::Literal(lit) => self
                .children
                .iter_mut()
                .find(|c| c.segment == lit.as_str())
                .and_then(|c| c.remove_shadowed(remaining, keep_names)),
            Segment::Placeholder(_) => {
                let (keep, rest) = keep_names.split_first()?;
                let mut removed = None;
                for child in &mut self.param_children {
                    let is_kept = child.param_name.as_deref() == Some(*keep);
                    if is_kept {
                        if let Some(r) = child.remove_shadowed(remaining, rest) {
                            removed = Some(r);
                        }
                    } else if let Some(r) = child.take_at(remaining) {
                        removed = Some(r);
                    }
                }
                removed
            }
        }
    }

    /// Take the route stored at `segments` below this node, matching
    /// placeholders by position regardless of name.
    fn take_at(&mut self, segments: &[Segment]) -> Option<Arc<Operation>> {
        let Some((first, remaining)) = segments.split_first() else {
            return self.route.take();
        };
        match first {
            Segment::Literal(lit) => self
                .children
                .iter_mut()
                .find(|c| c.segment == lit.as_str())
                .and_then(|c| c.take_at(remaining)),
            Segment::Placeholder(_) => {
                let mut removed = None;
                for child in &mut self.param_children {
                    if let Some(r) = child.take_at(remaining) {
                        removed = Some(r);
                    }
                }
                removed
            }
        }
    }

    fn search(&self, segments: &[&str], params: &mut ParamVec) -> Option<Arc<Operation>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.route.clone();
        };

        for child in &self.children {
            if child.segment == *segment {
                if let Some(route) = child.search(remaining, params) {
                    return Some(route);
                }
            }
        }

        for param_child in &self.param_children {
            if let Some(name) = &param_child.param_name {
                params.push((Arc::clone(name), decode_segment(segment)));
                if let Some(route) = param_child.search(remaining, params) {
                    return Some(route);
                }
                params.pop();
            }
        }

        None
    }
}

fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}

/// Matcher over every path template registered for one method.
#[derive(Clone, Debug)]
pub(crate) struct RadixMatcher {
    root: RadixNode,
}

impl RadixMatcher {
    pub(crate) fn new() -> Self {
        Self {
            root: RadixNode::new(Cow::Borrowed("")),
        }
    }

    /// Register an operation, returning the one it replaced (same
    /// normalized template) if any.
    pub(crate) fn insert(&mut self, route: Arc<Operation>) -> Option<Arc<Operation>> {
        let segments = route.path_template.segments().to_vec();
        let names: Vec<&str> = route.path_template.placeholders().collect();
        let shadowed = self.root.remove_shadowed(&segments, &names);
        let replaced = self.root.insert(&segments, route);
        replaced.or(shadowed)
    }

    /// Resolve already-split request segments, pushing captures to `params`.
    pub(crate) fn search(&self, segments: &[&str], params: &mut ParamVec) -> Option<Arc<Operation>> {
        self.root.search(segments, params)
    }

    /// Structural match only; captures are discarded.
    pub(crate) fn matches(&self, segments: &[&str]) -> bool {
        let mut scratch = ParamVec::new();
        self.root.search(segments, &mut scratch).is_some()
    }
}

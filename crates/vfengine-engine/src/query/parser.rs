//! Join predicate lists.
//!
//! A query is a comma separated list of directed predicates. `a->b` means
//! the value of `b` is a forward neighbor of the value of `a`. Whitespace
//! around attributes is ignored and empty entries are skipped, so
//! `"a->b, b->c,"` is two predicates.

use vfengine_common::Attribute;
use vfengine_core::PlanError;

/// One directed join predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPredicate {
    /// Edge source attribute.
    pub from: Attribute,
    /// Edge destination attribute.
    pub to: Attribute,
}

impl JoinPredicate {
    /// Returns `true` if the predicate connects `a` and `b` in either direction.
    #[must_use]
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// A parsed query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinQuery {
    predicates: Vec<JoinPredicate>,
}

impl JoinQuery {
    /// Parses `text`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Syntax`] for an entry that is not `x->y` with two
    /// non-empty, distinct attributes.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        let mut predicates = Vec::new();
        for fragment in text.split(',') {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                continue;
            }
            let syntax = || PlanError::Syntax {
                fragment: fragment.to_string(),
            };
            let (from, to) = fragment.split_once("->").ok_or_else(syntax)?;
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() || to.contains("->") || from == to {
                return Err(syntax());
            }
            if !is_attribute_name(from) || !is_attribute_name(to) {
                return Err(syntax());
            }
            predicates.push(JoinPredicate {
                from: Attribute::from(from),
                to: Attribute::from(to),
            });
        }
        Ok(Self { predicates })
    }

    /// Predicates in the order they were written.
    #[must_use]
    pub fn predicates(&self) -> &[JoinPredicate] {
        &self.predicates
    }

    /// Returns `true` if the query has no predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Every attribute mentioned, in order of first appearance.
    #[must_use]
    pub fn attributes(&self) -> Vec<Attribute> {
        let mut seen: Vec<Attribute> = Vec::new();
        for predicate in &self.predicates {
            for attribute in [&predicate.from, &predicate.to] {
                if !seen.contains(attribute) {
                    seen.push(attribute.clone());
                }
            }
        }
        seen
    }
}

fn is_attribute_name(name: &str) -> bool {
    name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

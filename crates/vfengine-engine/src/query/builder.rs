//! Logical plan construction.
//!
//! The column ordering decides the chain: the first column is scanned, and
//! every later column is joined from the first earlier column it shares a
//! predicate with. `a->b` read as `a` then `b` follows forward adjacency;
//! read as `b` then `a` it follows backward adjacency.

use vfengine_common::Attribute;
use vfengine_common::collections::{VfMap, vf_map};
use vfengine_common::utils::strings::{find_similar, format_suggestion};
use vfengine_core::plan::{
    JoinDirection, LogicalPipelineElement, OperatorKind, RelationType, SinkKind,
};
use vfengine_core::{LogicalPlan, PlanError};

use super::parser::JoinQuery;

/// Builds a [`LogicalPlan`] from a [`JoinQuery`] and a column ordering.
#[derive(Debug, Clone)]
pub struct LogicalPlanBuilder {
    query: JoinQuery,
    ordering: Vec<Attribute>,
    packed: bool,
    sink: SinkKind,
    cascade_selection: bool,
    relation_types: VfMap<Attribute, RelationType>,
    aliases: VfMap<Attribute, String>,
}

impl LogicalPlanBuilder {
    /// Starts a packed, counting plan.
    pub fn new<I, A>(query: JoinQuery, ordering: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Attribute>,
    {
        Self {
            query,
            ordering: ordering.into_iter().map(Into::into).collect(),
            packed: true,
            sink: SinkKind::Count,
            cascade_selection: false,
            relation_types: vf_map(),
            aliases: vf_map(),
        }
    }

    /// Selects packed or unpacked joins and sinks.
    #[must_use]
    pub fn packed(mut self, packed: bool) -> Self {
        self.packed = packed;
        self
    }

    /// Sets the sink family.
    #[must_use]
    pub fn sink(mut self, sink: SinkKind) -> Self {
        self.sink = sink;
        self
    }

    /// Inserts selection propagation in front of the sink. Only packed plans
    /// carry run-length offsets to propagate along, so unpacked plans ignore it.
    #[must_use]
    pub fn cascade_selection(mut self, enabled: bool) -> Self {
        self.cascade_selection = enabled;
        self
    }

    /// Declares the relation type of the join producing `attribute`.
    #[must_use]
    pub fn relation_type(
        mut self,
        attribute: impl Into<Attribute>,
        relation: RelationType,
    ) -> Self {
        self.relation_types.insert(attribute.into(), relation);
        self
    }

    /// Names the output column of `attribute`.
    #[must_use]
    pub fn alias(mut self, attribute: impl Into<Attribute>, name: impl Into<String>) -> Self {
        self.aliases.insert(attribute.into(), name.into());
        self
    }

    /// Validates the ordering against the query and emits the plan.
    ///
    /// # Errors
    ///
    /// - [`PlanError::EmptyPlan`] for an empty ordering
    /// - [`PlanError::DuplicateAttribute`] if the ordering repeats a column
    /// - [`PlanError::UnknownAttribute`] if the ordering names a column the
    ///   query does not mention
    /// - [`PlanError::UnorderedAttribute`] if the ordering leaves out a
    ///   column the query mentions
    /// - [`PlanError::CartesianProduct`] if a column shares no predicate with
    ///   any earlier column
    /// - [`PlanError::MissingSink`] for the minimum sink on an unpacked plan
    pub fn build(self) -> Result<LogicalPlan, PlanError> {
        self.validate_ordering()?;

        let mut elements = Vec::with_capacity(self.ordering.len() + 2);
        elements.push(LogicalPipelineElement::scan(self.ordering[0].clone()));
        for (position, attribute) in self.ordering.iter().enumerate().skip(1) {
            let (parent, direction) = self.parent_of(&self.ordering[..position], attribute)?;
            let relation = self.relation_types.get(attribute).copied().unwrap_or_default();
            elements.push(LogicalPipelineElement::join(
                self.packed,
                parent,
                attribute.clone(),
                direction,
                relation,
            ));
        }
        self.warn_unused_predicates(&elements);

        if self.cascade_selection && self.packed {
            elements.push(LogicalPipelineElement::terminal(OperatorKind::CascadeSelection));
        }
        let sink = self
            .sink
            .operator_kind(self.packed)
            .ok_or(PlanError::MissingSink)?;
        elements.push(LogicalPipelineElement::terminal(sink));

        let plan = LogicalPlan::new(elements, self.packed)?.with_aliases(self.aliases);
        tracing::debug!(
            steps = plan.elements().len(),
            packed = plan.is_packed(),
            "logical plan built"
        );
        Ok(plan)
    }

    fn validate_ordering(&self) -> Result<(), PlanError> {
        if self.ordering.is_empty() {
            return Err(PlanError::EmptyPlan);
        }
        let mentioned = self.query.attributes();
        for (position, attribute) in self.ordering.iter().enumerate() {
            if self.ordering[..position].contains(attribute) {
                return Err(PlanError::DuplicateAttribute {
                    attribute: attribute.to_string(),
                });
            }
            // A single column with no predicates is a plain scan.
            let lone_scan = mentioned.is_empty() && self.ordering.len() == 1;
            if !lone_scan && !mentioned.contains(attribute) {
                return Err(PlanError::UnknownAttribute {
                    attribute: attribute.to_string(),
                    suggestion: find_similar(attribute, &mentioned).map(format_suggestion),
                });
            }
        }
        if let Some(missing) = mentioned.iter().find(|a| !self.ordering.contains(a)) {
            return Err(PlanError::UnorderedAttribute {
                attribute: missing.to_string(),
            });
        }
        Ok(())
    }

    /// First earlier column sharing a predicate with `attribute`.
    fn parent_of(
        &self,
        earlier: &[Attribute],
        attribute: &Attribute,
    ) -> Result<(Attribute, JoinDirection), PlanError> {
        for candidate in earlier {
            for predicate in self.query.predicates() {
                if predicate.from == *candidate && predicate.to == *attribute {
                    return Ok((candidate.clone(), JoinDirection::Forward));
                }
                if predicate.to == *candidate && predicate.from == *attribute {
                    return Ok((candidate.clone(), JoinDirection::Backward));
                }
            }
        }
        Err(PlanError::CartesianProduct {
            attribute: attribute.to_string(),
        })
    }

    /// Predicates between two columns that are not parent and child are not
    /// evaluated by any join.
    fn warn_unused_predicates(&self, elements: &[LogicalPipelineElement]) {
        for predicate in self.query.predicates() {
            let used = elements
                .iter()
                .filter_map(LogicalPipelineElement::join_columns)
                .any(|(input, output)| predicate.connects(input, output));
            if !used {
                tracing::warn!(
                    from = %predicate.from,
                    to = %predicate.to,
                    "join predicate is not evaluated by the chosen ordering"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfengine_core::plan::SchemaType;

    fn builder(query: &str, ordering: &[&str]) -> LogicalPlanBuilder {
        LogicalPlanBuilder::new(JoinQuery::parse(query).unwrap(), ordering.iter().copied())
    }

    #[test]
    fn test_chain_plan() {
        let plan = builder("a->b,b->c", &["a", "b", "c"]).build().unwrap();
        let kinds: Vec<_> = plan.elements().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperatorKind::Scan,
                OperatorKind::IndexNestedLoopJoinPacked,
                OperatorKind::IndexNestedLoopJoinPacked,
                OperatorKind::SinkPacked,
            ]
        );
        let (input, output) = plan.elements()[2].join_columns().unwrap();
        assert_eq!((input.as_str(), output.as_str()), ("b", "c"));
        assert_eq!(plan.elements()[2].direction, JoinDirection::Forward);
        assert_eq!(
            plan.schema(),
            &[
                (Attribute::from("a"), SchemaType::Flat),
                (Attribute::from("b"), SchemaType::Flat),
                (Attribute::from("c"), SchemaType::Unflat),
            ]
        );
    }

    #[test]
    fn test_reverse_ordering_uses_backward_adjacency() {
        let plan = builder("a->b", &["b", "a"]).build().unwrap();
        assert_eq!(plan.root(), "b");
        assert_eq!(plan.elements()[1].direction, JoinDirection::Backward);
    }

    #[test]
    fn test_first_earlier_column_is_parent() {
        let plan = builder("a->b,a->c,b->c", &["a", "b", "c"])
            .packed(false)
            .build()
            .unwrap();
        let (input, _) = plan.elements()[2].join_columns().unwrap();
        assert_eq!(input, "a");
        assert_eq!(plan.elements()[2].kind, OperatorKind::IndexNestedLoopJoin);
        assert_eq!(plan.sink_kind(), OperatorKind::Sink);
    }

    #[test]
    fn test_cartesian_product() {
        let err = builder("a->b,c->d", &["a", "b", "c", "d"]).build().unwrap_err();
        assert_eq!(
            err,
            PlanError::CartesianProduct {
                attribute: "c".into()
            }
        );
    }

    #[test]
    fn test_unknown_attribute_suggests() {
        let err = builder("a->b,b->cat", &["a", "b", "cab"]).build().unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownAttribute {
                attribute: "cab".into(),
                suggestion: Some("Did you mean 'cat'?".into()),
            }
        );
    }

    #[test]
    fn test_ordering_errors() {
        assert_eq!(builder("a->b", &[]).build().unwrap_err(), PlanError::EmptyPlan);
        assert_eq!(
            builder("a->b", &["a"]).build().unwrap_err(),
            PlanError::UnorderedAttribute {
                attribute: "b".into()
            }
        );
        assert_eq!(
            builder("a->b", &["a", "b", "a"]).build().unwrap_err(),
            PlanError::DuplicateAttribute {
                attribute: "a".into()
            }
        );
    }

    #[test]
    fn test_lone_scan() {
        let plan = builder("", &["a"]).build().unwrap();
        assert_eq!(plan.elements().len(), 2);
        assert_eq!(plan.sink_kind(), OperatorKind::SinkPacked);
    }

    #[test]
    fn test_sink_and_cascade() {
        let plan = builder("a->b", &["a", "b"])
            .sink(SinkKind::Min)
            .cascade_selection(true)
            .build()
            .unwrap();
        let kinds: Vec<_> = plan.elements().iter().map(|e| e.kind).collect();
        assert_eq!(
            &kinds[2..],
            &[OperatorKind::CascadeSelection, OperatorKind::SinkPackedMin]
        );

        let plan = builder("a->b", &["a", "b"])
            .packed(false)
            .cascade_selection(true)
            .build()
            .unwrap();
        assert_eq!(plan.elements().len(), 3);

        let err = builder("a->b", &["a", "b"])
            .packed(false)
            .sink(SinkKind::Min)
            .build()
            .unwrap_err();
        assert_eq!(err, PlanError::MissingSink);
    }

    #[test]
    fn test_relation_types_and_aliases() {
        let plan = builder("a->b", &["a", "b"])
            .relation_type("b", RelationType::ManyToOne)
            .alias("b", "person")
            .build()
            .unwrap();
        assert_eq!(plan.elements()[1].relation_type, RelationType::ManyToOne);
        assert_eq!(plan.alias("b"), "person");
        assert_eq!(plan.alias("a"), "a");
    }
}

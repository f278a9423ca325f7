//! Logical pipeline elements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vfengine_common::Attribute;
use vfengine_common::collections::{VfMap, VfSet, vf_map, vf_set};

use super::PlanError;
use crate::graph::Direction;

/// Physical operator a pipeline step is executed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    /// Produces windows of node ids.
    Scan,
    /// Row-exploding join.
    IndexNestedLoopJoin,
    /// Factorized join with run-length offsets.
    IndexNestedLoopJoinPacked,
    /// Propagates selection masks towards the root.
    CascadeSelection,
    /// Counts exploded rows.
    Sink,
    /// Counts factorized rows.
    SinkPacked,
    /// Tracks the minimum id per attribute.
    SinkPackedMin,
    /// Consumes batches without accumulating anything.
    SinkNoOp,
}

impl OperatorKind {
    /// Returns `true` for the two join kinds.
    #[must_use]
    pub fn is_join(self) -> bool {
        matches!(self, Self::IndexNestedLoopJoin | Self::IndexNestedLoopJoinPacked)
    }

    /// Returns `true` for the sink family.
    #[must_use]
    pub fn is_sink(self) -> bool {
        matches!(
            self,
            Self::Sink | Self::SinkPacked | Self::SinkPackedMin | Self::SinkNoOp
        )
    }
}

/// Which way a join predicate is followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinDirection {
    /// The predicate is written `parent->child`.
    Forward,
    /// The predicate is written `child->parent`.
    Backward,
    /// No predicate, used by scans.
    Any,
}

impl JoinDirection {
    /// Adjacency to read. `Any` reads forward lists.
    #[must_use]
    pub fn adjacency(self) -> Direction {
        match self {
            Self::Backward => Direction::Backward,
            Self::Forward | Self::Any => Direction::Forward,
        }
    }
}

/// Cardinality of a join predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RelationType {
    /// 1:1
    OneToOne,
    /// 1:N
    OneToMany,
    /// N:1
    ManyToOne,
    /// N:N
    #[default]
    ManyToMany,
}

impl RelationType {
    /// Returns `true` if every input row has at most one neighbor when the
    /// relation is followed in `direction`.
    ///
    /// Joins over such relations never multiply rows, so an unpacked join can
    /// write its output in place of the input rows and share their state.
    #[must_use]
    pub fn is_functional(self, direction: Direction) -> bool {
        match self {
            Self::OneToOne => true,
            Self::ManyToOne => direction == Direction::Forward,
            Self::OneToMany => direction == Direction::Backward,
            Self::ManyToMany => false,
        }
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1:1" | "one_to_one" => Ok(Self::OneToOne),
            "1:n" | "one_to_many" => Ok(Self::OneToMany),
            "n:1" | "many_to_one" => Ok(Self::ManyToOne),
            "n:n" | "n:m" | "many_to_many" => Ok(Self::ManyToMany),
            other => Err(format!("unknown relation type '{other}'")),
        }
    }
}

/// Whether a column is held at a fixed position while its descendants are
/// enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaType {
    /// Some later column is fetched from it.
    Flat,
    /// Nothing is fetched from it.
    Unflat,
}

/// Terminal operator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Count result rows.
    #[default]
    Count,
    /// Track the minimum id per attribute letter.
    Min,
    /// Accumulate nothing.
    NoOp,
}

impl SinkKind {
    /// Operator implementing this sink in packed or unpacked pipelines.
    ///
    /// There is no unpacked minimum sink.
    #[must_use]
    pub fn operator_kind(self, packed: bool) -> Option<OperatorKind> {
        match (self, packed) {
            (Self::Count, true) => Some(OperatorKind::SinkPacked),
            (Self::Count, false) => Some(OperatorKind::Sink),
            (Self::Min, true) => Some(OperatorKind::SinkPackedMin),
            (Self::Min, false) => None,
            (Self::NoOp, _) => Some(OperatorKind::SinkNoOp),
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Count => "count",
            Self::Min => "min",
            Self::NoOp => "noop",
        })
    }
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "min" => Ok(Self::Min),
            "noop" | "no-op" | "no_op" => Ok(Self::NoOp),
            other => Err(format!("unknown sink '{other}'")),
        }
    }
}

/// One step of a logical pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalPipelineElement {
    /// Operator executing the step.
    pub kind: OperatorKind,
    /// Scanned attribute, or the join input.
    pub first_col: Option<Attribute>,
    /// Join output.
    pub second_col: Option<Attribute>,
    /// Adjacency followed by a join.
    pub direction: JoinDirection,
    /// Cardinality of the join predicate.
    pub relation_type: RelationType,
}

impl LogicalPipelineElement {
    /// A scan over `attribute`.
    #[must_use]
    pub fn scan(attribute: Attribute) -> Self {
        Self {
            kind: OperatorKind::Scan,
            first_col: Some(attribute),
            second_col: None,
            direction: JoinDirection::Any,
            relation_type: RelationType::ManyToMany,
        }
    }

    /// A join fetching `output` from `input`.
    #[must_use]
    pub fn join(
        packed: bool,
        input: Attribute,
        output: Attribute,
        direction: JoinDirection,
        relation_type: RelationType,
    ) -> Self {
        Self {
            kind: if packed {
                OperatorKind::IndexNestedLoopJoinPacked
            } else {
                OperatorKind::IndexNestedLoopJoin
            },
            first_col: Some(input),
            second_col: Some(output),
            direction,
            relation_type,
        }
    }

    /// A step without columns (selection propagation or a sink).
    #[must_use]
    pub fn terminal(kind: OperatorKind) -> Self {
        Self {
            kind,
            first_col: None,
            second_col: None,
            direction: JoinDirection::Any,
            relation_type: RelationType::ManyToMany,
        }
    }

    /// `(input, output)` of a join step.
    #[must_use]
    pub fn join_columns(&self) -> Option<(&Attribute, &Attribute)> {
        match (&self.first_col, &self.second_col) {
            (Some(input), Some(output)) if self.kind.is_join() => Some((input, output)),
            _ => None,
        }
    }
}

/// An ordered, validated pipeline description.
#[derive(Debug, Clone)]
pub struct LogicalPlan {
    elements: Vec<LogicalPipelineElement>,
    packed: bool,
    aliases: VfMap<Attribute, String>,
    schema: Vec<(Attribute, SchemaType)>,
}

impl LogicalPlan {
    /// Validates and wraps `elements`.
    ///
    /// # Errors
    ///
    /// Fails if the plan is empty, does not start with a scan or end with a
    /// sink, joins from an attribute that was not produced earlier, or
    /// produces an attribute twice.
    pub fn new(elements: Vec<LogicalPipelineElement>, packed: bool) -> Result<Self, PlanError> {
        let first = elements.first().ok_or(PlanError::EmptyPlan)?;
        let root = match (first.kind, &first.first_col) {
            (OperatorKind::Scan, Some(attribute)) => attribute.clone(),
            _ => return Err(PlanError::MissingScan),
        };
        if !elements.last().is_some_and(|e| e.kind.is_sink()) || elements.len() < 2 {
            return Err(PlanError::MissingSink);
        }

        let mut placed: VfSet<Attribute> = vf_set();
        placed.insert(root);
        for element in &elements[1..] {
            if element.kind == OperatorKind::Scan {
                return Err(PlanError::MissingScan);
            }
            if let Some((input, output)) = element.join_columns() {
                if !placed.contains(input) {
                    return Err(PlanError::CartesianProduct {
                        attribute: output.to_string(),
                    });
                }
                if !placed.insert(output.clone()) {
                    return Err(PlanError::DuplicateAttribute {
                        attribute: output.to_string(),
                    });
                }
            }
        }

        let schema = Self::derive_schema(&elements);
        Ok(Self {
            elements,
            packed,
            aliases: vf_map(),
            schema,
        })
    }

    /// Attaches output column names for attributes.
    #[must_use]
    pub fn with_aliases(mut self, aliases: VfMap<Attribute, String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// A column is flat if some later join reads from it.
    fn derive_schema(elements: &[LogicalPipelineElement]) -> Vec<(Attribute, SchemaType)> {
        let mut schema: Vec<(Attribute, SchemaType)> = Vec::new();
        for element in elements {
            let produced = match element.kind {
                OperatorKind::Scan => element.first_col.as_ref(),
                _ => element.join_columns().map(|(_, output)| output),
            };
            if let Some((input, _)) = element.join_columns() {
                if let Some(entry) = schema.iter_mut().find(|(a, _)| a == input) {
                    entry.1 = SchemaType::Flat;
                }
            }
            if let Some(attribute) = produced {
                schema.push((attribute.clone(), SchemaType::Unflat));
            }
        }
        schema
    }

    /// Steps in chain order.
    #[must_use]
    pub fn elements(&self) -> &[LogicalPipelineElement] {
        &self.elements
    }

    /// Returns `true` for factorized pipelines.
    #[must_use]
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// Scanned attribute.
    #[must_use]
    pub fn root(&self) -> &Attribute {
        // `new` rejects plans that do not start with a scan.
        &self.schema[0].0
    }

    /// Kind of the terminal step.
    #[must_use]
    pub fn sink_kind(&self) -> OperatorKind {
        self.elements[self.elements.len() - 1].kind
    }

    /// Output name of `attribute`, the attribute itself if it has no alias.
    #[must_use]
    pub fn alias<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.aliases.get(attribute).map_or(attribute, String::as_str)
    }

    /// Flat/unflat classification of every produced column, in order.
    #[must_use]
    pub fn schema(&self) -> &[(Attribute, SchemaType)] {
        &self.schema
    }

    /// Produced attributes in order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.schema.iter().map(|(a, _)| a)
    }
}

//! kasuari integration for the scene
//!
//! Every view gets four base variables (x, y, width, height). Edges and
//! centers are derived expressions over them, so a request naming `right`
//! becomes `x + width` in the solver.

use std::collections::HashMap;

use kasuari::{
    AddConstraintError, Constraint, Expression, Solver as KasuariSolver, Strength,
    Variable as KasuariVariable, WeightedRelation::*,
};
use thiserror::Error;

use crate::attribute::{Priority, Relation};
use crate::platform::{ConstraintRequest, EngineError, NativeAttribute, ViewId};

/// Base properties that own a solver variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutProperty {
    X,
    Y,
    Width,
    Height,
}

impl LayoutProperty {
    pub const ALL: [LayoutProperty; 4] = [Self::X, Self::Y, Self::Width, Self::Height];
}

/// Strength of the stays pulling an unconstrained size to zero
const SIZE_STAY: Strength = Strength::WEAK;
/// Position stays give way to size stays, so a view pinned by one edge keeps
/// a zero size and slides instead of stretching.
const POSITION_STAY: Strength = Strength::new(0.5);

/// Errors from the constraint solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("unsatisfiable constraint {description}: conflicts with existing required constraints")]
    Unsatisfiable { description: String },

    #[error("duplicate constraint {description}")]
    Duplicate { description: String },

    #[error("internal solver error for {description}: {reason}")]
    Internal { description: String, reason: String },
}

impl From<SolverError> for EngineError {
    fn from(e: SolverError) -> Self {
        let reason = match &e {
            SolverError::Unsatisfiable { .. } => "unsatisfiable".to_string(),
            SolverError::Duplicate { .. } => "duplicate".to_string(),
            SolverError::Internal { reason, .. } => reason.clone(),
        };
        let description = match e {
            SolverError::Unsatisfiable { description }
            | SolverError::Duplicate { description }
            | SolverError::Internal { description, .. } => description,
        };
        EngineError::Rejected {
            description,
            reason,
        }
    }
}

/// Wrapper around the kasuari solver
pub struct LayoutSolver {
    solver: KasuariSolver,
    variables: HashMap<(ViewId, LayoutProperty), KasuariVariable>,
    stays: HashMap<ViewId, Vec<Constraint>>,
}

impl LayoutSolver {
    pub fn new() -> Self {
        Self {
            solver: KasuariSolver::new(),
            variables: HashMap::new(),
            stays: HashMap::new(),
        }
    }

    fn variable(&mut self, view: ViewId, property: LayoutProperty) -> KasuariVariable {
        *self
            .variables
            .entry((view, property))
            .or_insert_with(KasuariVariable::new)
    }

    /// Expression for a native attribute of `view`
    pub fn expression(&mut self, view: ViewId, attribute: NativeAttribute) -> Expression {
        let x = self.variable(view, LayoutProperty::X);
        let y = self.variable(view, LayoutProperty::Y);
        let width = self.variable(view, LayoutProperty::Width);
        let height = self.variable(view, LayoutProperty::Height);
        match attribute {
            NativeAttribute::Left => x.into(),
            NativeAttribute::Top => y.into(),
            NativeAttribute::Width => width.into(),
            NativeAttribute::Height => height.into(),
            NativeAttribute::Right => x + width,
            NativeAttribute::Bottom => y + height,
            // center = origin + size / 2
            NativeAttribute::CenterX => x + width * 0.5,
            NativeAttribute::CenterY => y + height * 0.5,
        }
    }

    /// Build (but do not add) the kasuari constraint for a request.
    pub fn build(&mut self, request: &ConstraintRequest) -> Constraint {
        let lhs = self.expression(request.first, request.first_attribute);
        let rhs = match request.second {
            Some((view, attribute)) => {
                self.expression(view, attribute) * request.multiplier + request.constant
            }
            None => Expression::from(request.constant),
        };
        let strength = strength(request.priority);
        match request.relation {
            Relation::Equal => lhs | EQ(strength) | rhs,
            Relation::LessOrEqual => lhs | LE(strength) | rhs,
            Relation::GreaterOrEqual => lhs | GE(strength) | rhs,
        }
    }

    pub fn add(&mut self, constraint: &Constraint, description: &str) -> Result<(), SolverError> {
        self.solver
            .add_constraint(constraint.clone())
            .map_err(|e| match e {
                AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable {
                    description: description.to_string(),
                },
                AddConstraintError::DuplicateConstraint => SolverError::Duplicate {
                    description: description.to_string(),
                },
                AddConstraintError::InternalSolverError(reason) => SolverError::Internal {
                    description: description.to_string(),
                    reason: format!("{:?}", reason),
                },
            })
    }

    /// Drop a constraint; constraints the solver does not know are ignored.
    pub fn remove(&mut self, constraint: &Constraint) {
        if self.solver.remove_constraint(constraint).is_err() {
            log::trace!("solver did not hold the constraint being removed");
        }
    }

    /// Give `view` weak stays so unconstrained variables settle at zero.
    pub fn add_stays(&mut self, view: ViewId) {
        let mut stays = Vec::with_capacity(LayoutProperty::ALL.len());
        for property in LayoutProperty::ALL {
            let variable = self.variable(view, property);
            let strength = match property {
                LayoutProperty::X | LayoutProperty::Y => POSITION_STAY,
                LayoutProperty::Width | LayoutProperty::Height => SIZE_STAY,
            };
            let stay: Constraint = variable | EQ(strength) | 0.0;
            match self.solver.add_constraint(stay.clone()) {
                Ok(()) => stays.push(stay),
                Err(e) => log::warn!("stay for {} rejected: {}", view, e),
            }
        }
        self.stays.insert(view, stays);
    }

    /// Remove a view's stays and forget its variables.
    pub fn forget(&mut self, view: ViewId) {
        for stay in self.stays.remove(&view).unwrap_or_default() {
            self.remove(&stay);
        }
        self.variables.retain(|(owner, _), _| *owner != view);
    }

    /// Current value of a base property. Views the solver never saw read as 0.
    pub fn value(&self, view: ViewId, property: LayoutProperty) -> f64 {
        self.variables
            .get(&(view, property))
            .map(|variable| self.solver.get_value(*variable))
            .unwrap_or(0.0)
    }
}

impl Default for LayoutSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a priority onto the kasuari strength scale.
///
/// Non-required priorities land in the medium band, so they always beat stays
/// and always lose to required constraints.
pub fn strength(priority: Priority) -> Strength {
    let value = match priority {
        Priority::Required => return Strength::REQUIRED,
        Priority::High => 750.0,
        Priority::Low => 250.0,
        Priority::Custom(value) if value >= 1000.0 => return Strength::REQUIRED,
        Priority::Custom(value) => value,
    };
    Strength::create(0.0, value, 0.0, 1.0)
}

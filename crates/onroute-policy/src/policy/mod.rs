//! Permit application validation against versioned, declarative rule-sets.
//!
//! A [`Policy`] owns a [`PolicyDefinition`] and evaluates its common rules
//! plus the rules of the application's permit type, using the operators of
//! an [`OperatorSet`]. Fired events are sorted into a [`ValidationResult`].

pub mod application;
pub mod dates;
pub mod definition;
pub mod engine;
pub mod facts;
pub mod helpers;
pub mod operators;
pub mod result;
pub mod rules;
mod service;

#[cfg(test)]
mod tests;

pub use application::{
    ContactDetails, MailingAddress, PermitApplication, PermitData, VehicleDetails,
};
pub use dates::{Clock, FixedClock, InvalidDateFormat, PermitDateFormat, SystemClock};
pub use definition::{
    IdentifiedObject, PermitTypeDefinition, PolicyDefinition, VehicleCategories, VehicleTypes,
};
pub use engine::{
    EngineOptions, EngineRun, EvaluationError, RuleEngine, RuleEvaluator, RuleFailure,
};
pub use facts::{transform_permit_document, transform_permit_facts, FactMap};
pub use helpers::IdMap;
pub use operators::{builtin_operators, custom_operators, Operator, OperatorSet, RegexMatch};
pub use result::{EventKind, ValidationResult};
pub use rules::{Comparison, Condition, ConditionValue, FactReference, Rule, RuleEvent};
pub use service::{PermittableVehicles, Policy, PolicyError, INVALID_PERMIT_TYPE_CODE};

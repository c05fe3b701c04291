use std::cmp::Reverse;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tracing::warn;

use super::facts::FactMap;
use super::operators::OperatorSet;
use super::rules::{Comparison, Condition, ConditionValue, Rule, RuleEvent};

/// Error confined to a single rule; the rule is reported as not fired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("operator '{0}' is not registered")]
    UnknownOperator(String),
    #[error("fact '{0}' is not defined")]
    UndefinedFact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub rule: String,
    pub error: EvaluationError,
}

/// Events fired during one evaluation, in firing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineRun {
    pub events: Vec<RuleEvent>,
    pub failures: Vec<RuleFailure>,
}

/// Capability to evaluate rule-sets against facts.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    async fn evaluate(&self, facts: &FactMap, rule_sets: &[&[Rule]]) -> EngineRun;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Resolve unknown fact names to `null` instead of failing the rule.
    pub allow_undefined_facts: bool,
}

/// Condition-tree evaluator over a fixed operator set.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    operators: OperatorSet,
    options: EngineOptions,
}

impl RuleEngine {
    pub fn new(operators: OperatorSet) -> Self {
        Self {
            operators,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn operators(&self) -> &OperatorSet {
        &self.operators
    }

    pub async fn run_rule(&self, facts: &FactMap, rule: &Rule) -> Result<bool, EvaluationError> {
        self.check(facts, &rule.conditions).await
    }

    fn check<'a>(
        &'a self,
        facts: &'a FactMap,
        condition: &'a Condition,
    ) -> BoxFuture<'a, Result<bool, EvaluationError>> {
        async move {
            match condition {
                Condition::All { all } => {
                    for child in all {
                        if !self.check(facts, child).await? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Condition::Any { any } => {
                    for child in any {
                        if self.check(facts, child).await? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                Condition::Not { not } => Ok(!self.check(facts, not).await?),
                Condition::Comparison(comparison) => self.compare(facts, comparison).await,
            }
        }
        .boxed()
    }

    async fn compare(
        &self,
        facts: &FactMap,
        comparison: &Comparison,
    ) -> Result<bool, EvaluationError> {
        let operator = self
            .operators
            .get(&comparison.operator)
            .ok_or_else(|| EvaluationError::UnknownOperator(comparison.operator.clone()))?;

        let fact = self.fact_value(facts, &comparison.fact, comparison.path.as_deref())?;
        let value = match &comparison.value {
            ConditionValue::Literal(value) => value.clone(),
            ConditionValue::Fact(reference) => {
                self.fact_value(facts, &reference.fact, reference.path.as_deref())?
            }
        };

        if !operator.accepts(&fact) {
            return Ok(false);
        }

        Ok(operator.evaluate(&fact, &value).await)
    }

    fn fact_value(
        &self,
        facts: &FactMap,
        name: &str,
        path: Option<&str>,
    ) -> Result<Value, EvaluationError> {
        match facts.resolve(name, path) {
            Some(value) => Ok(value),
            None if self.options.allow_undefined_facts => Ok(Value::Null),
            None => Err(EvaluationError::UndefinedFact(name.to_string())),
        }
    }
}

#[async_trait]
impl RuleEvaluator for RuleEngine {
    async fn evaluate(&self, facts: &FactMap, rule_sets: &[&[Rule]]) -> EngineRun {
        let mut rules: Vec<&Rule> = rule_sets.iter().copied().flatten().collect();
        rules.sort_by_key(|rule| Reverse(rule.priority()));

        let mut run = EngineRun::default();
        for rule in rules {
            match self.run_rule(facts, rule).await {
                Ok(true) => run.events.push(rule.event.clone()),
                Ok(false) => {}
                Err(error) => {
                    warn!(rule = %rule.label(), %error, "skipping rule that failed to evaluate");
                    run.failures.push(RuleFailure {
                        rule: rule.label(),
                        error,
                    });
                }
            }
        }
        run
    }
}

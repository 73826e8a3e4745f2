//! Caller-supplied policy overrides
//!
//! [`PolicyOverrides`] bundles everything a caller can tune: the policy
//! registry, repository customizations and extra model mutations. Extra
//! mutations run after the built-in policy steps, ordered by stage and then
//! by name, and only for the service they are scoped to.

use super::{apply_policy, PolicyRegistry, ProtocolPolicy};
use crate::customization::Customizations;
use apigen_common::{Result, ServiceModel};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Model mutation signature shared by all overrides
pub type OverrideFn = dyn Fn(&mut ServiceModel, &ProtocolPolicy) -> Result<()> + Send + Sync;

/// When an override runs relative to the others
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum OverrideStage {
    /// Before any other override
    Early,
    #[default]
    Normal,
    /// After every other override
    Late,
}

/// A named model mutation, optionally scoped to one service
#[derive(Clone)]
pub struct ModelOverride {
    pub name: String,
    pub stage: OverrideStage,
    /// Service key this override is limited to; `None` applies everywhere
    pub service: Option<String>,
    apply: Arc<OverrideFn>,
}

impl ModelOverride {
    pub fn new(
        name: impl Into<String>,
        apply: impl Fn(&mut ServiceModel, &ProtocolPolicy) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            stage: OverrideStage::Normal,
            service: None,
            apply: Arc::new(apply),
        }
    }

    pub fn at_stage(mut self, stage: OverrideStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn for_service(mut self, service: &str) -> Self {
        self.service = Some(super::service_key(service));
        self
    }

    /// Whether this override applies to a service
    pub fn applies_to(&self, service: &str) -> bool {
        self.service
            .as_deref()
            .map_or(true, |scoped| scoped == super::service_key(service))
    }

    pub fn apply(&self, model: &mut ServiceModel, policy: &ProtocolPolicy) -> Result<()> {
        (self.apply)(model, policy)
    }
}

impl fmt::Debug for ModelOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOverride")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

/// Everything a caller can tune about a transformation
#[derive(Debug, Clone)]
pub struct PolicyOverrides {
    pub registry: PolicyRegistry,
    pub customizations: Customizations,
    overrides: Vec<ModelOverride>,
}

impl Default for PolicyOverrides {
    fn default() -> Self {
        Self {
            registry: PolicyRegistry::builtin(),
            customizations: Customizations::default(),
            overrides: Vec::new(),
        }
    }
}

impl PolicyOverrides {
    /// Built-in policies, no customizations and no extra overrides
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: PolicyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_customizations(mut self, customizations: Customizations) -> Self {
        self.customizations = customizations;
        self
    }

    pub fn with_override(mut self, model_override: ModelOverride) -> Self {
        self.overrides.push(model_override);
        self
    }

    /// Extra overrides in the order they will run
    pub fn ordered(&self) -> Vec<&ModelOverride> {
        let mut ordered: Vec<&ModelOverride> = self.overrides.iter().collect();
        ordered.sort_by(|a, b| (a.stage, &a.name).cmp(&(b.stage, &b.name)));
        ordered
    }

    /// Apply the built-in policy steps, then every override scoped to `service`
    pub fn apply(
        &self,
        model: &mut ServiceModel,
        policy: &ProtocolPolicy,
        service: &str,
    ) -> Result<()> {
        apply_policy(model, policy)?;

        for model_override in self.ordered() {
            if !model_override.applies_to(service) {
                continue;
            }
            debug!(name = %model_override.name, stage = ?model_override.stage, "applying override");
            model_override.apply(model, policy)?;
        }
        Ok(())
    }
}

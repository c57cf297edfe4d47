//! # Module Services
//!
//! Profils des services hébergés : champs, actions publiées dans le SCPD,
//! table des variables d'état et traitement des actions de contrôle.
//!
//! Le typage des arguments n'est pas vérifié ici : chaque gestionnaire
//! d'action reçoit les arguments bruts et reste seul juge de leur validité.

use std::collections::HashMap;
use std::fmt;

use crate::fields::ServiceField;
use crate::soap::{SoapAction, SoapFault};

/// Résultat d'une action : arguments de sortie, ou fault SOAP
pub type ActionResult = Result<Vec<(String, String)>, SoapFault>;

/// Gestionnaire d'une action de [`BasicService`]
pub type ActionHandler = Box<dyn Fn(&SoapAction) -> ActionResult + Send + Sync>;

/// Comportement propre à un service concret.
pub trait ServiceProfile: Send + Sync {
    /// Valeur surchargée d'un champ, `None` pour la valeur par défaut
    fn field(&self, field: ServiceField) -> Option<String>;

    /// Actions publiées dans `actionList`
    fn actions(&self) -> &[ActionDescriptor] {
        &[]
    }

    /// Variables publiées dans `serviceStateTable`
    fn state_variables(&self) -> &[StateVariableDescriptor] {
        &[]
    }

    /// Traite une action reçue sur l'URL de contrôle
    fn handle_action(&self, action: &SoapAction) -> ActionResult {
        Err(SoapFault::invalid_action(&action.name))
    }
}

/// Sens d'un argument d'action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentDirection {
    In,
    Out,
}

impl ArgumentDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentDirection::In => "in",
            ArgumentDirection::Out => "out",
        }
    }
}

/// Argument d'une action (`argumentList/argument`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub direction: ArgumentDirection,
    pub related_state_variable: String,
}

/// Action d'un service (`actionList/action`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub name: String,
    pub arguments: Vec<ArgumentDescriptor>,
}

impl ActionDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: Vec::new(),
        }
    }

    pub fn with_in(self, name: &str, related_state_variable: &str) -> Self {
        self.with_argument(name, ArgumentDirection::In, related_state_variable)
    }

    pub fn with_out(self, name: &str, related_state_variable: &str) -> Self {
        self.with_argument(name, ArgumentDirection::Out, related_state_variable)
    }

    fn with_argument(
        mut self,
        name: &str,
        direction: ArgumentDirection,
        related_state_variable: &str,
    ) -> Self {
        self.arguments.push(ArgumentDescriptor {
            name: name.to_string(),
            direction,
            related_state_variable: related_state_variable.to_string(),
        });
        self
    }
}

/// Variable d'état (`serviceStateTable/stateVariable`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVariableDescriptor {
    pub name: String,
    pub data_type: String,
    pub send_events: bool,
    pub default_value: Option<String>,
    pub allowed_values: Vec<String>,
}

impl StateVariableDescriptor {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            send_events: false,
            default_value: None,
            allowed_values: Vec::new(),
        }
    }

    pub fn evented(mut self) -> Self {
        self.send_events = true;
        self
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    pub fn with_allowed_values(mut self, values: &[&str]) -> Self {
        self.allowed_values = values.iter().map(|v| v.to_string()).collect();
        self
    }
}

/// Service générique : champs, descripteurs et gestionnaires fournis à la construction.
#[derive(Default)]
pub struct BasicService {
    fields: HashMap<ServiceField, String>,
    actions: Vec<ActionDescriptor>,
    state_variables: Vec<StateVariableDescriptor>,
    handlers: HashMap<String, ActionHandler>,
}

impl BasicService {
    pub fn new(type_name: &str, version: u32) -> Self {
        Self::default()
            .with_field(ServiceField::Type, type_name)
            .with_field(ServiceField::Version, version.to_string())
    }

    pub fn with_field(mut self, field: ServiceField, value: impl Into<String>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn with_domain(self, domain: &str) -> Self {
        self.with_field(ServiceField::Domain, domain)
    }

    /// Publie une action et enregistre son gestionnaire
    pub fn with_action<F>(mut self, action: ActionDescriptor, handler: F) -> Self
    where
        F: Fn(&SoapAction) -> ActionResult + Send + Sync + 'static,
    {
        self.handlers.insert(action.name.clone(), Box::new(handler));
        self.actions.push(action);
        self
    }

    pub fn with_state_variable(mut self, variable: StateVariableDescriptor) -> Self {
        self.state_variables.push(variable);
        self
    }
}

impl fmt::Debug for BasicService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicService")
            .field("fields", &self.fields)
            .field("actions", &self.actions)
            .field("state_variables", &self.state_variables)
            .finish()
    }
}

impl ServiceProfile for BasicService {
    fn field(&self, field: ServiceField) -> Option<String> {
        self.fields.get(&field).cloned()
    }

    fn actions(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    fn state_variables(&self) -> &[StateVariableDescriptor] {
        &self.state_variables
    }

    fn handle_action(&self, action: &SoapAction) -> ActionResult {
        match self.handlers.get(&action.name) {
            Some(handler) => handler(action),
            None => Err(SoapFault::invalid_action(&action.name)),
        }
    }
}

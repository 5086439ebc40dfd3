use super::error::TaskError;
use crate::core::models::dataset::PhysicalPropertyDataSet;
use crate::core::models::ids::{PropertyId, RequestId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Running,
    Complete,
    Errored,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Errored)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Errored => "errored",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoApplicableLayer,
    SimulationFailed,
    InvalidOutput,
    WorkerFault,
    BackendShutdown,
}

impl From<&TaskError> for FailureKind {
    fn from(error: &TaskError) -> Self {
        match error {
            TaskError::SimulationFailed(_) => Self::SimulationFailed,
            TaskError::InvalidOutput(_) => Self::InvalidOutput,
            TaskError::WorkerFault(_) => Self::WorkerFault,
            TaskError::BackendShutdown => Self::BackendShutdown,
        }
    }
}

/// Why one property of a request could not be estimated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFailure {
    pub property_id: PropertyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

impl PropertyFailure {
    pub fn no_applicable_layer(property_id: PropertyId, property_type: &str) -> Self {
        Self {
            property_id,
            layer: None,
            kind: FailureKind::NoApplicableLayer,
            message: format!(
                "no calculation layer with a schema for '{}' is available",
                property_type
            ),
        }
    }

    pub fn from_task_error(property_id: PropertyId, layer: &str, error: &TaskError) -> Self {
        Self {
            property_id,
            layer: Some(layer.to_string()),
            kind: error.into(),
            message: error.to_string(),
        }
    }
}

/// The outcome of an estimation request, in the layout of a result document.
///
/// Entries in every list follow the order of the submitted dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    pub estimated_properties: PhysicalPropertyDataSet,
    pub unsuccessful_properties: PhysicalPropertyDataSet,
    #[serde(default)]
    pub exceptions: Vec<PropertyFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestResult {
    /// An empty result document carrying only a request-level error.
    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of properties accounted for, successful or not.
    pub fn len(&self) -> usize {
        self.estimated_properties.len() + self.unsuccessful_properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestProgress {
    pub total: usize,
    pub completed: usize,
}

/// What a client sees when it polls a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub progress: RequestProgress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RequestResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

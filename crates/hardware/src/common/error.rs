//! Error taxonomy.
//!
//! Every failure the framework reports is a variant of [`Error`]. Variants
//! raised by a component carry that component's name so the run loop can tag
//! its critical log entry with the originator.

use thiserror::Error;

use super::addr::Address;
use super::data::AccessType;
use super::range::AddressRange;
use crate::clock::Cycle;
use crate::component::{ComponentId, State};

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by components, the clock, and memory dispatch.
#[derive(Debug, Error)]
pub enum Error {
    /// A lifecycle transition was requested from a state that does not allow it.
    #[error("{component}: component in wrong state. Actual: {actual}, expected: {expected}")]
    WrongState {
        /// Component whose state was checked.
        component: String,
        /// State the component was in.
        actual: State,
        /// State the transition requires.
        expected: State,
    },

    /// The subcomponent being added already has an owner.
    #[error("{component}: subcomponent {subcomponent} ({id}) is already owned")]
    SubcomponentOwned {
        /// Component the subcomponent was being added to.
        component: String,
        /// Name of the rejected subcomponent.
        subcomponent: String,
        /// Id of the rejected subcomponent.
        id: ComponentId,
    },

    /// The component to remove or replace is not a direct subcomponent.
    #[error("{component}: {subcomponent} ({id}) is not a subcomponent")]
    NotSubcomponent {
        /// Component whose children were searched.
        component: String,
        /// Name of the missing subcomponent.
        subcomponent: String,
        /// Id of the missing subcomponent.
        id: ComponentId,
    },

    /// Adding the subcomponent would make the ownership graph cyclic.
    #[error("{component}: adding {subcomponent} ({id}) would create an ownership loop")]
    ComponentLoop {
        /// Component the subcomponent was being added to.
        component: String,
        /// Name of the rejected subcomponent.
        subcomponent: String,
        /// Id of the rejected subcomponent.
        id: ComponentId,
    },

    /// No memory answers reads at the address.
    #[error("{component}: read access violation at {address:#018X}")]
    ReadAccessViolation {
        /// Memory component that rejected the access.
        component: String,
        /// Faulting address.
        address: Address,
    },

    /// No memory accepts writes at the address.
    #[error("{component}: write access violation at {address:#018X}")]
    WriteAccessViolation {
        /// Memory component that rejected the access.
        component: String,
        /// Faulting address.
        address: Address,
    },

    /// The clock has no future event to advance to.
    #[error("{component}: dead clock at {cycle}")]
    DeadClock {
        /// Clock component.
        component: String,
        /// Cycle the clock was stuck at.
        cycle: Cycle,
    },

    /// A component was accessed while one of its own hooks was executing.
    #[error("{component}: component is busy")]
    Busy {
        /// Component that was lent out.
        component: String,
    },

    /// A component lacks a capability the caller requires.
    #[error("{component}: component does not support {capability}")]
    Unsupported {
        /// Component that was inspected.
        component: String,
        /// Name of the missing capability.
        capability: &'static str,
    },

    /// A required collaborator was never attached.
    #[error("{component}: no {role} attached")]
    MissingComponent {
        /// Component that needed the collaborator.
        component: String,
        /// Role of the missing collaborator.
        role: &'static str,
    },

    /// The id was not handed out by this tree.
    #[error("unknown component {id}")]
    UnknownComponent {
        /// Offending id.
        id: ComponentId,
    },

    /// Backing storage for a memory region could not be reserved.
    #[error("cannot allocate backing storage for {range}")]
    Allocation {
        /// Region that was requested.
        range: AddressRange,
    },

    /// I/O failure while streaming memory contents or reading files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration document.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Builds the access violation matching `access`.
    pub fn access_violation(access: AccessType, component: impl Into<String>, address: Address) -> Self {
        let component = component.into();
        match access {
            AccessType::Read => Self::ReadAccessViolation { component, address },
            AccessType::Write => Self::WriteAccessViolation { component, address },
        }
    }

    /// Returns the name of the component that raised the error, if any.
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::WrongState { component, .. }
            | Self::SubcomponentOwned { component, .. }
            | Self::NotSubcomponent { component, .. }
            | Self::ComponentLoop { component, .. }
            | Self::ReadAccessViolation { component, .. }
            | Self::WriteAccessViolation { component, .. }
            | Self::DeadClock { component, .. }
            | Self::Busy { component }
            | Self::Unsupported { component, .. }
            | Self::MissingComponent { component, .. } => Some(component),
            Self::UnknownComponent { .. } | Self::Allocation { .. } | Self::Io(_) | Self::Config(_) => None,
        }
    }
}

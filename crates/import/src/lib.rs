//! Async orchestration of the contact import wizard.
//!
//! [`wizard::ImportWizard`] drives a [`crm_core::session::WizardController`]
//! through an [`crm_client::ImportBackend`], turning remote failures into
//! [`error::ImportError`]s, discarding stale validation responses and
//! publishing [`events::ImportEvent`]s on an [`events::EventBus`].

pub mod error;
pub mod events;
pub mod resolver;
pub mod wizard;

#[cfg(test)]
mod test_utils;

pub use error::ImportError;
pub use events::{EventBus, ImportEvent, ImportEventKind, RemoteCall};
pub use resolver::DuplicateResolver;
pub use wizard::{ImportWizard, TagChoices, ValidationRequest};

//! Domain types and pure logic for the bulk contact import wizard.
//!
//! No I/O, no async: everything here can be exercised with plain unit
//! tests. Remote calls live in `crm-client`, orchestration in `crm-import`.

pub mod error;
pub mod fields;
pub mod intake;
pub mod mapping;
pub mod merge;
pub mod result;
pub mod session;
pub mod tags;
pub mod types;
pub mod validation;

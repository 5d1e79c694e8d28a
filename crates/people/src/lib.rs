//! People directory domain module.
//!
//! A person is identified to the business by a unique document number and may
//! own at most one user account. Pure domain logic (no IO, no HTTP, no storage).

pub mod person;

pub use person::{NewPerson, Person, PersonChangeRequest, PersonPatch, ValidationIssue};

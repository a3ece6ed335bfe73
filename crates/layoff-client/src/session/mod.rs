//! Session: who is logged in, with which tokens, until when.

mod store;
mod types;
pub mod validation;

pub use store::SessionStore;
pub use types::{
    Credentials, Registration, Role, SessionSnapshot, SessionStatus, Token, User, UserUpdate,
};

pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod public;
pub(crate) mod router;
pub(crate) mod staff;
pub(crate) mod validation;

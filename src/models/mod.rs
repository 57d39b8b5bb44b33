pub mod analytics;
pub mod draft;
pub mod form;
pub mod metadata;
pub mod soap;
pub mod user;

pub use analytics::*;
pub use draft::*;
pub use form::*;
pub use metadata::*;
pub use soap::*;
pub use user::*;

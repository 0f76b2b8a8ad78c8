pub mod domains;

pub use domains::{is_domain, is_subdomain, strip_www};

//! Configuration module

mod prismic;
mod site;

pub use prismic::PrismicConfig;
pub use site::ReadingTimeConfig;
pub use site::SiteConfig;

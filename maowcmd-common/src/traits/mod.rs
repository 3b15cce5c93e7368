pub mod platform_traits;
pub mod repository_traits;

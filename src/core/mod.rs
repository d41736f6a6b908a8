pub mod bounds;
pub mod config;
pub mod host;
pub mod live_link;
pub mod material;
pub mod memory;
pub mod project;
pub mod script;
pub mod turntable;
pub mod types;

/// Everything that brings memories in
///
/// - `files` - reading picked files and preparing caption payloads
/// - `placement` - where on the sphere an upload appears
/// - `caption` - the external caption service and its jobs
/// - `seed` - the startup set from a folder

pub mod caption;
pub mod files;
pub mod placement;
pub mod seed;

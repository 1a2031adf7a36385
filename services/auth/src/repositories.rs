//! Repositories for table operations

pub mod profile;

pub use profile::ProfileRepository;

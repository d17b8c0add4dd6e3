// General-purpose helpers shared by the recipes and the executor.

// dpkg status queries and apt-get install/purge.
pub mod apt;
pub mod command_runner;
// HTTP downloads, checksums and tarball extraction.
pub mod downloads;
pub mod file_operations;
pub mod platform;
pub mod timestamps;
pub mod versions;

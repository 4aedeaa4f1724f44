pub mod aws_cli;
pub mod control_plane;
pub mod error;
pub mod path_access;
pub mod service;
pub mod task_definition;
pub mod trigger;
pub mod updater;
pub mod watcher;

#[cfg(test)]
mod fake_control_plane;
#[cfg(test)]
mod path_access_test;
#[cfg(test)]
mod service_test;

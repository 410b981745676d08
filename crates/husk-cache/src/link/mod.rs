//! Materializing store entries into a project's `node_modules`

pub mod linker;

pub use linker::{place_file, virtual_dir_name, virtual_package_dir, LinkReport, Linker, Placement, VIRTUAL_STORE_DIR};

#[cfg(test)]
mod tests;

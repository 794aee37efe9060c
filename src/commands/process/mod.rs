mod db_setup;
mod outputs;
mod run;
#[cfg(test)]
mod tests;

pub use db_setup::{count_rows, metadata_value};
pub use run::{MANIFEST_FILE_NAME, run};

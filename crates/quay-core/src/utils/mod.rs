pub mod fs;

pub use fs::find_files_with_extensions;

#[cfg(test)]
mod tests;

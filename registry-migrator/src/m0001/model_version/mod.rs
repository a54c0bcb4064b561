pub mod version_column;

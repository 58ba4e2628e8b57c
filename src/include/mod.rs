pub mod walk_include;

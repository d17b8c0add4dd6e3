// Command-line surface of `setup-devhost`.
pub mod cmd_enums;

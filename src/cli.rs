use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "round42-kbfix", version, about = "Apply the keyboard fix patch to Round 42")]
pub struct Args {
    /// Directory containing the original ROUND42.COM
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Directory to write the patched ROUND42.COM to
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::{CommandFactory, Parser};

    use super::Args;

    #[test]
    fn parses_two_positional_directories() {
        let args = Args::parse_from(["round42-kbfix", "game", "out/patched"]);
        assert_eq!(args.input_dir, PathBuf::from("game"));
        assert_eq!(args.output_dir, PathBuf::from("out/patched"));
    }

    #[test]
    fn requires_output_directory() {
        let err = Args::try_parse_from(["round42-kbfix", "game"]).expect_err("must fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Args::try_parse_from(["round42-kbfix", "-v", "game", "out"]).is_err());
    }

    #[test]
    fn command_definition_is_valid() {
        Args::command().debug_assert();
    }
}

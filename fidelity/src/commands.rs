use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("fidelity")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("fidelity")
        .styles(CLAP_STYLING)
        .about("Scores how faithfully a migrated website reproduces its source")
        .arg(arg!(-q --"quiet" "Only print the report").required(false).global(true))
        .arg(
            arg!(-v --"verbose" "Log scoring progress (overridden by RUST_LOG)")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("score")
                .about("Score a migrated site against its source")
                .arg(
                    arg!(--"source-tree" <PATH>)
                        .required(true)
                        .help("JSON structural tree of the original site")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"source-image" <PATH>)
                        .required(true)
                        .help("Full-page screenshot of the original site")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"target-tree" <PATH>)
                        .required(true)
                        .help("JSON structural tree of the migrated site")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"target-image" <PATH>)
                        .required(true)
                        .help("Full-page screenshot of the migrated site")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("JSON file with scoring and judge settings")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-t --"threshold" <SCORE>)
                        .required(false)
                        .help("Overall score in [0, 1] the migration must reach")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--"canvas-width" <PIXELS>)
                        .required(false)
                        .help("Width screenshots are resampled to before comparison")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(--"judge-endpoint" <URL>)
                        .required(false)
                        .help("Base URL of an OpenAI-compatible vision model API")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"judge-model" <MODEL>)
                        .required(false)
                        .help("Vision model name to ask for the semantic rating"),
                )
                .arg(
                    arg!(--"judge-timeout" <SECONDS>)
                        .required(false)
                        .help("Give up on the semantic judge after this many seconds")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_score_requires_all_inputs() {
        let result = command_argument_builder().try_get_matches_from([
            "fidelity",
            "score",
            "--source-tree",
            "a.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_score_parses_overrides() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "fidelity",
                "score",
                "--source-tree",
                "a.json",
                "--source-image",
                "a.png",
                "--target-tree",
                "b.json",
                "--target-image",
                "b.png",
                "--threshold",
                "0.85",
                "--format",
                "json",
                "-q",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "score");
        assert_eq!(sub.get_one::<f64>("threshold"), Some(&0.85));
        assert_eq!(sub.get_one::<String>("format").map(String::as_str), Some("json"));
        assert!(sub.get_flag("quiet"));
    }
}

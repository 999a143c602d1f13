use clap::{crate_description, crate_name, crate_version, Arg, ArgAction, Command};
use synterp::api::{self, Options};

// The CLI layer should only parse inputs and forward them to library code.
fn main() {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("skip-newer-in-destination")
                .long("skip-newer-in-destination")
                // same as rsync's --update option
                .help("Skip files that exist in the destination with a newer modification time than the source")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("replace-env-prefix")
                .long("replace-env-prefix")
                .help("Prefix that opens a variable reference")
                .default_value("${"),
        )
        .arg(
            Arg::new("replace-env-file")
                .long("replace-env-file")
                .help("Glob matched against destination-relative paths of files to interpolate; repeatable")
                .action(ArgAction::Append)
                .required(true),
        )
        .arg(Arg::new("source").help("source directory").required(true))
        .arg(
            Arg::new("destination")
                .help("destination directory")
                .required(true),
        )
        .get_matches();

    let is_verbose = matches.get_flag("verbose");

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if is_verbose {
        "debug"
    } else {
        "info"
    }))
    .init();

    let options = Options {
        src: matches
            .get_one::<String>("source")
            .expect("source required")
            .into(),
        dest: matches
            .get_one::<String>("destination")
            .expect("destination required")
            .into(),
        skip_newer_in_destination: matches.get_flag("skip-newer-in-destination"),
        prefix: matches
            .get_one::<String>("replace-env-prefix")
            .expect("prefix has a default")
            .clone(),
        patterns: matches
            .get_many::<String>("replace-env-file")
            .expect("pattern required")
            .cloned()
            .collect(),
    };

    if let Err(error) = api::run(&options) {
        log::error!(
            "failed to sync and interpolate {} into {}: {}",
            options.src.display(),
            options.dest.display(),
            error
        );
        log::debug!("details: {:?}", error);

        std::process::exit(1);
    }
}

use clap::{
    crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches,
    Command,
};
use imgfill::{
    api::{self, Outcome},
    config::{self, Settings},
    operator::FailurePolicy,
};
use std::path::PathBuf;

fn manifest_arg() -> Arg {
    Arg::new("manifest")
        .short('m')
        .long("manifest")
        .help("Manifest of DEST=SRC lines")
        .value_parser(clap::value_parser!(PathBuf))
}

fn ordering_arg() -> Arg {
    Arg::new("ordering")
        .long("ordering")
        .help("How directories are ordered before creation")
        .value_parser(["length", "depth"])
}

fn marker_arg() -> Arg {
    Arg::new("marker")
        .long("marker")
        .help("Prefix the image tool uses for paths inside the image [default: ::]")
}

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> miette::Result<()> {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML file providing defaults for any option")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("populate")
                .about("Creates the manifest's directories in the image and copies its files in")
                .arg(manifest_arg())
                .arg(
                    Arg::new("image")
                        .short('i')
                        .long("image")
                        .help("Preformatted image file to populate")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("tool")
                        .short('t')
                        .long("tool")
                        .help("Image tool binary, called as <tool> <image> mkdir|cp|ls ...")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(ordering_arg())
                .arg(marker_arg())
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .help("Stop at the first tool call that fails instead of ignoring it")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("confirm")
                        .long("confirm")
                        .help("Preview the result and ask before touching the image")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Prints the directories, files and tool commands a populate run would use")
                .arg(manifest_arg())
                .arg(ordering_arg())
                .arg(marker_arg()),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .get_matches();

    init_logging(matches.get_flag("verbose"));

    let file_settings = match matches.get_one::<PathBuf>("config") {
        Some(path) => Settings::from_file(path).map_err(api::ImgfillError::from)?,
        None => Settings::default(),
    };

    match matches.subcommand() {
        Some(("populate", args)) => handle_populate(args, file_settings),
        Some(("plan", args)) => handle_plan(args, file_settings),
        _ => unreachable!(),
    }
}

fn init_logging(is_verbose: bool) {
    let level = if is_verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    log::debug!("executing in verbose mode");
}

fn command_line_settings(args: &ArgMatches) -> Result<Settings, api::ImgfillError> {
    let get_path = |id: &str| {
        args.try_get_one::<PathBuf>(id)
            .ok()
            .flatten()
            .cloned()
    };

    let ordering = args
        .get_one::<String>("ordering")
        .map(|value| config::parse_ordering(value))
        .transpose()?;

    let strict = args.try_get_one::<bool>("strict").ok().flatten().copied();

    Ok(Settings {
        manifest: get_path("manifest"),
        image: get_path("image"),
        tool: get_path("tool"),
        root_marker: args.get_one::<String>("marker").cloned(),
        ordering,
        failure_policy: strict.filter(|s| *s).map(|_| FailurePolicy::Abort),
    })
}

fn handle_populate(args: &ArgMatches, file_settings: Settings) -> miette::Result<()> {
    let settings = file_settings.layer(command_line_settings(args)?);

    match api::populate(settings, args.get_flag("confirm"))? {
        Outcome::Completed(summary) => {
            log::debug!("summary: {:?}", summary);
        }
        Outcome::Canceled => {
            println!("Nothing written.");
        }
    }

    Ok(())
}

fn handle_plan(args: &ArgMatches, file_settings: Settings) -> miette::Result<()> {
    let settings = file_settings.layer(command_line_settings(args)?);

    api::plan(settings)?;

    Ok(())
}

use cldc_verifier::jvm::verifier::VerifierSettings;
use cldc_verifier::jvm::Error;
use cldc_verifier::script::Script;

use clap::{crate_version, value_parser, Arg, ArgAction, Command};
use std::fs;
use std::io;
use std::path::PathBuf;

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = Command::new("CLDC bytecode verifier")
        .version(crate_version!())
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Replay a verifier trace against its stack map table")
        .arg(
            Arg::new("inline capacity")
                .long("inline-capacity")
                .value_name("SLOTS")
                .value_parser(value_parser!(usize))
                .help("Stack and locals capacity kept around between methods"),
        )
        .arg(
            Arg::new("interfaces as object")
                .long("interfaces-as-object")
                .action(ArgAction::SetTrue)
                .help("Treat every reference as assignable to any interface"),
        )
        .arg(
            Arg::new("SCRIPT")
                .help("Sets the verifier trace to replay")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .index(1),
        )
        .get_matches();

    let mut settings = VerifierSettings::default();
    if let Some(inline_capacity) = matches.get_one::<usize>("inline capacity") {
        settings.inline_capacity = *inline_capacity;
    }
    settings.interfaces_as_object = matches.get_flag("interfaces as object");

    let script_file = matches
        .get_one::<PathBuf>("SCRIPT")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "missing script"))?;
    log::info!("Reading and replaying '{}'", script_file.display());
    let source = fs::read_to_string(script_file)?;

    let script = Script::parse(&source)?;
    if let Err(err) = script.run(&settings) {
        log::error!("{}", err);
        return Err(err);
    }

    println!("ok");
    Ok(())
}

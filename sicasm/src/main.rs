#[macro_use]
extern crate clap;

use clap::Arg;
use sicasm::listing::ListingLine;
use sicvm::opcode::OpcodeTable;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum IoErrorContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Sicasm(sicasm::error::Error),
    Object(sicobj::error::ObjectError, PathBuf),
    Io(std::io::Error, IoErrorContext, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => write!(
                f,
                "{}: Error: {} file \"{}\" failed: {}",
                path.display(),
                match context {
                    IoErrorContext::ReadInput => "reading input",
                    IoErrorContext::WriteOutput => "writing output",
                },
                path.display(),
                err
            ),
            Error::Object(err, path) => write!(f, "{}: Error: {}", path.display(), err),
            Error::Sicasm(err) => write!(f, "{}", err),
        }
    }
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Source file to assemble")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OBJ")
                .help("Object file to write (defaults to INPUT with .obj)"),
        )
        .arg(
            Arg::with_name("listing")
                .short("l")
                .long("listing")
                .takes_value(true)
                .value_name("LST")
                .help("Listing file to write (defaults to INPUT with .lst)"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");
    let listing = matches.value_of("listing");

    if let Err(err) = assemble(input, output, listing) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn assemble(input: &str, output: Option<&str>, listing: Option<&str>) -> Result<(), Error> {
    let input_path = Path::new(input);
    let file = File::open(input_path)
        .map_err(|err| Error::Io(err, IoErrorContext::ReadInput, input_path.to_owned()))?;
    let lines: Vec<String> = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<_>>()
        .map_err(|err| Error::Io(err, IoErrorContext::ReadInput, input_path.to_owned()))?;

    log::info!("assembling {} ({} lines)", input_path.display(), lines.len());

    let opcodes = OpcodeTable::default();
    let (section, rendered) = sicasm::assemble(&lines, &opcodes).map_err(Error::Sicasm)?;

    let obj_path: PathBuf = output.map(PathBuf::from).unwrap_or_else(|| input_path.with_extension("obj"));
    let obj_file = File::create(&obj_path)
        .map_err(|err| Error::Io(err, IoErrorContext::WriteOutput, obj_path.clone()))?;
    let mut obj_writer = BufWriter::new(obj_file);
    sicobj::write_section(&mut obj_writer, &section)
        .map_err(|err| Error::Object(err, obj_path.clone()))?;

    let lst_path: PathBuf = listing.map(PathBuf::from).unwrap_or_else(|| input_path.with_extension("lst"));
    let lst_file = File::create(&lst_path)
        .map_err(|err| Error::Io(err, IoErrorContext::WriteOutput, lst_path.clone()))?;
    write_listing(&mut BufWriter::new(lst_file), &rendered)
        .map_err(|err| Error::Io(err, IoErrorContext::WriteOutput, lst_path))?;

    log::info!("wrote program {} ({} bytes)", section.name, section.length);
    Ok(())
}

fn write_listing<W: Write>(writer: &mut W, lines: &[ListingLine]) -> std::io::Result<()> {
    for line in lines {
        writeln!(writer, "{}", line.text)?;
    }
    Ok(())
}

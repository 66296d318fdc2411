#[macro_use]
extern crate clap;

use clap::Arg;
use sicld::linkmap::LinkMap;
use sicvm::memory::Memory;
use sicvm::register::RegisterId;
use sicvm::symbol::SymbolTable;
use sicvm::{Device, Interpreter, SequenceDevice};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum Error {
    Load(sicld::error::Error),
    Run(sicvm::Fault),
    Io(std::io::Error, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, path) => write!(f, "{}: Error: {}", path.display(), err),
            Error::Load(err) => write!(f, "{}", err),
            Error::Run(err) => write!(f, "Error: {}", err),
        }
    }
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("OBJECT")
                .help("Object file(s) to load, 1 to 3")
                .required(true)
                .min_values(1)
                .max_values(3),
        )
        .arg(
            Arg::with_name("progaddr")
                .short("p")
                .long("progaddr")
                .takes_value(true)
                .value_name("HEX")
                .default_value("0")
                .help("Address to load the first section at"),
        )
        .arg(
            Arg::with_name("run")
                .short("r")
                .long("run")
                .help("Run the loaded program to completion after loading"),
        )
        .get_matches();

    let paths: Vec<&str> = matches.values_of("OBJECT").unwrap().collect();
    let prog_addr = u32::from_str_radix(matches.value_of("progaddr").unwrap(), 16)
        .expect("progaddr must be hexadecimal");
    let run = matches.is_present("run");

    if let Err(err) = load_and_run(&paths, prog_addr, run) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn load_and_run(paths: &[&str], prog_addr: u32, run: bool) -> Result<(), Error> {
    let mut sections = Vec::with_capacity(paths.len());
    for path in paths {
        let path = Path::new(path);
        let file = File::open(path).map_err(|err| Error::Io(err, path.to_owned()))?;
        let mut reader = BufReader::new(file);
        let section = sicobj::read_section(&mut reader)
            .map_err(|err| Error::Load(err.into()))?;
        sections.push(section);
    }

    let mut memory = Memory::image();
    let mut symbols = SymbolTable::new();
    let (entry, map) =
        sicld::load(&sections, prog_addr, &mut memory, &mut symbols).map_err(Error::Load)?;

    print_link_map(&map);

    if run {
        let mut interp = Interpreter::new(memory, SequenceDevice::new());
        if let Some(entry) = entry {
            interp.regs.pc = entry;
        }
        interp.run().map_err(Error::Run)?;
        print_registers(&interp);
    } else if let Some(entry) = entry {
        log::info!("entry address {:#07X}", entry);
    }

    Ok(())
}

fn print_link_map(map: &LinkMap) {
    println!("{}", map);
}

fn print_registers<D: Device>(interp: &Interpreter<Memory, D>) {
    for id in &[
        RegisterId::A,
        RegisterId::X,
        RegisterId::L,
        RegisterId::B,
        RegisterId::S,
        RegisterId::T,
        RegisterId::PC,
        RegisterId::SW,
    ] {
        println!("{:?}: {:#08X}", id, interp.regs.get(*id));
    }
}


use std::fmt::Display;
use std::fs::File;
use std::io;
use std::process;

use clap::{App, Arg, ArgMatches};
use env_logger;

use acirc::analysis;
use acirc::eval;
use acirc::parse;
use acirc::serialize;

fn parse_args() -> ArgMatches<'static> {
    App::new("acirc")
        .about("parse, evaluate, and analyze arithmetic circuits")
        .arg(Arg::with_name("circuit")
             .takes_value(true)
             .value_name("CIRCUIT.ACIRC")
             .help("circuit description file")
             .required(true))
        .arg(Arg::with_name("tests")
             .long("tests")
             .help("run the test vectors stored in the circuit"))
        .arg(Arg::with_name("stats")
             .long("stats")
             .help("print info about the size and degree of the circuit"))
        .arg(Arg::with_name("write")
             .long("write")
             .takes_value(true)
             .value_name("OUT.ACIRC")
             .help("re-emit the circuit in the text format"))
        .arg(Arg::with_name("sage")
             .long("sage")
             .takes_value(true)
             .value_name("OUTPUT")
             .help("print the polynomial of the given output (by position) as a sage expression"))
        .after_help("With no options, parses the circuit and reports whether its tests pass.")
        .get_matches()
}

fn or_die<T, E: Display>(r: Result<T, E>) -> T {
    r.unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        process::exit(1);
    })
}

fn main() -> io::Result<()> {
    env_logger::init();
    let args = parse_args();

    let path = args.value_of("circuit").unwrap();
    let file = File::open(path)?;
    let c = or_die(parse::read(file));

    if args.is_present("stats") {
        println!("nrefs:            {}", c.nrefs());
        println!("ninputs:          {}", c.ninputs());
        println!("nconsts:          {}", c.nconsts());
        println!("noutputs:         {}", c.outputs().len());
        println!("nmuls:            {}", c.nmuls());
        println!("max depth:        {}", or_die(analysis::max_depth(&c)));
        println!("max degree:       {}", or_die(analysis::max_degree(&c)));
        println!("max total degree: {}", or_die(analysis::max_total_degree(&c)));
        println!("delta:            {}", or_die(analysis::delta(&c)));
    }

    if let Some(out_path) = args.value_of("write") {
        let mut out = File::create(out_path)?;
        or_die(serialize::write(&c, &mut out));
    }

    if let Some(which) = args.value_of("sage") {
        let i = or_die(which.parse::<usize>().map_err(|_| {
            format!("bad output position {:?}", which)
        }));
        let root = match c.outputs().get(i) {
            Some(&r) => r,
            None => {
                eprintln!("error: circuit has {} outputs", c.outputs().len());
                process::exit(1);
            },
        };
        println!("{}", or_die(serialize::to_sage(&c, root)));
    }

    let no_action = !args.is_present("stats") && !args.is_present("write")
        && !args.is_present("sage");
    if args.is_present("tests") || no_action {
        let ok = or_die(eval::ensure(&c));
        println!("tests: {}", if ok { "ok" } else { "FAILED" });
        if !ok {
            process::exit(1);
        }
    }

    Ok(())
}

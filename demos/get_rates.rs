use std::process;

use log::Level;
use simple_logger::init_with_level;

use mutation_weights::parser;
use mutation_weights::rates::assembly::genes_site_rates;
use mutation_weights::rates::RateTable;
use mutation_weights::TranscriptTable;

fn main() {
    let mut args = std::env::args();
    if args.len() < 5 {
        println!("Per-site mutation rates of all dominant DDG2P genes\n\n");
        println!("Usage\nget_rates <DDG2P> <TRANSCRIPTS> <SITE MODEL> <OUTPUT> [--possible]\n");
        process::exit(1)
    }
    init_with_level(Level::Info).unwrap();

    let ddg2p = args.nth(1).unwrap();
    let transcripts = args.next().unwrap();
    let site_model = args.next().unwrap();
    let output = args.next().unwrap();
    let include_possible = args.next().map_or(false, |arg| arg == "--possible");

    let mut dominant: Vec<String> = parser::ddg2p::dominant_genes(ddg2p, include_possible)
        .expect("unable to load DDG2P")
        .into_iter()
        .collect();
    dominant.sort();

    let transcripts = TranscriptTable::from_file(transcripts).expect("unable to load transcripts");
    let model = RateTable::from_file(site_model).expect("unable to load site model");

    let rates = genes_site_rates(dominant.iter().map(String::as_str), &transcripts, &model).unwrap();
    println!("{} sites in {} genes", rates.len(), dominant.len());

    parser::rates::write(output, &rates).expect("unable to write rates");
}

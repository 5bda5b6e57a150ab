use std::process;

use log::Level;
use simple_logger::init_with_level;

use mutation_weights::cadd::release_scores;
use mutation_weights::parser;
use mutation_weights::rates::RateTable;

fn main() {
    let mut args = std::env::args();
    if args.len() < 4 {
        println!("Extract the CADD scores of all sites with mutation rates\n\n");
        println!("Usage\nget_cadd_scores <RATES> <CADD RELEASE> <OUTPUT>\n");
        process::exit(1)
    }
    init_with_level(Level::Info).unwrap();

    let rates = args.nth(1).unwrap();
    let release = args.next().unwrap();
    let output = args.next().unwrap();

    let rates = RateTable::from_file(rates).expect("unable to load site rates");
    let scores = release_scores(release, rates.rates()).expect("unable to read CADD release");
    println!("{} scores for {} sites", scores.len(), rates.len());

    parser::cadd::write(output, &scores).expect("unable to write scores");
}

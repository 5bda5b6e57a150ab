use std::collections::HashSet;
use std::process;

use log::Level;
use simple_logger::init_with_level;

use mutation_weights::cadd::{
    annotate_constraint, cumulative_proportions, merge_rates_and_cadd, missense_score_bins,
    ptv_site_enrichment, ANNOTATION_THRESHOLDS,
};
use mutation_weights::parser;
use mutation_weights::rates::expected::expected_site_rates;
use mutation_weights::rates::RateTable;
use mutation_weights::variants::load_de_novos;
use mutation_weights::{Cohort, ConstraintTable, TranscriptTable};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 9 {
        println!("Enrichment of de novos by CADD score bins\n\n");
        println!("Usage\ncheck_weights <RATES> <CADD> <CONSTRAINT> <TRANSCRIPTS> <DE NOVOS> <VALIDATIONS> <TRIOS> <FAMILIES>\n");
        process::exit(1)
    }
    init_with_level(Level::Info).unwrap();

    let rates = RateTable::from_file(&args[1]).expect("unable to load site rates");
    let scores = parser::cadd::parse(&args[2]).expect("unable to load CADD scores");
    let constraint = ConstraintTable::from_file(&args[3]).expect("unable to load constraint table");
    let transcripts = TranscriptTable::from_file(&args[4]).expect("unable to load transcripts");
    let de_novos = load_de_novos(&args[5], &args[6], false).expect("unable to load de novos");
    let cohort = Cohort::from_files(&args[7], &args[8]).expect("unable to count trios");

    let dominant: HashSet<&str> = rates.symbols().into_iter().collect();
    let expected = expected_site_rates(rates.rates().to_vec(), &cohort);

    let ptv_ratio = ptv_site_enrichment(&de_novos, &dominant, &expected).unwrap();
    println!("PTV enrichment: {ptv_ratio:.3}");

    let mut sites = merge_rates_and_cadd(expected, &scores);
    annotate_constraint(&mut sites, &constraint, &transcripts, &ANNOTATION_THRESHOLDS).unwrap();

    for (partition, bins) in missense_score_bins(&sites, &de_novos).unwrap() {
        let counts: Vec<usize> = bins.iter().map(|bin| bin.sites).collect();
        let thresholds: Vec<String> = bins.iter().map(|bin| bin.min.to_string()).collect();
        let ratios: Vec<String> = bins.iter().map(|bin| format!("{:.3}", bin.ratio)).collect();
        let cdf: Vec<String> = cumulative_proportions(&counts)
            .iter()
            .map(|x| format!("{x:.3}"))
            .collect();
        println!("{partition}");
        println!("{}", thresholds.join("\t"));
        println!("{}", ratios.join("\t"));
        println!("{}", cdf.join("\t"));
    }
}

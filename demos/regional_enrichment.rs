use std::process;

use log::Level;
use simple_logger::init_with_level;

use mutation_weights::analysis::{constraint_gene_de_novos, de_novo_genes, sweep, StudyData, SweepGrid};
use mutation_weights::rates::RateTable;
use mutation_weights::variants::load_de_novos;
use mutation_weights::{Cohort, ConstraintTable, TranscriptTable};

/// Number of male and female probands in the study cohort
const STUDY_COHORT: Cohort = Cohort {
    male: 2408,
    female: 1885,
};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 6 {
        println!("Compare de novo enrichment in constrained and unconstrained regions\n\n");
        println!("Usage\nregional_enrichment <CONSTRAINT> <TRANSCRIPTS> <RATES> <DE NOVOS> <VALIDATIONS> [<MALE> <FEMALE>]\n");
        process::exit(1)
    }
    init_with_level(Level::Info).unwrap();

    let cohort = match (args.get(6), args.get(7)) {
        (Some(male), Some(female)) => Cohort::new(
            male.parse().expect("invalid number of males"),
            female.parse().expect("invalid number of females"),
        ),
        _ => STUDY_COHORT,
    };

    let constraint = ConstraintTable::from_file(&args[1]).expect("unable to load constraint table");
    let transcripts = TranscriptTable::from_file(&args[2]).expect("unable to load transcripts");
    let model = RateTable::from_file(&args[3]).expect("unable to load site rates");
    let de_novos = load_de_novos(&args[4], &args[5], true).expect("unable to load de novos");
    let de_novos = constraint_gene_de_novos(&de_novos, &constraint);

    println!(
        "{} de novos in {} genes, {} probands",
        de_novos.len(),
        de_novo_genes(&de_novos).len(),
        cohort.probands()
    );

    let data = StudyData {
        constraint: &constraint,
        de_novos: &de_novos,
        resolver: &transcripts,
        model: &model,
        cohort,
    };

    let results = sweep(&data, &SweepGrid::default()).unwrap_or_else(|err| {
        println!("Enrichment failed: {err}");
        process::exit(1)
    });
    for result in results {
        println!("{result}\n");
    }
}
